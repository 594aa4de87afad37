//! PAPI over HTTP

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use akamai_tf_core::{ErrorKind, ProviderError, ProviderResult};
use akamai_tf_edgegrid::{EdgeGridClient, EdgeGridError};

use crate::api::PapiApi;
use crate::compliance::ComplianceRecord;
use crate::models::{
    ActivationType, Hostname, HostnameDiffItem, HostnameDiffPage, IncludeActivation, IncludeRef,
    Network, PropertyActivation, PropertyRef,
};
use crate::request::ActivationRequest;
use crate::rules::RuleTree;

#[derive(Debug, Deserialize)]
struct Items<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default, rename = "totalItems")]
    total_items: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ActivationsEnvelope<T> {
    activations: Items<T>,
}

#[derive(Debug, Deserialize)]
struct HostnamesEnvelope<T> {
    hostnames: Items<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivationLink {
    activation_link: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivationBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    property_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_version: Option<u32>,
    network: Network,
    activation_type: ActivationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
    notify_emails: &'a [String],
    acknowledge_all_warnings: bool,
    use_fast_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    compliance_record: Option<&'a ComplianceRecord>,
}

impl<'a> ActivationBody<'a> {
    fn from_request(request: &'a ActivationRequest) -> Self {
        Self {
            property_version: None,
            include_version: None,
            network: request.network,
            activation_type: request.activation_type,
            note: request.note.as_deref(),
            notify_emails: &request.notify_emails,
            acknowledge_all_warnings: request.acknowledge_all_warnings,
            use_fast_fallback: request.use_fast_fallback,
            compliance_record: request.compliance_record.as_ref(),
        }
    }
}

/// Activation ID from an `activationLink` such as
/// `/papi/v1/properties/prp_1/activations/atv_67037?contractId=ctr_1`
fn activation_id_from_link(link: &str) -> Option<String> {
    let path = link.split('?').next()?;
    path.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn api_error(context: String, err: EdgeGridError) -> ProviderError {
    let kind = if err.is_not_found() {
        ErrorKind::NotFound
    } else {
        ErrorKind::Api
    };
    ProviderError::new(context).with_kind(kind).with_cause(err)
}

/// `PapiApi` backed by a signed EdgeGrid client
#[derive(Debug, Clone)]
pub struct HttpPapiClient {
    client: EdgeGridClient,
}

impl HttpPapiClient {
    pub fn new(client: EdgeGridClient) -> Self {
        Self { client }
    }

    async fn first_activation<T: serde::de::DeserializeOwned>(
        &self,
        path: String,
        query: &[(&str, String)],
    ) -> ProviderResult<Option<T>> {
        match self.client.get::<ActivationsEnvelope<T>>(&path, query).await {
            Ok(envelope) => Ok(envelope.activations.items.into_iter().next()),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(api_error(format!("failed to fetch activation at {}", path), e)),
        }
    }

    async fn submit_activation(
        &self,
        path: String,
        query: &[(&str, String)],
        body: &ActivationBody<'_>,
    ) -> ProviderResult<String> {
        let link: ActivationLink = self
            .client
            .post(&path, query, body)
            .await
            .map_err(|e| api_error(format!("failed to submit activation at {}", path), e))?;
        activation_id_from_link(&link.activation_link).ok_or_else(|| {
            ProviderError::new(format!(
                "unexpected activation link '{}'",
                link.activation_link
            ))
        })
    }
}

#[async_trait]
impl PapiApi for HttpPapiClient {
    async fn list_property_activations(
        &self,
        property: &PropertyRef,
    ) -> ProviderResult<Vec<PropertyActivation>> {
        let path = format!("/papi/v1/properties/{}/activations", property.property_id);
        let envelope: ActivationsEnvelope<PropertyActivation> =
            self.client.get(&path, &property.query()).await.map_err(|e| {
                api_error(
                    format!("failed to list activations of {}", property.property_id),
                    e,
                )
            })?;
        Ok(envelope.activations.items)
    }

    async fn create_property_activation(
        &self,
        property: &PropertyRef,
        request: &ActivationRequest,
    ) -> ProviderResult<String> {
        let body = ActivationBody {
            property_version: Some(request.version),
            ..ActivationBody::from_request(request)
        };
        self.submit_activation(
            format!("/papi/v1/properties/{}/activations", property.property_id),
            &property.query(),
            &body,
        )
        .await
    }

    async fn get_property_activation(
        &self,
        property: &PropertyRef,
        activation_id: &str,
    ) -> ProviderResult<Option<PropertyActivation>> {
        self.first_activation(
            format!(
                "/papi/v1/properties/{}/activations/{}",
                property.property_id, activation_id
            ),
            &property.query(),
        )
        .await
    }

    async fn list_include_activations(
        &self,
        include: &IncludeRef,
    ) -> ProviderResult<Vec<IncludeActivation>> {
        let path = format!("/papi/v1/includes/{}/activations", include.include_id);
        let envelope: ActivationsEnvelope<IncludeActivation> =
            self.client.get(&path, &include.query()).await.map_err(|e| {
                api_error(
                    format!("failed to list activations of {}", include.include_id),
                    e,
                )
            })?;
        Ok(envelope.activations.items)
    }

    async fn create_include_activation(
        &self,
        include: &IncludeRef,
        request: &ActivationRequest,
    ) -> ProviderResult<String> {
        let body = ActivationBody {
            include_version: Some(request.version),
            ..ActivationBody::from_request(request)
        };
        self.submit_activation(
            format!("/papi/v1/includes/{}/activations", include.include_id),
            &include.query(),
            &body,
        )
        .await
    }

    async fn get_include_activation(
        &self,
        include: &IncludeRef,
        activation_id: &str,
    ) -> ProviderResult<Option<IncludeActivation>> {
        self.first_activation(
            format!(
                "/papi/v1/includes/{}/activations/{}",
                include.include_id, activation_id
            ),
            &include.query(),
        )
        .await
    }

    async fn get_version_hostnames(
        &self,
        property: &PropertyRef,
        version: u32,
    ) -> ProviderResult<Option<Vec<Hostname>>> {
        let path = format!(
            "/papi/v1/properties/{}/versions/{}/hostnames",
            property.property_id, version
        );
        match self
            .client
            .get::<HostnamesEnvelope<Hostname>>(&path, &property.query())
            .await
        {
            Ok(envelope) => Ok(Some(envelope.hostnames.items)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(api_error(
                format!(
                    "failed to read hostnames of {} version {}",
                    property.property_id, version
                ),
                e,
            )),
        }
    }

    async fn put_version_hostnames(
        &self,
        property: &PropertyRef,
        version: u32,
        hostnames: &[Hostname],
    ) -> ProviderResult<Vec<Hostname>> {
        let path = format!(
            "/papi/v1/properties/{}/versions/{}/hostnames",
            property.property_id, version
        );
        let envelope: HostnamesEnvelope<Hostname> = self
            .client
            .put(&path, &property.query(), &hostnames)
            .await
            .map_err(|e| {
                api_error(
                    format!(
                        "failed to update hostnames of {} version {}",
                        property.property_id, version
                    ),
                    e,
                )
            })?;
        Ok(envelope.hostnames.items)
    }

    async fn hostnames_diff_page(
        &self,
        property: &PropertyRef,
        offset: usize,
        limit: usize,
    ) -> ProviderResult<HostnameDiffPage> {
        let path = format!("/papi/v1/properties/{}/hostnames/diff", property.property_id);
        let mut query = property.query();
        query.push(("offset", offset.to_string()));
        query.push(("limit", limit.to_string()));
        let envelope: HostnamesEnvelope<HostnameDiffItem> =
            self.client.get(&path, &query).await.map_err(|e| {
                api_error(
                    format!("failed to read hostname diff of {}", property.property_id),
                    e,
                )
            })?;
        let total_items = envelope
            .hostnames
            .total_items
            .unwrap_or(offset + envelope.hostnames.items.len());
        Ok(HostnameDiffPage {
            items: envelope.hostnames.items,
            total_items,
        })
    }

    async fn get_rule_tree(
        &self,
        property: &PropertyRef,
        version: u32,
    ) -> ProviderResult<RuleTree> {
        let path = format!(
            "/papi/v1/properties/{}/versions/{}/rules",
            property.property_id, version
        );
        self.client.get(&path, &property.query()).await.map_err(|e| {
            api_error(
                format!(
                    "failed to read rules of {} version {}",
                    property.property_id, version
                ),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivationStatus;

    #[test]
    fn test_activation_id_from_link() {
        assert_eq!(
            activation_id_from_link(
                "/papi/v1/properties/prp_173136/activations/atv_67037?contractId=ctr_1&groupId=grp_2"
            ),
            Some("atv_67037".to_string())
        );
        assert_eq!(
            activation_id_from_link("/papi/v1/includes/inc_1/activations/atv_9"),
            Some("atv_9".to_string())
        );
        assert_eq!(activation_id_from_link("/papi/v1/"), None);
    }

    #[test]
    fn test_property_body_uses_property_version() {
        let request = ActivationRequest {
            version: 5,
            network: Network::Production,
            activation_type: ActivationType::Activate,
            note: None,
            notify_emails: vec!["ops@example.com".to_string()],
            acknowledge_all_warnings: true,
            use_fast_fallback: false,
            compliance_record: Some(ComplianceRecord::Emergency { ticket_id: None }),
        };
        let body = ActivationBody {
            property_version: Some(request.version),
            ..ActivationBody::from_request(&request)
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["propertyVersion"], 5);
        assert!(json.get("includeVersion").is_none());
        assert!(json.get("note").is_none());
        assert_eq!(json["network"], "PRODUCTION");
        assert_eq!(json["complianceRecord"]["noncomplianceReason"], "EMERGENCY");
    }

    #[test]
    fn test_envelopes_tolerate_missing_items() {
        let envelope: ActivationsEnvelope<PropertyActivation> =
            serde_json::from_str(r#"{"activations": {}}"#).unwrap();
        assert!(envelope.activations.items.is_empty());

        let envelope: ActivationsEnvelope<IncludeActivation> = serde_json::from_str(
            r#"{"activations": {"items": [{
                "activationId": "atv_1", "includeId": "inc_1", "includeVersion": 2,
                "network": "STAGING", "activationType": "ACTIVATE", "status": "PENDING",
                "submitDate": "2022-01-01T00:00:00Z", "updateDate": "2022-01-01T00:00:00Z"
            }]}}"#,
        )
        .unwrap();
        assert_eq!(envelope.activations.items[0].status, ActivationStatus::Pending);
    }

    #[test]
    fn test_not_found_maps_to_not_found_kind() {
        let err = api_error(
            "lookup".to_string(),
            EdgeGridError::Api {
                status: 404,
                title: "Not Found".to_string(),
                detail: None,
                body: String::new(),
            },
        );
        assert!(err.is_not_found());
    }
}
