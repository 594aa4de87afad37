//! Domain validation API over HTTP

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use akamai_tf_core::{ErrorKind, ProviderError, ProviderResult};
use akamai_tf_edgegrid::{EdgeGridClient, EdgeGridError};

use crate::api::DomainOwnershipApi;
use crate::models::{BatchResult, Domain, DomainKey, DomainQuery, ValidationMethod, ValidationScope};

const DOMAINS_PATH: &str = "/domain-validation/v1/domains";

#[derive(Debug, Serialize)]
struct DomainsBody<T> {
    domains: T,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default, deserialize_with = "akamai_tf_core::resource::null_as_default")]
    domains: Vec<Domain>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateItem<'a> {
    domain_name: &'a str,
    validation_scope: ValidationScope,
    validation_method: ValidationMethod,
}

fn api_error(context: &str, err: EdgeGridError) -> ProviderError {
    let kind = if err.is_not_found() {
        ErrorKind::NotFound
    } else {
        ErrorKind::Api
    };
    ProviderError::new(context).with_kind(kind).with_cause(err)
}

/// `DomainOwnershipApi` backed by a signed EdgeGrid client
#[derive(Debug, Clone)]
pub struct HttpDomainOwnershipClient {
    client: EdgeGridClient,
}

impl HttpDomainOwnershipClient {
    pub fn new(client: EdgeGridClient) -> Self {
        Self { client }
    }

    /// POST a batch; an empty success body counts as a clean result
    async fn batch<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        context: &str,
    ) -> ProviderResult<BatchResult> {
        let result: Option<BatchResult> = self
            .client
            .post(path, &[], body)
            .await
            .map_err(|e| api_error(context, e))?;
        Ok(result.unwrap_or_default())
    }
}

#[async_trait]
impl DomainOwnershipApi for HttpDomainOwnershipClient {
    async fn search_domains(&self, queries: &[DomainQuery]) -> ProviderResult<Vec<Domain>> {
        debug!("searching {} domains", queries.len());
        let path = format!("{}/search", DOMAINS_PATH);
        let response: SearchResponse = self
            .client
            .post(
                &path,
                &[("includeAll", "true".to_string())],
                &DomainsBody { domains: queries },
            )
            .await
            .map_err(|e| api_error("failed to search domains", e))?;
        Ok(response.domains)
    }

    async fn add_domains(&self, domains: &[DomainKey]) -> ProviderResult<BatchResult> {
        self.batch(
            DOMAINS_PATH,
            &DomainsBody { domains },
            "failed to add domains",
        )
        .await
    }

    async fn delete_domains(&self, domains: &[DomainKey]) -> ProviderResult<BatchResult> {
        let result: Option<BatchResult> = self
            .client
            .delete(DOMAINS_PATH, &[], Some(&DomainsBody { domains }))
            .await
            .map_err(|e| api_error("failed to delete domains", e))?;
        Ok(result.unwrap_or_default())
    }

    async fn validate_domains(
        &self,
        domains: &[(DomainKey, ValidationMethod)],
    ) -> ProviderResult<BatchResult> {
        let items: Vec<ValidateItem<'_>> = domains
            .iter()
            .map(|(key, method)| ValidateItem {
                domain_name: &key.domain_name,
                validation_scope: key.validation_scope,
                validation_method: *method,
            })
            .collect();
        let path = format!("{}/validate-now", DOMAINS_PATH);
        self.batch(
            &path,
            &DomainsBody { domains: items },
            "failed to request domain validation",
        )
        .await
    }

    async fn invalidate_domains(&self, domains: &[DomainKey]) -> ProviderResult<BatchResult> {
        let path = format!("{}/invalidate", DOMAINS_PATH);
        self.batch(
            &path,
            &DomainsBody { domains },
            "failed to invalidate domains",
        )
        .await
    }
}
