//! PAPI wire models: activations and hostnames

use std::fmt;
use std::str::FromStr;

use akamai_tf_core::resource::null_as_default;
use serde::{Deserialize, Serialize};

/// Akamai delivery network
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Network {
    #[default]
    Staging,
    Production,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Staging => "STAGING",
            Network::Production => "PRODUCTION",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "STAGING" => Ok(Network::Staging),
            "PRODUCTION" => Ok(Network::Production),
            _ => Err(format!(
                "invalid network '{}', expected STAGING or PRODUCTION",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivationType {
    Activate,
    Deactivate,
}

impl fmt::Display for ActivationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationType::Activate => f.write_str("ACTIVATE"),
            ActivationType::Deactivate => f.write_str("DEACTIVATE"),
        }
    }
}

/// Activation status as reported by PAPI
///
/// Unrecognized values are kept in `Unknown` and treated as pending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivationStatus {
    New,
    Pending,
    Zone1,
    Zone2,
    Zone3,
    PendingDeactivation,
    PendingCancellation,
    Active,
    Failed,
    Aborted,
    Deactivated,
    Inactive,
    Unknown(String),
}

impl ActivationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ActivationStatus::New => "NEW",
            ActivationStatus::Pending => "PENDING",
            ActivationStatus::Zone1 => "ZONE_1",
            ActivationStatus::Zone2 => "ZONE_2",
            ActivationStatus::Zone3 => "ZONE_3",
            ActivationStatus::PendingDeactivation => "PENDING_DEACTIVATION",
            ActivationStatus::PendingCancellation => "PENDING_CANCELLATION",
            ActivationStatus::Active => "ACTIVE",
            ActivationStatus::Failed => "FAILED",
            ActivationStatus::Aborted => "ABORTED",
            ActivationStatus::Deactivated => "DEACTIVATED",
            ActivationStatus::Inactive => "INACTIVE",
            ActivationStatus::Unknown(s) => s,
        }
    }

    /// Non-terminal: the activation is still propagating
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            ActivationStatus::New
                | ActivationStatus::Pending
                | ActivationStatus::Zone1
                | ActivationStatus::Zone2
                | ActivationStatus::Zone3
                | ActivationStatus::PendingDeactivation
                | ActivationStatus::PendingCancellation
                | ActivationStatus::Unknown(_)
        )
    }

    /// Counts towards "what is live": active or on its way there
    pub fn is_active_or_pending(&self) -> bool {
        *self == ActivationStatus::Active || self.is_pending()
    }
}

impl From<String> for ActivationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "NEW" => ActivationStatus::New,
            "PENDING" => ActivationStatus::Pending,
            "ZONE_1" => ActivationStatus::Zone1,
            "ZONE_2" => ActivationStatus::Zone2,
            "ZONE_3" => ActivationStatus::Zone3,
            "PENDING_DEACTIVATION" => ActivationStatus::PendingDeactivation,
            "PENDING_CANCELLATION" => ActivationStatus::PendingCancellation,
            "ACTIVE" => ActivationStatus::Active,
            "FAILED" => ActivationStatus::Failed,
            "ABORTED" => ActivationStatus::Aborted,
            "DEACTIVATED" => ActivationStatus::Deactivated,
            "INACTIVE" => ActivationStatus::Inactive,
            _ => ActivationStatus::Unknown(s),
        }
    }
}

impl From<ActivationStatus> for String {
    fn from(status: ActivationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ActivationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common view over property and include activation records
pub trait ActivationRecord {
    fn activation_id(&self) -> &str;
    fn version(&self) -> u32;
    fn network(&self) -> Network;
    fn activation_type(&self) -> ActivationType;
    fn status(&self) -> &ActivationStatus;
    /// RFC 3339 submit timestamp as sent by the server
    fn submit_date(&self) -> &str;
    /// RFC 3339 update timestamp as sent by the server
    fn update_date(&self) -> &str;
    fn notify_emails(&self) -> &[String];
    fn note(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyActivation {
    pub activation_id: String,
    #[serde(default)]
    pub property_id: String,
    #[serde(default)]
    pub property_name: String,
    pub property_version: u32,
    pub network: Network,
    pub activation_type: ActivationType,
    pub status: ActivationStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub submit_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub update_date: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notify_emails: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludeActivation {
    pub activation_id: String,
    #[serde(default)]
    pub include_activation_id: Option<String>,
    #[serde(default)]
    pub include_id: String,
    #[serde(default)]
    pub include_name: String,
    pub include_version: u32,
    pub network: Network,
    pub activation_type: ActivationType,
    pub status: ActivationStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub submit_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub update_date: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notify_emails: Vec<String>,
}

macro_rules! impl_activation_record {
    ($ty:ty, $version:ident) => {
        impl ActivationRecord for $ty {
            fn activation_id(&self) -> &str {
                &self.activation_id
            }
            fn version(&self) -> u32 {
                self.$version
            }
            fn network(&self) -> Network {
                self.network
            }
            fn activation_type(&self) -> ActivationType {
                self.activation_type
            }
            fn status(&self) -> &ActivationStatus {
                &self.status
            }
            fn submit_date(&self) -> &str {
                &self.submit_date
            }
            fn update_date(&self) -> &str {
                &self.update_date
            }
            fn notify_emails(&self) -> &[String] {
                &self.notify_emails
            }
            fn note(&self) -> Option<&str> {
                self.note.as_deref()
            }
        }
    };
}

impl_activation_record!(PropertyActivation, property_version);
impl_activation_record!(IncludeActivation, include_version);

/// Property reference, with the contract and group when known
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertyRef {
    pub property_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl PropertyRef {
    pub fn new(property_id: impl Into<String>) -> Self {
        Self {
            property_id: with_prefix("prp_", &property_id.into()),
            contract_id: None,
            group_id: None,
        }
    }

    pub fn with_contract(mut self, contract_id: Option<String>, group_id: Option<String>) -> Self {
        self.contract_id = contract_id.map(|c| with_prefix("ctr_", &c));
        self.group_id = group_id.map(|g| with_prefix("grp_", &g));
        self
    }

    /// contractId/groupId query parameters
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(c) = &self.contract_id {
            query.push(("contractId", c.clone()));
        }
        if let Some(g) = &self.group_id {
            query.push(("groupId", g.clone()));
        }
        query
    }
}

/// Include reference; includes always live in a contract and group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeRef {
    pub include_id: String,
    pub contract_id: String,
    pub group_id: String,
}

impl IncludeRef {
    pub fn new(
        include_id: impl Into<String>,
        contract_id: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            include_id: with_prefix("inc_", &include_id.into()),
            contract_id: with_prefix("ctr_", &contract_id.into()),
            group_id: with_prefix("grp_", &group_id.into()),
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("contractId", self.contract_id.clone()),
            ("groupId", self.group_id.clone()),
        ]
    }
}

/// Add an ID prefix (e.g. "prp_") unless already present
pub fn with_prefix(prefix: &str, id: &str) -> String {
    let id = id.trim();
    if id.is_empty() || id.starts_with(prefix) {
        id.to_string()
    } else {
        format!("{}{}", prefix, id)
    }
}

/// One hostname on a property version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hostname {
    pub cname_from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname_to: Option<String>,
    #[serde(default = "default_cname_type")]
    pub cname_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_hostname_id: Option<String>,
    #[serde(default = "default_cert_provisioning_type")]
    pub cert_provisioning_type: String,
}

fn default_cname_type() -> String {
    "EDGE_HOSTNAME".to_string()
}

fn default_cert_provisioning_type() -> String {
    "DEFAULT".to_string()
}

impl Hostname {
    pub fn new(cname_from: impl Into<String>, cname_to: impl Into<String>) -> Self {
        Self {
            cname_from: cname_from.into(),
            cname_to: Some(cname_to.into()),
            cname_type: default_cname_type(),
            edge_hostname_id: None,
            cert_provisioning_type: default_cert_provisioning_type(),
        }
    }

    /// Hostnames are matched case-insensitively
    pub fn key(&self) -> String {
        self.cname_from.to_ascii_lowercase()
    }
}

/// Staging vs production view of one hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostnameDiffItem {
    pub cname_from: String,
    #[serde(default)]
    pub staging_cname_to: Option<String>,
    #[serde(default)]
    pub staging_cert_type: Option<String>,
    #[serde(default)]
    pub staging_edge_hostname_id: Option<String>,
    #[serde(default)]
    pub production_cname_to: Option<String>,
    #[serde(default)]
    pub production_cert_type: Option<String>,
    #[serde(default)]
    pub production_edge_hostname_id: Option<String>,
}

/// One page of the hostnames diff listing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostnameDiffPage {
    pub items: Vec<HostnameDiffItem>,
    pub total_items: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_activation_from_wire() {
        let json = r#"{
            "activationId": "atv_1",
            "propertyName": "example.com",
            "propertyId": "prp_173136",
            "propertyVersion": 3,
            "network": "STAGING",
            "activationType": "ACTIVATE",
            "status": "ZONE_2",
            "submitDate": "2014-03-02T02:22:12Z",
            "updateDate": "2014-03-01T21:12:57Z",
            "note": null,
            "notifyEmails": null
        }"#;
        let activation: PropertyActivation = serde_json::from_str(json).unwrap();
        assert_eq!(activation.version(), 3);
        assert_eq!(activation.status, ActivationStatus::Zone2);
        assert!(activation.status.is_pending());
        assert!(activation.notify_emails.is_empty());
        assert_eq!(activation.note(), None);
    }

    #[test]
    fn test_unknown_status_is_kept_and_pending() {
        let status: ActivationStatus = serde_json::from_str(r#""PROPAGATING""#).unwrap();
        assert_eq!(status, ActivationStatus::Unknown("PROPAGATING".to_string()));
        assert!(status.is_pending());
        assert_eq!(serde_json::to_string(&status).unwrap(), r#""PROPAGATING""#);
    }

    #[test]
    fn test_terminal_statuses_are_not_pending() {
        for status in [
            ActivationStatus::Active,
            ActivationStatus::Failed,
            ActivationStatus::Aborted,
            ActivationStatus::Deactivated,
        ] {
            assert!(!status.is_pending(), "{} should be terminal", status);
        }
    }

    #[test]
    fn test_network_parsing_is_case_insensitive() {
        assert_eq!("staging".parse::<Network>(), Ok(Network::Staging));
        assert_eq!("PRODUCTION".parse::<Network>(), Ok(Network::Production));
        assert!("prod".parse::<Network>().is_err());
    }

    #[test]
    fn test_id_prefixes() {
        assert_eq!(PropertyRef::new("123").property_id, "prp_123");
        assert_eq!(PropertyRef::new("prp_123").property_id, "prp_123");
        let include = IncludeRef::new("9", "ctr_1", "2");
        assert_eq!(include.include_id, "inc_9");
        assert_eq!(include.group_id, "grp_2");
        assert_eq!(
            include.query(),
            vec![
                ("contractId", "ctr_1".to_string()),
                ("groupId", "grp_2".to_string())
            ]
        );
    }

    #[test]
    fn test_hostname_defaults() {
        let h: Hostname =
            serde_json::from_str(r#"{"cnameFrom":"WWW.example.com","cnameTo":"e.edgekey.net"}"#)
                .unwrap();
        assert_eq!(h.cname_type, "EDGE_HOSTNAME");
        assert_eq!(h.cert_provisioning_type, "DEFAULT");
        assert_eq!(h.key(), "www.example.com");
    }
}
