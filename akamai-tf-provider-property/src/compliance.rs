//! Compliance records attached to PRODUCTION activations

use akamai_tf_core::validation::ValidationError;
use serde::{Deserialize, Serialize};

/// Why a production change skipped (or followed) the change process
///
/// Serialized exactly as PAPI expects it, tagged by `noncomplianceReason`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "noncomplianceReason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceRecord {
    /// The change followed the process
    #[serde(rename_all = "camelCase")]
    None {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        customer_email: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        peer_reviewed_by: Option<String>,
        #[serde(default)]
        unit_tested: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ticket_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Other {
        #[serde(default)]
        other_noncompliance_reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ticket_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    NoProductionTraffic {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ticket_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Emergency {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ticket_id: Option<String>,
    },
}

impl ComplianceRecord {
    pub fn reason(&self) -> &'static str {
        match self {
            ComplianceRecord::None { .. } => "NONE",
            ComplianceRecord::Other { .. } => "OTHER",
            ComplianceRecord::NoProductionTraffic { .. } => "NO_PRODUCTION_TRAFFIC",
            ComplianceRecord::Emergency { .. } => "EMERGENCY",
        }
    }

    pub fn validate(&self, errors: &mut Vec<ValidationError>) {
        match self {
            ComplianceRecord::Other {
                other_noncompliance_reason,
                ..
            } if other_noncompliance_reason.trim().is_empty() => {
                errors.push(ValidationError::missing(
                    "compliance_record.other_noncompliance_reason",
                ));
            }
            ComplianceRecord::None {
                customer_email: Some(email),
                ..
            } if !email.contains('@') => {
                errors.push(ValidationError::invalid(
                    "compliance_record.customer_email",
                    email.as_str(),
                    "not an email address",
                ));
            }
            _ => {}
        }
    }
}
