//! Request builder for property and include activations
//!
//! Checks the configuration before anything is sent: version, notification
//! emails and the compliance record rules that depend on the network.

use akamai_tf_core::Diagnostics;
use akamai_tf_core::validation::ValidationError;

use crate::compliance::ComplianceRecord;
use crate::models::{ActivationType, Network};

/// What is sent to PAPI to (de)activate one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    pub version: u32,
    pub network: Network,
    pub activation_type: ActivationType,
    pub note: Option<String>,
    pub notify_emails: Vec<String>,
    pub acknowledge_all_warnings: bool,
    pub use_fast_fallback: bool,
    pub compliance_record: Option<ComplianceRecord>,
}

/// User-facing settings shared by the activation resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationSettings<'a> {
    pub version: u32,
    pub network: Network,
    pub note: Option<&'a str>,
    pub notify_emails: &'a [String],
    pub acknowledge_all_warnings: bool,
    pub compliance_record: Option<&'a ComplianceRecord>,
}

impl ActivationSettings<'_> {
    /// Append every problem with these settings to `errors`
    pub fn validate(&self, errors: &mut Vec<ValidationError>) {
        if self.version < 1 {
            errors.push(ValidationError::invalid(
                "version",
                self.version.to_string(),
                "must be 1 or greater",
            ));
        }
        if self.notify_emails.is_empty() {
            errors.push(ValidationError::missing("contact"));
        }
        for email in self.notify_emails {
            if !email.contains('@') {
                errors.push(ValidationError::invalid(
                    "contact",
                    email.as_str(),
                    "not an email address",
                ));
            }
        }
        match (self.network, self.compliance_record) {
            (Network::Production, None) => {
                errors.push(ValidationError::missing("compliance_record"));
            }
            (_, Some(record)) => record.validate(errors),
            _ => {}
        }
    }
}

/// Build the request for `activation_type`, returning warnings alongside
pub fn build_activation_request(
    settings: &ActivationSettings<'_>,
    activation_type: ActivationType,
) -> Result<(ActivationRequest, Diagnostics), Vec<ValidationError>> {
    let mut errors = Vec::new();
    settings.validate(&mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut diagnostics = Diagnostics::new();
    let compliance_record = match (settings.network, settings.compliance_record) {
        (Network::Production, record) => record.cloned(),
        (Network::Staging, Some(record)) => {
            log::warn!("compliance record ignored for STAGING activation");
            diagnostics.warning(
                "compliance_record is ignored on STAGING",
                Some(format!(
                    "the {} compliance record is only sent with PRODUCTION activations",
                    record.reason()
                )),
            );
            None
        }
        (Network::Staging, None) => None,
    };

    let request = ActivationRequest {
        version: settings.version,
        network: settings.network,
        activation_type,
        note: settings
            .note
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty()),
        notify_emails: settings.notify_emails.to_vec(),
        acknowledge_all_warnings: settings.acknowledge_all_warnings,
        use_fast_fallback: false,
        compliance_record,
    };
    Ok((request, diagnostics))
}
