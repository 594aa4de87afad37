//! Activation lookup and the activate/deactivate engine
//!
//! Property and include activations share the same life cycle: look for an
//! activation that already covers the request, submit one otherwise, then
//! poll until it settles. `ActivationTarget` abstracts the three calls that
//! differ between the two.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use log::info;

use akamai_tf_core::poll::{Phase, PollOptions, poll_until};
use akamai_tf_core::{OperationContext, ProviderError, ProviderResult};

use crate::models::{ActivationRecord, ActivationStatus, ActivationType, Network};
use crate::request::ActivationRequest;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("there is no active version on {0} network")]
    NoCurrentActivation(Network),

    #[error("activation {activation_id} has an invalid {field} '{value}': {reason}")]
    DateFormat {
        activation_id: String,
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl From<LookupError> for ProviderError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NoCurrentActivation(_) => ProviderError::not_found(err.to_string()),
            LookupError::DateFormat { .. } => ProviderError::new(err.to_string()),
        }
    }
}

fn parse_date<A: ActivationRecord>(
    record: &A,
    field: &'static str,
    value: &str,
) -> Result<DateTime<FixedOffset>, LookupError> {
    DateTime::parse_from_rfc3339(value).map_err(|e| LookupError::DateFormat {
        activation_id: record.activation_id().to_string(),
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Sort newest first by the given timestamp; ties keep server order
fn newest_first<'a, A, I, F>(
    records: I,
    field: &'static str,
    date: F,
) -> Result<Vec<&'a A>, LookupError>
where
    A: ActivationRecord + 'a,
    I: Iterator<Item = &'a A>,
    F: Fn(&A) -> &str,
{
    let mut dated = Vec::new();
    for record in records {
        dated.push((parse_date(record, field, date(record))?, record));
    }
    dated.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(dated.into_iter().map(|(_, r)| r).collect())
}

/// The activation currently serving traffic on `network`
///
/// Walks the network's records from the most recently updated. The first
/// active or pending record decides: an ACTIVATE is the current activation,
/// a DEACTIVATE means nothing is active.
pub fn find_latest_activation<A: ActivationRecord>(
    activations: &[A],
    network: Network,
) -> Result<&A, LookupError> {
    let sorted = newest_first(
        activations.iter().filter(|a| a.network() == network),
        "updateDate",
        |a| a.update_date(),
    )?;

    for record in sorted {
        if !record.status().is_active_or_pending() {
            continue;
        }
        return match record.activation_type() {
            ActivationType::Activate => Ok(record),
            ActivationType::Deactivate => Err(LookupError::NoCurrentActivation(network)),
        };
    }
    Err(LookupError::NoCurrentActivation(network))
}

/// Criteria for finding an existing activation that covers a request
#[derive(Debug, Clone, Copy)]
pub struct ActivationQuery {
    pub version: u32,
    pub network: Network,
    pub activation_type: ActivationType,
    pub accept: fn(&ActivationStatus) -> bool,
}

impl ActivationQuery {
    /// Accept records that are active or still in progress
    pub fn live(version: u32, network: Network, activation_type: ActivationType) -> Self {
        Self {
            version,
            network,
            activation_type,
            accept: ActivationStatus::is_active_or_pending,
        }
    }

    /// Accept only records still in progress
    pub fn in_flight(version: u32, network: Network, activation_type: ActivationType) -> Self {
        Self {
            version,
            network,
            activation_type,
            accept: ActivationStatus::is_pending,
        }
    }
}

/// Most recently submitted record matching `query`, if any
///
/// Aborted records never match.
pub fn lookup_activation<'a, A: ActivationRecord>(
    activations: &'a [A],
    query: &ActivationQuery,
) -> Result<Option<&'a A>, LookupError> {
    let candidates = activations.iter().filter(|a| {
        a.version() == query.version
            && a.network() == query.network
            && a.activation_type() == query.activation_type
    });
    let sorted = newest_first(candidates, "submitDate", |a| a.submit_date())?;
    Ok(sorted
        .into_iter()
        .find(|a| *a.status() != ActivationStatus::Aborted && (query.accept)(a.status())))
}

/// Map an observed record onto the poll loop's phases
pub fn activation_phase<A: ActivationRecord>(record: &A) -> Phase {
    let deactivating = record.activation_type() == ActivationType::Deactivate;
    match record.status() {
        ActivationStatus::Active => Phase::Done,
        ActivationStatus::Deactivated if deactivating => Phase::Done,
        ActivationStatus::Aborted => Phase::Aborted,
        ActivationStatus::Failed => Phase::Failed(format!(
            "activation {} ended with status FAILED",
            record.activation_id()
        )),
        ActivationStatus::Deactivated | ActivationStatus::Inactive => Phase::Failed(format!(
            "activation {} ended with status {} before going live",
            record.activation_id(),
            record.status()
        )),
        _ => Phase::Pending,
    }
}

/// Something that can be activated: a property or an include
#[async_trait]
pub trait ActivationTarget: Send + Sync {
    type Record: ActivationRecord + Clone + Send + Sync;

    /// Human readable name (e.g., "property prp_1")
    fn describe(&self) -> String;

    async fn list(&self) -> ProviderResult<Vec<Self::Record>>;

    async fn submit(&self, request: &ActivationRequest) -> ProviderResult<String>;

    async fn fetch(&self, activation_id: &str) -> ProviderResult<Option<Self::Record>>;
}

fn operation_name<T: ActivationTarget + ?Sized>(
    target: &T,
    activation_type: ActivationType,
    version: u32,
    network: Network,
) -> String {
    let verb = match activation_type {
        ActivationType::Activate => "activation",
        ActivationType::Deactivate => "deactivation",
    };
    format!(
        "{} of {} version {} on {}",
        verb,
        target.describe(),
        version,
        network
    )
}

/// The record currently active on `network`, or `None`
pub async fn current_activation<T: ActivationTarget>(
    target: &T,
    network: Network,
) -> ProviderResult<Option<T::Record>> {
    let records = target.list().await?;
    match find_latest_activation(&records, network) {
        Ok(record) => Ok(Some(record.clone())),
        Err(LookupError::NoCurrentActivation(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Activate (or deactivate) as requested and wait for the result
///
/// An existing record for the same version, network and type is adopted
/// instead of submitting a duplicate.
pub async fn apply_activation<T: ActivationTarget>(
    ctx: &OperationContext,
    target: &T,
    request: &ActivationRequest,
    poll: PollOptions,
) -> ProviderResult<T::Record> {
    let operation = operation_name(
        target,
        request.activation_type,
        request.version,
        request.network,
    );
    let query = match request.activation_type {
        ActivationType::Activate => {
            ActivationQuery::live(request.version, request.network, request.activation_type)
        }
        ActivationType::Deactivate => {
            ActivationQuery::in_flight(request.version, request.network, request.activation_type)
        }
    };

    let interrupted = |i| ProviderError::interrupted(&operation, i);
    let records = ctx.run(target.list()).await.map_err(interrupted)??;
    let activation_id = match lookup_activation(&records, &query)? {
        Some(found) if *found.status() == ActivationStatus::Active => {
            info!("{}: already live as {}", operation, found.activation_id());
            return Ok(found.clone());
        }
        Some(found) => {
            info!(
                "{}: resuming pending activation {}",
                operation,
                found.activation_id()
            );
            found.activation_id().to_string()
        }
        None => {
            let id = ctx.run(target.submit(request)).await.map_err(interrupted)??;
            info!("{}: submitted as {}", operation, id);
            id
        }
    };

    wait_for_activation(ctx, target, &activation_id, &operation, poll).await
}

/// Poll one activation until it settles
pub async fn wait_for_activation<T: ActivationTarget>(
    ctx: &OperationContext,
    target: &T,
    activation_id: &str,
    operation: &str,
    poll: PollOptions,
) -> ProviderResult<T::Record> {
    poll_until(
        ctx,
        poll,
        operation,
        || target.fetch(activation_id),
        activation_phase,
    )
    .await
    .map_err(ProviderError::from)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::PropertyActivation;

    pub(crate) fn record(
        id: &str,
        version: u32,
        network: Network,
        activation_type: ActivationType,
        status: ActivationStatus,
        date: &str,
    ) -> PropertyActivation {
        PropertyActivation {
            activation_id: id.to_string(),
            property_id: "prp_1".to_string(),
            property_name: "example.com".to_string(),
            property_version: version,
            network,
            activation_type,
            status,
            submit_date: date.to_string(),
            update_date: date.to_string(),
            note: None,
            notify_emails: vec!["ops@example.com".to_string()],
        }
    }

    use ActivationStatus::*;
    use ActivationType::*;
    use Network::*;

    #[test]
    fn test_lookup_picks_most_recent_matching_version() {
        let records = vec![
            record("atv_1", 1, Staging, Activate, Aborted, "2014-03-02T02:22:12Z"),
            record("atv_2", 1, Staging, Activate, Active, "2014-03-02T02:22:12Z"),
            record("atv_3", 2, Staging, Activate, Active, "2016-03-22T02:22:12Z"),
            record("atv_4", 2, Staging, Activate, Active, "2014-03-02T02:22:12Z"),
        ];
        let query = ActivationQuery::live(2, Staging, Activate);
        let found = lookup_activation(&records, &query).unwrap().unwrap();
        assert_eq!(found.activation_id, "atv_3");
    }

    #[test]
    fn test_lookup_never_accepts_aborted() {
        let records = vec![record(
            "atv_1",
            1,
            Staging,
            Activate,
            Aborted,
            "2014-03-02T02:22:12Z",
        )];
        let query = ActivationQuery {
            accept: |_| true,
            ..ActivationQuery::live(1, Staging, Activate)
        };
        assert_eq!(lookup_activation(&records, &query).unwrap(), None);
    }

    #[test]
    fn test_latest_activation_on_network() {
        let records = vec![
            record("atv_1", 1, Staging, Activate, Active, "2020-01-01T00:00:00Z"),
            record("atv_2", 2, Production, Activate, Active, "2022-01-01T00:00:00Z"),
            record("atv_3", 3, Staging, Activate, Pending, "2021-01-01T00:00:00Z"),
        ];
        let current = find_latest_activation(&records, Staging).unwrap();
        assert_eq!(current.activation_id, "atv_3");
        let current = find_latest_activation(&records, Production).unwrap();
        assert_eq!(current.activation_id, "atv_2");
    }

    #[test]
    fn test_recent_deactivation_means_nothing_is_active() {
        let records = vec![
            record("atv_1", 1, Staging, Activate, Active, "2020-01-01T00:00:00Z"),
            record("atv_2", 1, Staging, Deactivate, Active, "2020-06-01T00:00:00Z"),
            record("atv_3", 2, Staging, Activate, Failed, "2021-01-01T00:00:00Z"),
        ];
        assert_eq!(
            find_latest_activation(&records, Staging),
            Err(LookupError::NoCurrentActivation(Staging))
        );
        assert_eq!(
            find_latest_activation(&records, Production),
            Err(LookupError::NoCurrentActivation(Production))
        );
    }

    #[test]
    fn test_malformed_timestamp_is_reported() {
        let records = vec![
            record("atv_1", 1, Staging, Activate, Active, "2020-01-01T00:00:00Z"),
            record("atv_2", 2, Staging, Activate, Active, "yesterday"),
        ];
        let err = find_latest_activation(&records, Staging).unwrap_err();
        assert!(matches!(
            err,
            LookupError::DateFormat { ref activation_id, field: "updateDate", .. } if activation_id == "atv_2"
        ));
        let provider_error = ProviderError::from(err);
        assert!(!provider_error.is_not_found());
    }

    #[test]
    fn test_phase_classification() {
        let r = |t, s| record("atv_1", 1, Staging, t, s, "2020-01-01T00:00:00Z");
        assert_eq!(activation_phase(&r(Activate, Active)), Phase::Done);
        assert_eq!(activation_phase(&r(Activate, Zone1)), Phase::Pending);
        assert_eq!(activation_phase(&r(Activate, Aborted)), Phase::Aborted);
        assert_eq!(activation_phase(&r(Deactivate, Deactivated)), Phase::Done);
        assert!(matches!(
            activation_phase(&r(Activate, Failed)),
            Phase::Failed(reason) if reason.contains("FAILED")
        ));
        assert!(matches!(
            activation_phase(&r(Activate, Deactivated)),
            Phase::Failed(_)
        ));
    }
}
