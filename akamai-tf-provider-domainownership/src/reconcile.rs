//! Reconcile - Decide which domains to add, import or remove
//!
//! Works on three sets keyed by `(domain_name, validation_scope)`: what the
//! state holds, what the plan wants, and what a search found on the server.
//! Domains already present on the server in a usable condition are imported
//! instead of being submitted again. Domains kept in both state and plan are
//! submitted again when the server no longer has them or their validation
//! lapsed.

use std::collections::{BTreeMap, BTreeSet};

use akamai_tf_core::ProviderError;

use crate::models::{Domain, DomainKey, ValidationLevel, ValidationStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("domain {0} is already part of other validated domain/wildcard")]
    AlreadyCovered(DomainKey),
}

impl From<ReconcileError> for ProviderError {
    fn from(err: ReconcileError) -> Self {
        ProviderError::validation(err.to_string())
    }
}

/// Work derived from state, plan and server; every list is sorted by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub to_add: Vec<DomainKey>,
    pub to_import: Vec<Domain>,
    pub to_remove: Vec<DomainKey>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_import.is_empty() && self.to_remove.is_empty()
    }
}

/// Index search results by key
///
/// When the same key comes back twice, the FQDN-level entry wins over a
/// covering root/wildcard entry.
pub fn server_map(found: impl IntoIterator<Item = Domain>) -> BTreeMap<DomainKey, Domain> {
    let mut map: BTreeMap<DomainKey, Domain> = BTreeMap::new();
    for domain in found.into_iter().filter(Domain::exists) {
        let key = domain.key();
        match map.get(&key) {
            Some(existing) if existing.is_fqdn() && !domain.is_fqdn() => {}
            _ => {
                map.insert(key, domain);
            }
        }
    }
    map
}

enum Placement {
    Add,
    Import,
    Covered,
}

fn place(server: Option<&Domain>) -> Placement {
    let Some(domain) = server else {
        return Placement::Add;
    };
    match (&domain.validation_level, &domain.domain_status) {
        (_, Some(status)) if status.is_lapsed() => Placement::Add,
        (Some(ValidationLevel::RootOrWildcard), Some(ValidationStatus::Validated)) => {
            Placement::Covered
        }
        (
            Some(ValidationLevel::Fqdn) | None,
            Some(
                ValidationStatus::RequestAccepted
                | ValidationStatus::ValidationInProgress
                | ValidationStatus::Validated,
            ),
        ) => Placement::Import,
        _ => Placement::Add,
    }
}

pub fn reconcile(
    state: &[DomainKey],
    plan: &[DomainKey],
    server: &BTreeMap<DomainKey, Domain>,
) -> Result<Reconciliation, ReconcileError> {
    let state: BTreeSet<&DomainKey> = state.iter().collect();
    let plan: BTreeSet<&DomainKey> = plan.iter().collect();

    let mut result = Reconciliation::default();
    for key in &plan {
        match place(server.get(*key)) {
            Placement::Add => result.to_add.push((*key).clone()),
            Placement::Import if state.contains(key) => {}
            Placement::Import => {
                if let Some(domain) = server.get(*key) {
                    result.to_import.push(domain.clone());
                }
            }
            Placement::Covered => return Err(ReconcileError::AlreadyCovered((*key).clone())),
        }
    }
    result.to_remove = state.difference(&plan).map(|k| (*k).clone()).collect();
    Ok(result)
}

/// Domains about to be removed that have to be invalidated first
pub fn domains_to_invalidate(
    to_remove: &[DomainKey],
    server: &BTreeMap<DomainKey, Domain>,
) -> Vec<DomainKey> {
    to_remove
        .iter()
        .filter(|key| {
            server
                .get(*key)
                .is_some_and(|d| d.is_fqdn() && d.is_validated())
        })
        .cloned()
        .collect()
}
