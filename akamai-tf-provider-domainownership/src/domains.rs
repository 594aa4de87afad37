//! akamai_property_domainownership_domains resource
//!
//! Manages a set of domains submitted for ownership validation. Domains the
//! server already tracks are adopted into state rather than submitted again,
//! and validated domains are invalidated before they are removed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use akamai_tf_core::provider::{Applied, Identified, ResourceHandler};
use akamai_tf_core::validation::{Validate, ValidationError, require_non_empty};
use akamai_tf_core::{Diagnostics, OperationContext, ProviderError, ProviderResult};

use crate::api::{DomainOwnershipApi, check_batch};
use crate::import_id::{parse_import_id, resolve_import};
use crate::models::{Domain, DomainKey, DomainQuery};
use crate::reconcile::{domains_to_invalidate, reconcile, server_map};
use crate::search::search_all;

/// Comma-joined `domain:SCOPE` list in key order
pub fn domains_id<'a>(keys: impl IntoIterator<Item = &'a DomainKey>) -> String {
    let keys: BTreeSet<&DomainKey> = keys.into_iter().collect();
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn render_keys(keys: &[DomainKey]) -> String {
    domains_id(keys).replace(',', ", ")
}

/// Check a list of domains for blank names and repeated keys
pub(crate) fn validate_keys(keys: &[DomainKey], errors: &mut Vec<ValidationError>) {
    if keys.is_empty() {
        errors.push(ValidationError::missing("domains"));
    }
    let mut seen = BTreeSet::new();
    for key in keys {
        require_non_empty("domains.domain_name", &key.domain_name, errors);
        if !seen.insert(key) {
            errors.push(ValidationError::invalid(
                "domains",
                key.to_string(),
                "listed more than once",
            ));
        }
    }
}

pub(crate) fn queries(keys: &[DomainKey]) -> Vec<DomainQuery> {
    keys.iter().map(DomainQuery::from).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainsConfig {
    pub domains: Vec<DomainKey>,
}

impl DomainsConfig {
    /// Normalised keys in order
    pub fn keys(&self) -> Vec<DomainKey> {
        let mut keys: Vec<DomainKey> = self
            .domains
            .iter()
            .map(|d| DomainKey::new(&d.domain_name, d.validation_scope))
            .collect();
        keys.sort();
        keys
    }
}

impl Validate for DomainsConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        validate_keys(&self.keys(), &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainsState {
    /// Server view of each managed domain, including its challenge
    pub domains: Vec<Domain>,
}

impl DomainsState {
    pub fn keys(&self) -> Vec<DomainKey> {
        let mut keys: Vec<DomainKey> = self.domains.iter().map(Domain::key).collect();
        keys.sort();
        keys
    }
}

impl Identified for DomainsState {
    fn id(&self) -> String {
        domains_id(&self.keys())
    }
}

fn union(a: &[DomainKey], b: &[DomainKey]) -> Vec<DomainKey> {
    let all: BTreeSet<&DomainKey> = a.iter().chain(b).collect();
    all.into_iter().cloned().collect()
}

/// Keep the FQDN-level server entries for `keys`, in key order
fn project(keys: &[DomainKey], server: &BTreeMap<DomainKey, Domain>) -> Vec<Domain> {
    keys.iter()
        .filter_map(|key| server.get(key))
        .filter(|d| d.is_fqdn())
        .cloned()
        .collect()
}

pub struct DomainsResource {
    api: Arc<dyn DomainOwnershipApi>,
}

impl DomainsResource {
    pub fn new(api: Arc<dyn DomainOwnershipApi>) -> Self {
        Self { api }
    }

    async fn search(&self, keys: &[DomainKey]) -> ProviderResult<BTreeMap<DomainKey, Domain>> {
        let found = search_all(self.api.as_ref(), &queries(keys)).await?;
        Ok(server_map(found))
    }

    /// Add domains; if only some are accepted, delete those again
    async fn add_with_rollback(&self, keys: &[DomainKey]) -> ProviderResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        info!("adding {} domains: {}", keys.len(), render_keys(keys));
        let result = self.api.add_domains(keys).await?;
        if result.errors.is_empty() {
            return Ok(());
        }

        let failures: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
        let added: Vec<DomainKey> = result.successes.iter().map(Domain::key).collect();
        let rollback = if added.is_empty() {
            "no domains were added".to_string()
        } else {
            warn!(
                "rolling back {} domains added before the failure",
                added.len()
            );
            match self.api.delete_domains(&added).await {
                Ok(r) if r.errors.is_empty() => {
                    format!("rolled back {}", render_keys(&added))
                }
                Ok(r) => {
                    let left: Vec<String> = r.errors.iter().map(ToString::to_string).collect();
                    format!("rollback failed for: {}", left.join("; "))
                }
                Err(e) => format!("rollback failed: {}", e),
            }
        };
        Err(ProviderError::new(format!(
            "adding domains failed: {}; {}",
            failures.join("; "),
            rollback
        )))
    }

    async fn remove(
        &self,
        keys: &[DomainKey],
        server: &BTreeMap<DomainKey, Domain>,
    ) -> ProviderResult<()> {
        let invalidate = domains_to_invalidate(keys, server);
        if !invalidate.is_empty() {
            info!("invalidating {}", render_keys(&invalidate));
            check_batch(
                "invalidating domains",
                self.api.invalidate_domains(&invalidate).await?,
            )?;
        }

        let existing: Vec<DomainKey> = keys
            .iter()
            .filter(|k| server.get(*k).is_some_and(Domain::is_fqdn))
            .cloned()
            .collect();
        if !existing.is_empty() {
            info!("deleting {}", render_keys(&existing));
            check_batch(
                "deleting domains",
                self.api.delete_domains(&existing).await?,
            )?;
        }
        Ok(())
    }

    async fn destroy(&self, keys: &[DomainKey]) -> ProviderResult<()> {
        let server = self.search(keys).await?;
        self.remove(keys, &server).await
    }

    async fn apply(
        &self,
        state: &[DomainKey],
        config: &DomainsConfig,
    ) -> ProviderResult<Applied<DomainsState>> {
        config.ensure_valid()?;
        let plan = config.keys();
        let server = self.search(&union(&state, &plan)).await?;
        let work = reconcile(state, &plan, &server)?;
        for domain in &work.to_import {
            debug!("{} already exists on the server, importing", domain.key());
        }

        self.remove(&work.to_remove, &server).await?;
        self.add_with_rollback(&work.to_add).await?;

        let refreshed = self.search(&plan).await?;
        let domains = project(&plan, &refreshed);
        if domains.len() != plan.len() {
            let missing: Vec<DomainKey> = plan
                .iter()
                .filter(|k| !domains.iter().any(|d| d.key() == **k))
                .cloned()
                .collect();
            return Err(ProviderError::not_found(format!(
                "domains not found after apply: {}",
                render_keys(&missing)
            )));
        }
        Ok(Applied::new(DomainsState { domains }))
    }
}

#[async_trait]
impl ResourceHandler for DomainsResource {
    type Config = DomainsConfig;
    type State = DomainsState;

    fn type_name(&self) -> &'static str {
        "akamai_property_domainownership_domains"
    }

    /// Warn about validated domains that the change is going to invalidate
    async fn plan(
        &self,
        _ctx: &OperationContext,
        prior: Option<&DomainsState>,
        config: &DomainsConfig,
    ) -> ProviderResult<Diagnostics> {
        config.ensure_valid()?;
        let state = prior.map(DomainsState::keys).unwrap_or_default();
        let plan = config.keys();
        let server = self.search(&union(&state, &plan)).await?;
        let work = reconcile(&state, &plan, &server)?;

        let mut diagnostics = Diagnostics::new();
        let invalidate = domains_to_invalidate(&work.to_remove, &server);
        if !invalidate.is_empty() {
            diagnostics.warning(
                "Validated domains will be invalidated",
                Some(format!(
                    "removing these domains invalidates their ownership validation: {}",
                    render_keys(&invalidate)
                )),
            );
        }
        Ok(diagnostics)
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        config: &DomainsConfig,
    ) -> ProviderResult<Applied<DomainsState>> {
        ctx.run(self.apply(&[], config))
            .await
            .map_err(|i| ProviderError::interrupted("adding domains", i))?
    }

    /// Refresh statuses and challenges; domains gone from the server drop out
    async fn read(
        &self,
        _ctx: &OperationContext,
        state: &DomainsState,
    ) -> ProviderResult<Option<DomainsState>> {
        let keys = state.keys();
        let server = self.search(&keys).await?;
        let domains = project(&keys, &server);
        if domains.is_empty() {
            return Ok(None);
        }
        Ok(Some(DomainsState { domains }))
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        prior: &DomainsState,
        config: &DomainsConfig,
    ) -> ProviderResult<Applied<DomainsState>> {
        ctx.run(self.apply(&prior.keys(), config))
            .await
            .map_err(|i| ProviderError::interrupted("updating domains", i))?
    }

    async fn delete(
        &self,
        ctx: &OperationContext,
        state: &DomainsState,
    ) -> ProviderResult<Diagnostics> {
        ctx.run(self.destroy(&state.keys()))
            .await
            .map_err(|i| ProviderError::interrupted("deleting domains", i))??;
        Ok(Diagnostics::new())
    }

    async fn import(&self, _ctx: &OperationContext, id: &str) -> ProviderResult<DomainsState> {
        let queries = parse_import_id(id)?;
        let found = search_all(self.api.as_ref(), &queries).await?;
        let keys = resolve_import(&queries, &found)?;
        Ok(DomainsState {
            domains: project(&keys, &server_map(found)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ValidationScope, ValidationStatus};
    use crate::testing::FakeDomainOwnership;

    fn host(name: &str) -> DomainKey {
        DomainKey::new(name, ValidationScope::Host)
    }

    fn config(keys: &[DomainKey]) -> DomainsConfig {
        DomainsConfig {
            domains: keys.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_create_adds_new_and_adopts_existing() {
        let fake = Arc::new(FakeDomainOwnership::default());
        fake.seed_validated(host("old.example.com"));
        let res = DomainsResource::new(fake.clone());

        let applied = res
            .create(
                &OperationContext::background(),
                &config(&[host("new.example.com"), host("old.example.com")]),
            )
            .await
            .unwrap();

        assert_eq!(fake.added(), vec![vec![host("new.example.com")]]);
        assert_eq!(
            applied.state.id(),
            "new.example.com:HOST,old.example.com:HOST"
        );
        assert_eq!(
            applied.state.domains[0].domain_status,
            Some(ValidationStatus::RequestAccepted)
        );
        assert!(applied.state.domains[0].validation_challenge.is_some());
    }

    #[tokio::test]
    async fn test_partial_add_failure_rolls_back() {
        let fake = Arc::new(FakeDomainOwnership::default());
        fake.reject_add(host("bad.example.com"), "Invalid domain");
        let res = DomainsResource::new(fake.clone());

        let err = res
            .create(
                &OperationContext::background(),
                &config(&[host("a.example.com"), host("bad.example.com")]),
            )
            .await
            .unwrap_err();

        assert_eq!(fake.deleted(), vec![vec![host("a.example.com")]]);
        assert_eq!(
            err.message,
            "adding domains failed: bad.example.com:HOST: Invalid domain; rolled back a.example.com:HOST"
        );
        assert!(!fake.contains(&host("a.example.com")));
    }

    #[tokio::test]
    async fn test_covered_domain_fails_before_any_change() {
        let fake = Arc::new(FakeDomainOwnership::default());
        fake.seed_covering(host("www.example.com"));
        let err = DomainsResource::new(fake.clone())
            .create(
                &OperationContext::background(),
                &config(&[host("www.example.com")]),
            )
            .await
            .unwrap_err();
        assert!(
            err.message
                .contains("is already part of other validated domain/wildcard")
        );
        assert!(fake.added().is_empty());
    }

    #[tokio::test]
    async fn test_update_invalidates_then_deletes_removed_domains() {
        let fake = Arc::new(FakeDomainOwnership::default());
        fake.seed_validated(host("a.example.com"));
        fake.seed_validated(host("b.example.com"));
        let res = DomainsResource::new(fake.clone());
        let ctx = OperationContext::background();
        let prior = res
            .import(&ctx, "a.example.com,b.example.com")
            .await
            .unwrap();

        let desired = config(&[host("a.example.com")]);
        let diagnostics = res.plan(&ctx, Some(&prior), &desired).await.unwrap();
        let warning = diagnostics.warnings().next().unwrap();
        assert_eq!(
            warning.detail.as_deref(),
            Some("removing these domains invalidates their ownership validation: b.example.com:HOST")
        );

        let applied = res.update(&ctx, &prior, &desired).await.unwrap();
        assert_eq!(fake.invalidated(), vec![vec![host("b.example.com")]]);
        assert_eq!(fake.deleted(), vec![vec![host("b.example.com")]]);
        assert!(fake.added().is_empty());
        assert_eq!(applied.state.id(), "a.example.com:HOST");
    }

    #[tokio::test]
    async fn test_update_re_adds_domain_deleted_on_server() {
        let fake = Arc::new(FakeDomainOwnership::default());
        fake.seed_validated(host("a.example.com"));
        let res = DomainsResource::new(fake.clone());
        let ctx = OperationContext::background();
        let prior = res.import(&ctx, "a.example.com:HOST").await.unwrap();

        fake.remove(&host("a.example.com"));
        let applied = res
            .update(&ctx, &prior, &config(&[host("a.example.com")]))
            .await
            .unwrap();

        assert_eq!(fake.added(), vec![vec![host("a.example.com")]]);
        assert!(fake.deleted().is_empty());
        assert_eq!(applied.state.id(), "a.example.com:HOST");
        assert_eq!(
            applied.state.domains[0].domain_status,
            Some(ValidationStatus::RequestAccepted)
        );
    }

    #[tokio::test]
    async fn test_plan_without_removals_has_no_warning() {
        let fake = Arc::new(FakeDomainOwnership::default());
        let diagnostics = DomainsResource::new(fake)
            .plan(
                &OperationContext::background(),
                None,
                &config(&[host("a.example.com")]),
            )
            .await
            .unwrap();
        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_read_drops_deleted_domains() {
        let fake = Arc::new(FakeDomainOwnership::default());
        fake.seed_validated(host("a.example.com"));
        fake.seed_validated(host("b.example.com"));
        let res = DomainsResource::new(fake.clone());
        let ctx = OperationContext::background();
        let state = res
            .import(&ctx, "a.example.com:HOST,b.example.com:HOST")
            .await
            .unwrap();

        fake.remove(&host("b.example.com"));
        let refreshed = res.read(&ctx, &state).await.unwrap().unwrap();
        assert_eq!(refreshed.id(), "a.example.com:HOST");

        fake.remove(&host("a.example.com"));
        assert_eq!(res.read(&ctx, &refreshed).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_skips_domains_already_gone() {
        let fake = Arc::new(FakeDomainOwnership::default());
        fake.seed_validated(host("a.example.com"));
        let res = DomainsResource::new(fake.clone());
        let ctx = OperationContext::background();
        let mut state = res.import(&ctx, "a.example.com").await.unwrap();
        state.domains.push(Domain {
            domain_name: "gone.example.com".to_string(),
            ..state.domains[0].clone()
        });

        res.delete(&ctx, &state).await.unwrap();
        assert_eq!(fake.invalidated(), vec![vec![host("a.example.com")]]);
        assert_eq!(fake.deleted(), vec![vec![host("a.example.com")]]);
    }

    #[tokio::test]
    async fn test_import_of_unknown_domain_is_not_found() {
        let fake = Arc::new(FakeDomainOwnership::default());
        let err = DomainsResource::new(fake)
            .import(&OperationContext::background(), "nope.example.com")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_config_rejects_duplicates_after_normalising() {
        let shouting = DomainKey {
            domain_name: "A.EXAMPLE.COM".to_string(),
            validation_scope: ValidationScope::Host,
        };
        let err = config(&[host("a.example.com"), shouting])
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            vec![ValidationError::invalid(
                "domains",
                "a.example.com:HOST",
                "listed more than once"
            )]
        );
    }
}
