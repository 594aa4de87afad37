//! akamai_property_domainownership_validation resource
//!
//! Asks the server to check the published challenges right away and waits
//! until every configured domain is validated.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use akamai_tf_core::poll::{Phase, PollOptions, poll_until};
use akamai_tf_core::provider::{Applied, Identified, ResourceHandler};
use akamai_tf_core::resource::Timeouts;
use akamai_tf_core::validation::{Validate, ValidationError};
use akamai_tf_core::{Diagnostics, OperationContext, ProviderError, ProviderResult};

use crate::api::{DomainOwnershipApi, check_batch};
use crate::domains::{domains_id, queries, render_keys, validate_keys};
use crate::import_id::{parse_import_id, resolve_import};
use crate::models::{Domain, DomainKey, ValidationMethod, ValidationScope};
use crate::reconcile::server_map;
use crate::search::search_all;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_NOT_FOUND_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub fn default_poll_options() -> PollOptions {
    PollOptions::new(DEFAULT_POLL_INTERVAL, DEFAULT_NOT_FOUND_INTERVAL)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationTarget {
    pub domain_name: String,
    pub validation_scope: ValidationScope,
    /// Falls back to the method the domain was requested with
    #[serde(default)]
    pub validation_method: Option<ValidationMethod>,
}

impl ValidationTarget {
    pub fn key(&self) -> DomainKey {
        DomainKey::new(&self.domain_name, self.validation_scope)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainValidationConfig {
    pub domains: Vec<ValidationTarget>,
    #[serde(default = "default_true")]
    pub invalidate_on_destroy: bool,
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl DomainValidationConfig {
    pub fn keys(&self) -> Vec<DomainKey> {
        let mut keys: Vec<DomainKey> = self.domains.iter().map(ValidationTarget::key).collect();
        keys.sort();
        keys
    }

    fn method_for(&self, key: &DomainKey) -> Option<ValidationMethod> {
        self.domains
            .iter()
            .find(|t| t.key() == *key)
            .and_then(|t| t.validation_method)
    }
}

impl Validate for DomainValidationConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        validate_keys(&self.keys(), &mut errors);
        self.timeouts.validate(&mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainValidationState {
    pub domains: Vec<Domain>,
    pub invalidate_on_destroy: bool,
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl DomainValidationState {
    pub fn keys(&self) -> Vec<DomainKey> {
        let mut keys: Vec<DomainKey> = self.domains.iter().map(Domain::key).collect();
        keys.sort();
        keys
    }
}

impl Identified for DomainValidationState {
    fn id(&self) -> String {
        domains_id(&self.keys())
    }
}

/// Poll outcome over the whole set: any lapse fails, all validated is done
fn validation_phase(keys: &[DomainKey], server: &BTreeMap<DomainKey, Domain>) -> Phase {
    let mut done = true;
    for key in keys {
        let Some(domain) = server.get(key) else {
            return Phase::Pending;
        };
        match &domain.domain_status {
            Some(status) if status.is_lapsed() => {
                return Phase::Failed(format!("domain {} has status {}", key, status));
            }
            _ if domain.is_validated() => {}
            _ => done = false,
        }
    }
    if done { Phase::Done } else { Phase::Pending }
}

pub struct DomainValidationResource {
    api: Arc<dyn DomainOwnershipApi>,
    poll: PollOptions,
    default_timeout: Duration,
}

impl DomainValidationResource {
    pub fn new(api: Arc<dyn DomainOwnershipApi>) -> Self {
        Self {
            api,
            poll: default_poll_options(),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// FQDN-level entries only; a covering domain says nothing about ours
    async fn search(&self, keys: &[DomainKey]) -> ProviderResult<BTreeMap<DomainKey, Domain>> {
        let found = search_all(self.api.as_ref(), &queries(keys)).await?;
        Ok(server_map(found.into_iter().filter(Domain::is_fqdn)))
    }

    /// `None` until every key is visible on the server
    async fn snapshot(
        &self,
        keys: &[DomainKey],
    ) -> ProviderResult<Option<BTreeMap<DomainKey, Domain>>> {
        let server = self.search(keys).await?;
        let visible = keys.iter().all(|k| server.contains_key(k));
        Ok(visible.then_some(server))
    }

    async fn validate_all(
        &self,
        ctx: &OperationContext,
        config: &DomainValidationConfig,
        timeout: Duration,
    ) -> ProviderResult<Applied<DomainValidationState>> {
        config.ensure_valid()?;
        let ctx = ctx.with_timeout(timeout);
        let keys = config.keys();
        let server = ctx
            .run(self.search(&keys))
            .await
            .map_err(|i| ProviderError::interrupted("domain search", i))??;

        let mut submit = Vec::new();
        for key in &keys {
            let domain = server.get(key).ok_or_else(|| {
                ProviderError::not_found(format!(
                    "domain {} has to be added before it can be validated",
                    key
                ))
            })?;
            if domain.is_validated() {
                continue;
            }
            if let Some(status) = domain.domain_status.as_ref().filter(|s| s.is_lapsed()) {
                return Err(ProviderError::validation(format!(
                    "domain {} has status {} and has to be added again",
                    key, status
                )));
            }
            let method = config
                .method_for(key)
                .or(domain.validation_method)
                .ok_or_else(|| {
                    ProviderError::validation(format!(
                        "no validation_method set for domain {}",
                        key
                    ))
                })?;
            submit.push((key.clone(), method));
        }

        let server = if submit.is_empty() {
            server
        } else {
            info!("requesting validation of {} domains", submit.len());
            let requested = self.api.validate_domains(&submit);
            let result = ctx
                .run(requested)
                .await
                .map_err(|i| ProviderError::interrupted("validation request", i))??;
            check_batch("validating domains", result)?;

            let operation = format!("validation of {}", render_keys(&keys));
            let pending = keys.as_slice();
            poll_until(
                &ctx,
                self.poll,
                &operation,
                || self.snapshot(pending),
                |server| validation_phase(pending, server),
            )
            .await?
        };

        let domains = keys.iter().filter_map(|k| server.get(k)).cloned().collect();
        Ok(Applied::new(DomainValidationState {
            domains,
            invalidate_on_destroy: config.invalidate_on_destroy,
            timeouts: config.timeouts,
        }))
    }
}

#[async_trait]
impl ResourceHandler for DomainValidationResource {
    type Config = DomainValidationConfig;
    type State = DomainValidationState;

    fn type_name(&self) -> &'static str {
        "akamai_property_domainownership_validation"
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        config: &DomainValidationConfig,
    ) -> ProviderResult<Applied<DomainValidationState>> {
        let timeout = config.timeouts.create_or(self.default_timeout);
        self.validate_all(ctx, config, timeout).await
    }

    async fn read(
        &self,
        _ctx: &OperationContext,
        state: &DomainValidationState,
    ) -> ProviderResult<Option<DomainValidationState>> {
        let keys = state.keys();
        let server = self.search(&keys).await?;
        let domains: Vec<Domain> = keys.iter().filter_map(|k| server.get(k)).cloned().collect();
        if domains.is_empty() {
            return Ok(None);
        }
        Ok(Some(DomainValidationState {
            domains,
            ..state.clone()
        }))
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        _prior: &DomainValidationState,
        config: &DomainValidationConfig,
    ) -> ProviderResult<Applied<DomainValidationState>> {
        let timeout = config.timeouts.update_or(self.default_timeout);
        self.validate_all(ctx, config, timeout).await
    }

    async fn delete(
        &self,
        ctx: &OperationContext,
        state: &DomainValidationState,
    ) -> ProviderResult<Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        if !state.invalidate_on_destroy {
            diagnostics.warning(
                "Domains stay validated",
                Some(format!(
                    "invalidate_on_destroy is false; {} keep their validation",
                    render_keys(&state.keys())
                )),
            );
            return Ok(diagnostics);
        }

        let ctx = ctx.with_timeout(state.timeouts.delete_or(self.default_timeout));
        let keys = state.keys();
        let server = ctx
            .run(self.search(&keys))
            .await
            .map_err(|i| ProviderError::interrupted("domain search", i))??;
        let validated: Vec<DomainKey> = keys
            .into_iter()
            .filter(|k| server.get(k).is_some_and(Domain::is_validated))
            .collect();
        if !validated.is_empty() {
            info!("invalidating {}", render_keys(&validated));
            let result = ctx
                .run(self.api.invalidate_domains(&validated))
                .await
                .map_err(|i| ProviderError::interrupted("invalidation", i))??;
            check_batch("invalidating domains", result)?;
        }
        Ok(diagnostics)
    }

    async fn import(
        &self,
        _ctx: &OperationContext,
        id: &str,
    ) -> ProviderResult<DomainValidationState> {
        let queries = parse_import_id(id)?;
        let found = search_all(self.api.as_ref(), &queries).await?;
        let keys = resolve_import(&queries, &found)?;
        let server = server_map(found.into_iter().filter(Domain::is_fqdn));
        Ok(DomainValidationState {
            domains: keys.iter().filter_map(|k| server.get(k)).cloned().collect(),
            invalidate_on_destroy: true,
            timeouts: Timeouts::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationStatus;
    use crate::testing::FakeDomainOwnership;
    use akamai_tf_core::ErrorKind;

    fn host(name: &str) -> DomainKey {
        DomainKey::new(name, ValidationScope::Host)
    }

    fn target(name: &str, method: Option<ValidationMethod>) -> ValidationTarget {
        ValidationTarget {
            domain_name: name.to_string(),
            validation_scope: ValidationScope::Host,
            validation_method: method,
        }
    }

    fn config(targets: Vec<ValidationTarget>) -> DomainValidationConfig {
        DomainValidationConfig {
            domains: targets,
            invalidate_on_destroy: true,
            timeouts: Timeouts::default(),
        }
    }

    fn resource(fake: &Arc<FakeDomainOwnership>) -> DomainValidationResource {
        DomainValidationResource::new(fake.clone())
            .with_poll_options(PollOptions::new(
                Duration::from_secs(1),
                Duration::from_millis(100),
            ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_validates_and_waits_until_done() {
        let fake = Arc::new(FakeDomainOwnership::default());
        fake.seed_pending(host("a.example.com"), ValidationMethod::DnsTxt);
        fake.seed_validated(host("b.example.com"));
        fake.script_statuses(
            host("a.example.com"),
            vec![
                ValidationStatus::ValidationInProgress,
                ValidationStatus::ValidationInProgress,
                ValidationStatus::Validated,
            ],
        );

        let applied = resource(&fake)
            .create(
                &OperationContext::background(),
                &config(vec![
                    target("a.example.com", Some(ValidationMethod::DnsCname)),
                    target("b.example.com", None),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(
            fake.validated(),
            vec![vec![(host("a.example.com"), ValidationMethod::DnsCname)]]
        );
        assert!(applied.state.domains.iter().all(Domain::is_validated));
        assert_eq!(applied.state.id(), "a.example.com:HOST,b.example.com:HOST");
    }

    #[tokio::test(start_paused = true)]
    async fn test_method_falls_back_to_server_value() {
        let fake = Arc::new(FakeDomainOwnership::default());
        fake.seed_pending(host("a.example.com"), ValidationMethod::Http);
        fake.script_statuses(host("a.example.com"), vec![ValidationStatus::Validated]);
        resource(&fake)
            .create(
                &OperationContext::background(),
                &config(vec![target("a.example.com", None)]),
            )
            .await
            .unwrap();
        assert_eq!(
            fake.validated(),
            vec![vec![(host("a.example.com"), ValidationMethod::Http)]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_token_during_polling_is_fatal() {
        let fake = Arc::new(FakeDomainOwnership::default());
        fake.seed_pending(host("a.example.com"), ValidationMethod::DnsTxt);
        fake.script_statuses(
            host("a.example.com"),
            vec![
                ValidationStatus::ValidationInProgress,
                ValidationStatus::TokenExpired,
            ],
        );
        let err = resource(&fake)
            .create(
                &OperationContext::background(),
                &config(vec![target("a.example.com", None)]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RemoteFailure);
        assert!(err.message.contains("domain a.example.com:HOST has status TOKEN_EXPIRED"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_with_resume_guidance() {
        let fake = Arc::new(FakeDomainOwnership::default());
        fake.seed_pending(host("a.example.com"), ValidationMethod::DnsTxt);
        let mut config = config(vec![target("a.example.com", None)]);
        config.timeouts.create = Some(1);
        let err = resource(&fake)
            .create(&OperationContext::background(), &config)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.message.contains("re-run apply"));
    }

    #[tokio::test]
    async fn test_oversized_timeout_is_rejected_before_search() {
        let fake = Arc::new(FakeDomainOwnership::default());
        let mut config = config(vec![target("a.example.com", None)]);
        config.timeouts.update = Some(u64::MAX);
        let prior = DomainValidationState {
            domains: Vec::new(),
            invalidate_on_destroy: true,
            timeouts: Timeouts::default(),
        };
        let err = resource(&fake)
            .update(&OperationContext::background(), &prior, &config)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("timeouts.update"));
        assert!(fake.search_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_domain_must_be_added_first() {
        let fake = Arc::new(FakeDomainOwnership::default());
        let err = resource(&fake)
            .create(
                &OperationContext::background(),
                &config(vec![target("a.example.com", None)]),
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(fake.validated().is_empty());
    }

    #[tokio::test]
    async fn test_delete_invalidates_only_when_asked() {
        let fake = Arc::new(FakeDomainOwnership::default());
        fake.seed_validated(host("a.example.com"));
        let res = resource(&fake);
        let ctx = OperationContext::background();
        let mut state = res.import(&ctx, "a.example.com").await.unwrap();
        assert!(state.invalidate_on_destroy);

        state.invalidate_on_destroy = false;
        let diagnostics = res.delete(&ctx, &state).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(fake.invalidated().is_empty());

        state.invalidate_on_destroy = true;
        res.delete(&ctx, &state).await.unwrap();
        assert_eq!(fake.invalidated(), vec![vec![host("a.example.com")]]);
    }

    #[test]
    fn test_phase_of_mixed_set() {
        let keys = vec![host("a.com"), host("b.com")];
        let mut server = BTreeMap::new();
        for key in &keys {
            server.insert(
                key.clone(),
                crate::reconcile::tests::domain(
                    &key.domain_name,
                    crate::models::ValidationLevel::Fqdn,
                    ValidationStatus::Validated,
                ),
            );
        }
        assert_eq!(validation_phase(&keys, &server), Phase::Done);
        if let Some(d) = server.get_mut(&keys[1]) {
            d.domain_status = Some(ValidationStatus::ValidationInProgress);
        }
        assert_eq!(validation_phase(&keys, &server), Phase::Pending);
        if let Some(d) = server.get_mut(&keys[0]) {
            d.domain_status = Some(ValidationStatus::Invalidated);
        }
        assert_eq!(
            validation_phase(&keys, &server),
            Phase::Failed("domain a.com:HOST has status INVALIDATED".to_string())
        );
    }
}
