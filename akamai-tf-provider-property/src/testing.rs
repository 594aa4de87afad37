//! In-memory PAPI used by the unit tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use akamai_tf_core::ProviderResult;

use crate::api::PapiApi;
use crate::models::{
    ActivationStatus, Hostname, HostnameDiffItem, HostnameDiffPage, IncludeActivation, IncludeRef,
    PropertyActivation, PropertyRef,
};
use crate::request::ActivationRequest;
use crate::rules::RuleTree;

#[derive(Default)]
struct Inner {
    property_activations: Vec<PropertyActivation>,
    include_activations: Vec<IncludeActivation>,
    submitted: Vec<ActivationRequest>,
    /// Statuses handed out by successive fetches; the last one sticks
    script: VecDeque<ActivationStatus>,
    hostnames: Option<Vec<Hostname>>,
    hostname_puts: Vec<Vec<Hostname>>,
    diff: Vec<HostnameDiffItem>,
    diff_requests: Vec<(usize, usize)>,
    rules: RuleTree,
}

impl Inner {
    fn next_status(&mut self) -> Option<ActivationStatus> {
        if self.script.len() > 1 {
            self.script.pop_front()
        } else {
            self.script.front().cloned()
        }
    }

    fn next_timestamp(&self) -> String {
        let n = self.submitted.len();
        format!("2030-01-01T00:{:02}:{:02}Z", n / 60, n % 60)
    }
}

#[derive(Default)]
pub(crate) struct FakePapi {
    inner: Mutex<Inner>,
    calls: AtomicUsize,
}

impl FakePapi {
    fn state(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.lock().unwrap()
    }

    fn setup(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub(crate) fn seed(&self, activation: PropertyActivation) {
        self.setup().property_activations.push(activation);
    }

    pub(crate) fn script_statuses(&self, statuses: Vec<ActivationStatus>) {
        self.setup().script = statuses.into();
    }

    pub(crate) fn seed_hostnames(&self, hostnames: Vec<Hostname>) {
        self.setup().hostnames = Some(hostnames);
    }

    pub(crate) fn seed_diff(&self, items: Vec<HostnameDiffItem>) {
        self.setup().diff = items;
    }

    pub(crate) fn seed_rules(&self, rules: RuleTree) {
        self.setup().rules = rules;
    }

    pub(crate) fn submitted(&self) -> Vec<ActivationRequest> {
        self.setup().submitted.clone()
    }

    pub(crate) fn hostname_puts(&self) -> Vec<Vec<Hostname>> {
        self.setup().hostname_puts.clone()
    }

    pub(crate) fn diff_requests(&self) -> Vec<(usize, usize)> {
        self.setup().diff_requests.clone()
    }

    /// Number of API calls made so far
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PapiApi for FakePapi {
    async fn list_property_activations(
        &self,
        _property: &PropertyRef,
    ) -> ProviderResult<Vec<PropertyActivation>> {
        Ok(self.state().property_activations.clone())
    }

    async fn create_property_activation(
        &self,
        property: &PropertyRef,
        request: &ActivationRequest,
    ) -> ProviderResult<String> {
        let mut inner = self.state();
        let id = format!("atv_{}", 1000 + inner.submitted.len());
        let date = inner.next_timestamp();
        inner.property_activations.push(PropertyActivation {
            activation_id: id.clone(),
            property_id: property.property_id.clone(),
            property_name: "example.com".to_string(),
            property_version: request.version,
            network: request.network,
            activation_type: request.activation_type,
            status: ActivationStatus::New,
            submit_date: date.clone(),
            update_date: date,
            note: request.note.clone(),
            notify_emails: request.notify_emails.clone(),
        });
        inner.submitted.push(request.clone());
        Ok(id)
    }

    async fn get_property_activation(
        &self,
        _property: &PropertyRef,
        activation_id: &str,
    ) -> ProviderResult<Option<PropertyActivation>> {
        let mut inner = self.state();
        let status = inner.next_status();
        let Some(record) = inner
            .property_activations
            .iter_mut()
            .find(|a| a.activation_id == activation_id)
        else {
            return Ok(None);
        };
        if let Some(status) = status {
            record.status = status;
        }
        Ok(Some(record.clone()))
    }

    async fn list_include_activations(
        &self,
        _include: &IncludeRef,
    ) -> ProviderResult<Vec<IncludeActivation>> {
        Ok(self.state().include_activations.clone())
    }

    async fn create_include_activation(
        &self,
        include: &IncludeRef,
        request: &ActivationRequest,
    ) -> ProviderResult<String> {
        let mut inner = self.state();
        let id = format!("atv_{}", 2000 + inner.submitted.len());
        let date = inner.next_timestamp();
        inner.include_activations.push(IncludeActivation {
            activation_id: id.clone(),
            include_activation_id: None,
            include_id: include.include_id.clone(),
            include_name: "shared".to_string(),
            include_version: request.version,
            network: request.network,
            activation_type: request.activation_type,
            status: ActivationStatus::New,
            submit_date: date.clone(),
            update_date: date,
            note: request.note.clone(),
            notify_emails: request.notify_emails.clone(),
        });
        inner.submitted.push(request.clone());
        Ok(id)
    }

    async fn get_include_activation(
        &self,
        _include: &IncludeRef,
        activation_id: &str,
    ) -> ProviderResult<Option<IncludeActivation>> {
        let mut inner = self.state();
        let status = inner.next_status();
        let Some(record) = inner
            .include_activations
            .iter_mut()
            .find(|a| a.activation_id == activation_id)
        else {
            return Ok(None);
        };
        if let Some(status) = status {
            record.status = status;
        }
        Ok(Some(record.clone()))
    }

    async fn get_version_hostnames(
        &self,
        _property: &PropertyRef,
        _version: u32,
    ) -> ProviderResult<Option<Vec<Hostname>>> {
        Ok(self.state().hostnames.clone())
    }

    async fn put_version_hostnames(
        &self,
        _property: &PropertyRef,
        _version: u32,
        hostnames: &[Hostname],
    ) -> ProviderResult<Vec<Hostname>> {
        let mut inner = self.state();
        inner.hostnames = Some(hostnames.to_vec());
        inner.hostname_puts.push(hostnames.to_vec());
        Ok(hostnames.to_vec())
    }

    async fn hostnames_diff_page(
        &self,
        _property: &PropertyRef,
        offset: usize,
        limit: usize,
    ) -> ProviderResult<HostnameDiffPage> {
        let mut inner = self.state();
        inner.diff_requests.push((offset, limit));
        let items = inner.diff.iter().skip(offset).take(limit).cloned().collect();
        Ok(HostnameDiffPage {
            items,
            total_items: inner.diff.len(),
        })
    }

    async fn get_rule_tree(
        &self,
        _property: &PropertyRef,
        _version: u32,
    ) -> ProviderResult<RuleTree> {
        Ok(self.state().rules.clone())
    }
}
