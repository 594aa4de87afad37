//! akamai_property_domainownership_search_domains data source

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use akamai_tf_core::provider::DataSource;
use akamai_tf_core::validation::{ValidationError, into_provider_error};
use akamai_tf_core::{OperationContext, ProviderError, ProviderResult};

use crate::api::DomainOwnershipApi;
use crate::models::{Domain, DomainQuery};
use crate::search::search_all;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDomainsQuery {
    pub domains: Vec<DomainQuery>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDomainsOutput {
    pub domains: Vec<Domain>,
}

pub struct SearchDomainsDataSource {
    api: Arc<dyn DomainOwnershipApi>,
}

impl SearchDomainsDataSource {
    pub fn new(api: Arc<dyn DomainOwnershipApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for SearchDomainsDataSource {
    type Query = SearchDomainsQuery;
    type Output = SearchDomainsOutput;

    fn type_name(&self) -> &'static str {
        "akamai_property_domainownership_search_domains"
    }

    async fn read(
        &self,
        ctx: &OperationContext,
        query: &SearchDomainsQuery,
    ) -> ProviderResult<SearchDomainsOutput> {
        if query.domains.is_empty() {
            return Err(into_provider_error(vec![ValidationError::missing("domains")]));
        }
        let queries: Vec<DomainQuery> = query
            .domains
            .iter()
            .map(|q| DomainQuery {
                domain_name: q.domain_name.trim().to_ascii_lowercase(),
                validation_scope: q.validation_scope,
            })
            .collect();
        let domains = ctx
            .run(search_all(self.api.as_ref(), &queries))
            .await
            .map_err(|i| ProviderError::interrupted("domain search", i))??;
        Ok(SearchDomainsOutput { domains })
    }
}
