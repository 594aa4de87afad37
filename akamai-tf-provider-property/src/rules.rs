//! Rule trees and their semantic equality
//!
//! Two trees are equal when every field that PAPI treats as meaningful
//! matches. A `null` list and an empty list are the same thing, and option
//! maps compare by key regardless of order.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use akamai_tf_core::provider::DataSource;
use akamai_tf_core::resource::{Value, null_as_default};
use akamai_tf_core::{OperationContext, ProviderResult};

use crate::api::PapiApi;
use crate::models::PropertyRef;

/// Rule tree of a property version as returned by PAPI
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTree {
    pub rules: Rule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub criteria_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_must_satisfy: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub behaviors: Vec<RuleBehavior>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub criteria: Vec<RuleBehavior>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<Rule>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: Vec<RuleVariable>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: RuleOptions,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uuid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub advanced_override: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_override: Option<CustomOverride>,
}

/// A behavior or a criterion; both have the same shape
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleBehavior {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub locked: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleVariable {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub sensitive: bool,
}

/// Rule-level options; PAPI spells these in snake case
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleOptions {
    #[serde(default)]
    pub is_secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomOverride {
    pub name: String,
    pub override_id: String,
}

/// Whether two rules (and their subtrees) are the same
pub fn rules_equal(old: &Rule, new: &Rule) -> bool {
    old.advanced_override == new.advanced_override
        && old.comments == new.comments
        && old.name == new.name
        && old.criteria_locked == new.criteria_locked
        && old.options.is_secure == new.options.is_secure
        && old.uuid == new.uuid
        && old.custom_override == new.custom_override
        && behaviors_equal(&old.behaviors, &new.behaviors)
        && behaviors_equal(&old.criteria, &new.criteria)
        && old.variables == new.variables
        && old.children.len() == new.children.len()
        && old
            .children
            .iter()
            .zip(&new.children)
            .all(|(a, b)| rules_equal(a, b))
}

fn behaviors_equal(old: &[RuleBehavior], new: &[RuleBehavior]) -> bool {
    old.len() == new.len()
        && old.iter().zip(new).all(|(a, b)| {
            a.name == b.name && a.locked == b.locked && a.options == b.options && a.uuid == b.uuid
        })
}

/// Parse either a full `{"rules": ...}` document or a bare rule
pub fn parse_rule(json: &str) -> Option<Rule> {
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    let rule = match value.get("rules") {
        Some(rules) => rules.clone(),
        None => value,
    };
    serde_json::from_value(rule).ok()
}

/// Compare two JSON rule trees; unparsable input is never equivalent
pub fn rule_trees_json_equivalent(old: &str, new: &str) -> bool {
    match (parse_rule(old), parse_rule(new)) {
        (Some(a), Some(b)) => rules_equal(&a, &b),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRulesQuery {
    pub property_id: String,
    #[serde(default)]
    pub contract_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    pub version: u32,
}

/// Rule tree of one property version
pub struct PropertyRulesDataSource {
    api: Arc<dyn PapiApi>,
}

impl PropertyRulesDataSource {
    pub fn new(api: Arc<dyn PapiApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for PropertyRulesDataSource {
    type Query = PropertyRulesQuery;
    type Output = RuleTree;

    fn type_name(&self) -> &'static str {
        "akamai_property_rules"
    }

    async fn read(
        &self,
        _ctx: &OperationContext,
        query: &PropertyRulesQuery,
    ) -> ProviderResult<RuleTree> {
        let property = PropertyRef::new(query.property_id.as_str())
            .with_contract(query.contract_id.clone(), query.group_id.clone());
        self.api.get_rule_tree(&property, query.version).await
    }
}
