use super::selection::{ResourceSelection, SelectionSignature};
use crate::config::DEFAULT_NAMESPACE;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Resource type identifier, normalized to trimmed lower case on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
#[serde(transparent)]
pub struct ResourceTypeName(String);

impl ResourceTypeName {
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First letter upper-cased, the rest lower-cased ("pods" -> "Pods")
    #[must_use]
    pub fn display_name(&self) -> String {
        canonical_display_name(&self.0)
    }
}

pub(crate) fn canonical_display_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut chars = lowered.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl From<&str> for ResourceTypeName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ResourceTypeName {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<&String> for ResourceTypeName {
    fn from(raw: &String) -> Self {
        Self::new(raw)
    }
}

impl AsRef<str> for ResourceTypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One cell of the grid
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceTypeName,
    pub name: String,
    pub namespace: String,
}

impl ResourceSummary {
    #[must_use]
    pub fn new(resource_type: ResourceTypeName, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: summary_id(&resource_type, &name),
            resource_type,
            name,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// `type/name`, unique within a type and stable across re-fetches
#[must_use]
pub fn summary_id(resource_type: &ResourceTypeName, name: &str) -> String {
    format!("{resource_type}/{name}")
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetailMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, Value>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl DetailMetadata {
    fn is_empty(&self) -> bool {
        self.labels.is_none() && self.rest.is_empty()
    }
}

/// Full object document; only `apiVersion`, `kind` and `metadata.labels` are inspected.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "DetailMetadata::is_empty"
    )]
    pub metadata: DetailMetadata,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ResourceDetail {
    /// Parses a detail body, which must be a JSON object.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` for non-object bodies and `Json` when known fields have the wrong shape
    pub fn from_value(what: &str, body: Value) -> Result<Self> {
        if !body.is_object() {
            return Err(Error::malformed(format!(
                "{what}: expected a JSON object, got {}",
                json_kind(&body)
            )));
        }
        Ok(serde_json::from_value(body)?)
    }

    /// Labels rendered as display strings, sorted by key
    #[must_use]
    pub fn labels(&self) -> Vec<(String, String)> {
        self.metadata
            .labels
            .iter()
            .flatten()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect()
    }

    /// # Errors
    ///
    /// Will return `Err` if the document cannot be serialized
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `"metadata": null` reads the same as an absent block.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailCacheEntry {
    pub id: String,
    pub detail: Arc<ResourceDetail>,
    pub fetched_at: DateTime<Utc>,
}

impl DetailCacheEntry {
    #[must_use]
    pub fn new(id: String, detail: ResourceDetail) -> Self {
        Self {
            id,
            detail: Arc::new(detail),
            fetched_at: Utc::now(),
        }
    }
}

/// Per-type outcome of one batch of listing requests
#[derive(Debug, Clone, Default)]
pub struct ListingBatch {
    pub listings: HashMap<ResourceTypeName, Vec<ResourceSummary>>,
    pub failed: Vec<ResourceTypeName>,
}

impl ListingBatch {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Flattened grid contents for one selection value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    signature: SelectionSignature,
    items: Vec<ResourceSummary>,
    failed: Vec<ResourceTypeName>,
}

impl AggregateResult {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Concatenates each selected type's listing in the selection's insertion order.
    #[must_use]
    pub fn assemble(selection: &ResourceSelection, batch: &ListingBatch) -> Self {
        let items = selection
            .iter()
            .filter_map(|resource_type| batch.listings.get(resource_type))
            .flatten()
            .cloned()
            .collect();
        let failed = selection
            .iter()
            .filter(|resource_type| batch.failed.contains(resource_type))
            .cloned()
            .collect();

        Self {
            signature: selection.signature(),
            items,
            failed,
        }
    }

    /// Drops every summary whose type is no longer selected; the rest is
    /// re-ordered to follow the selection's insertion order.
    #[must_use]
    pub fn retain_selected(&self, selection: &ResourceSelection) -> Self {
        Self {
            signature: selection.signature(),
            items: selection
                .iter()
                .flat_map(|resource_type| {
                    self.items
                        .iter()
                        .filter(move |summary| summary.resource_type == *resource_type)
                })
                .cloned()
                .collect(),
            failed: selection
                .iter()
                .filter(|resource_type| self.failed.contains(resource_type))
                .cloned()
                .collect(),
        }
    }

    #[must_use]
    pub const fn signature(&self) -> &SelectionSignature {
        &self.signature
    }

    #[must_use]
    pub fn items(&self) -> &[ResourceSummary] {
        &self.items
    }

    /// Types whose listing failed in the run that produced this result
    #[must_use]
    pub fn failed_types(&self) -> &[ResourceTypeName] {
        &self.failed
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ResourceSummary> {
        self.items.iter().find(|summary| summary.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceSummary> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a AggregateResult {
    type Item = &'a ResourceSummary;
    type IntoIter = std::slice::Iter<'a, ResourceSummary>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
