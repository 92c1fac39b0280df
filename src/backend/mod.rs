pub mod client;
pub mod cluster;
pub mod fixture;

use crate::error::{Error, Result};
use crate::inventory::data::{ResourceDetail, ResourceTypeName, json_kind};
use async_trait::async_trait;
use serde_json::Value;

pub use client::HttpCatalog;
pub use cluster::ClusterCatalog;
pub use fixture::{Fixture, FixtureCatalog, RequestCounts};

/// Default user agent - automatically uses the package version
///
/// Can be overridden via the `KUBEVIEW_USER_AGENT` environment variable.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Read-only source of the cluster inventory.
///
/// Every method is a single request; implementations never retry.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// All known resource type names
    async fn resource_types(&self) -> Result<Vec<String>>;

    /// Object names of one type, in backend order
    async fn list_names(&self, resource_type: &ResourceTypeName) -> Result<Vec<String>>;

    /// Full document for one object
    async fn details(&self, resource_type: &ResourceTypeName, name: &str) -> Result<ResourceDetail>;

    /// Short label for logs
    fn describe(&self) -> String;
}

/// Accepts only a JSON array of strings; anything else is a malformed body.
pub(crate) fn parse_names(what: &str, body: Value) -> Result<Vec<String>> {
    let Value::Array(items) = body else {
        return Err(Error::malformed(format!(
            "{what}: expected a JSON array, got {}",
            json_kind(&body)
        )));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(name) => Ok(name),
            other => Err(Error::malformed(format!(
                "{what}: expected string entries, got {}",
                json_kind(&other)
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_names_accepts_string_array() {
        let names = parse_names("/list/pods", json!(["nginx", "redis"])).unwrap();
        assert_eq!(names, vec!["nginx", "redis"]);
    }

    #[test]
    fn test_parse_names_rejects_object_body() {
        let err = parse_names("/list/pods", json!({"items": []})).unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn test_parse_names_rejects_mixed_entries() {
        assert!(parse_names("/list/pods", json!(["nginx", 3])).is_err());
    }
}
