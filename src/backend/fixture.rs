//! In-memory catalog source loaded from a JSON fixture.
//!
//! Used for offline browsing (`kubeview --fixture inventory.json`) and as the
//! backing store for tests. Listings are kept as raw JSON so that a malformed
//! body behaves exactly like one coming over the wire.

use super::{CatalogSource, parse_names};
use crate::error::{Error, Result};
use crate::inventory::data::{ResourceDetail, ResourceTypeName, summary_id};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// On-disk fixture layout
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub types: Vec<String>,
    /// `type -> listing body`
    #[serde(default)]
    pub listings: HashMap<String, Value>,
    /// `type/name -> detail body`
    #[serde(default)]
    pub details: HashMap<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    pub catalog: usize,
    pub listings: usize,
    pub details: usize,
}

#[derive(Debug, Default)]
pub struct FixtureCatalog {
    types: Vec<String>,
    listings: HashMap<ResourceTypeName, Value>,
    details: HashMap<String, Value>,
    catalog_requests: AtomicUsize,
    listing_requests: AtomicUsize,
    detail_requests: AtomicUsize,
}

impl FixtureCatalog {
    #[must_use]
    pub fn new<S: AsRef<str>>(types: &[S]) -> Self {
        Self {
            types: types.iter().map(|t| t.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_fixture(fixture: Fixture) -> Self {
        let mut catalog = Self::new(&fixture.types);
        for (resource_type, body) in fixture.listings {
            catalog = catalog.with_listing_body(&resource_type, body);
        }
        for (key, body) in fixture.details {
            let (resource_type, name) = key.split_once('/').unwrap_or((key.as_str(), ""));
            catalog = catalog.with_details(resource_type, name, body);
        }
        catalog
    }

    /// # Errors
    ///
    /// Will return `Err` if the file cannot be read or is not a valid fixture
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&raw)?;
        info!(
            "📂 Loaded fixture {} ({} types, {} listings, {} details)",
            path.display(),
            fixture.types.len(),
            fixture.listings.len(),
            fixture.details.len()
        );
        Ok(Self::from_fixture(fixture))
    }

    #[must_use]
    pub fn with_listing<S: AsRef<str>>(self, resource_type: &str, names: &[S]) -> Self {
        let body = Value::Array(
            names
                .iter()
                .map(|name| Value::String(name.as_ref().to_string()))
                .collect(),
        );
        self.with_listing_body(resource_type, body)
    }

    /// Raw listing body; anything but an array of strings reads as malformed
    #[must_use]
    pub fn with_listing_body(mut self, resource_type: &str, body: Value) -> Self {
        self.listings.insert(ResourceTypeName::new(resource_type), body);
        self
    }

    #[must_use]
    pub fn with_details(mut self, resource_type: &str, name: &str, body: Value) -> Self {
        self.details
            .insert(summary_id(&ResourceTypeName::new(resource_type), name), body);
        self
    }

    #[must_use]
    pub fn requests(&self) -> RequestCounts {
        RequestCounts {
            catalog: self.catalog_requests.load(Ordering::SeqCst),
            listings: self.listing_requests.load(Ordering::SeqCst),
            details: self.detail_requests.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl CatalogSource for FixtureCatalog {
    async fn resource_types(&self) -> Result<Vec<String>> {
        self.catalog_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.types.clone())
    }

    async fn list_names(&self, resource_type: &ResourceTypeName) -> Result<Vec<String>> {
        self.listing_requests.fetch_add(1, Ordering::SeqCst);
        debug!("📂 fixture listing: {}", resource_type);
        let body = self
            .listings
            .get(resource_type)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("/list/{resource_type}")))?;
        parse_names(&format!("/list/{resource_type}"), body)
    }

    async fn details(&self, resource_type: &ResourceTypeName, name: &str) -> Result<ResourceDetail> {
        self.detail_requests.fetch_add(1, Ordering::SeqCst);
        let id = summary_id(resource_type, name);
        let body = self
            .details
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("/details/{id}")))?;
        ResourceDetail::from_value(&format!("/details/{id}"), body)
    }

    fn describe(&self) -> String {
        format!("fixture ({} types)", self.types.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_listing_and_counts() {
        let catalog = FixtureCatalog::new(&["pods"]).with_listing("Pods", &["nginx", "redis"]);
        let names = catalog.list_names(&"pods".into()).await.unwrap();
        assert_eq!(names, vec!["nginx", "redis"]);
        assert!(catalog.list_names(&"services".into()).await.is_err());
        assert_eq!(catalog.requests().listings, 2);
        assert_eq!(catalog.requests().catalog, 0);
    }

    #[tokio::test]
    async fn test_malformed_listing_body() {
        let catalog = FixtureCatalog::new(&["pods"]).with_listing_body("pods", json!({"oops": true}));
        let err = catalog.list_names(&"pods".into()).await.unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_from_fixture_json() {
        let fixture: Fixture = serde_json::from_value(json!({
            "types": ["pods", "services"],
            "listings": {"pods": ["nginx"]},
            "details": {"Pods/nginx": {"apiVersion": "v1", "kind": "Pod"}}
        }))
        .unwrap();
        let catalog = FixtureCatalog::from_fixture(fixture);

        assert_eq!(catalog.resource_types().await.unwrap(), vec!["pods", "services"]);
        let detail = catalog.details(&"pods".into(), "nginx").await.unwrap();
        assert_eq!(detail.kind.as_deref(), Some("Pod"));
        assert!(catalog.details(&"pods".into(), "redis").await.is_err());
        assert_eq!(
            catalog.requests(),
            RequestCounts {
                catalog: 1,
                listings: 0,
                details: 2
            }
        );
    }
}
