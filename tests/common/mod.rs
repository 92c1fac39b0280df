#![allow(dead_code)]

use async_trait::async_trait;
use kubeview::backend::CatalogSource;
use kubeview::error::{Error, Result};
use kubeview::inventory::ResourceDetail;
use kubeview::inventory::ResourceTypeName;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
enum Listing {
    Names(Vec<String>),
    Fail(String),
}

#[derive(Default)]
struct Counter {
    calls: Mutex<HashMap<String, usize>>,
    completed: Mutex<HashMap<String, usize>>,
}

impl Counter {
    fn bump(map: &Mutex<HashMap<String, usize>>, key: &str) {
        let mut map = map.lock().unwrap();
        *map.entry(key.to_string()).or_default() += 1;
    }

    fn get(map: &Mutex<HashMap<String, usize>>, key: &str) -> usize {
        map.lock().unwrap().get(key).copied().unwrap_or_default()
    }
}

/// Catalog source with per-key failures and gates.
///
/// A gated request blocks until the test calls `release(key)`; listings are
/// keyed by type, details by `type/name`.
#[derive(Default)]
pub struct ScriptedCatalog {
    types: Option<Vec<String>>,
    listings: HashMap<String, Listing>,
    details: HashMap<String, Value>,
    gates: HashMap<String, Arc<Notify>>,
    catalog_calls: AtomicUsize,
    counter: Counter,
}

impl ScriptedCatalog {
    pub fn new(types: &[&str]) -> Self {
        Self {
            types: Some(types.iter().map(ToString::to_string).collect()),
            ..Self::default()
        }
    }

    /// Catalog request fails
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn listing(mut self, resource_type: &str, names: &[&str]) -> Self {
        self.listings.insert(
            resource_type.to_string(),
            Listing::Names(names.iter().map(ToString::to_string).collect()),
        );
        self
    }

    pub fn failing(mut self, resource_type: &str, error: &str) -> Self {
        self.listings
            .insert(resource_type.to_string(), Listing::Fail(error.to_string()));
        self
    }

    pub fn detail(mut self, id: &str, body: Value) -> Self {
        self.details.insert(id.to_string(), body);
        self
    }

    pub fn gated(mut self, key: &str) -> Self {
        self.gates.insert(key.to_string(), Arc::new(Notify::new()));
        self
    }

    pub fn release(&self, key: &str) {
        if let Some(gate) = self.gates.get(key) {
            gate.notify_one();
        }
    }

    pub fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    /// Requests started for `key`
    pub fn calls(&self, key: &str) -> usize {
        Counter::get(&self.counter.calls, key)
    }

    /// Requests for `key` that ran to completion (not dropped mid-flight)
    pub fn completed(&self, key: &str) -> usize {
        Counter::get(&self.counter.completed, key)
    }

    /// Waits until `key` has seen at least `n` requests
    pub async fn wait_for_calls(&self, key: &str, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls(key) < n {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {n} calls to {key}"));
    }

    async fn pass(&self, key: &str) {
        Counter::bump(&self.counter.calls, key);
        if let Some(gate) = self.gates.get(key) {
            gate.notified().await;
        }
        Counter::bump(&self.counter.completed, key);
    }
}

#[async_trait]
impl CatalogSource for ScriptedCatalog {
    async fn resource_types(&self) -> Result<Vec<String>> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.types
            .clone()
            .ok_or_else(|| Error::Custom("connection refused".to_string()))
    }

    async fn list_names(&self, resource_type: &ResourceTypeName) -> Result<Vec<String>> {
        self.pass(resource_type.as_str()).await;
        match self.listings.get(resource_type.as_str()) {
            Some(Listing::Names(names)) => Ok(names.clone()),
            Some(Listing::Fail(error)) => Err(Error::Custom(error.clone())),
            None => Err(Error::Status {
                url: format!("/list/{resource_type}"),
                code: 404,
            }),
        }
    }

    async fn details(&self, resource_type: &ResourceTypeName, name: &str) -> Result<ResourceDetail> {
        let id = format!("{resource_type}/{name}");
        self.pass(&id).await;
        let body = self
            .details
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(id.clone()))?;
        ResourceDetail::from_value(&id, body)
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}
