//! Single coordinator for the viewer: owns the selection, the visible
//! aggregate, the filter text and the detail panel.
//!
//! Share it behind an `Arc` between the input loop and any background task;
//! every operation takes `&self`.

use crate::backend::CatalogSource;
use crate::config::ViewerConfig;
use crate::error::{Error, Result};
use crate::inventory::data::{AggregateResult, DetailCacheEntry, ResourceSummary, ResourceTypeName};
use crate::inventory::detail::{DetailOutcome, DetailResolver};
use crate::inventory::filter::filter;
use crate::inventory::orchestrator::{FetchOrchestrator, RunOutcome};
use crate::inventory::selection::{ResourceSelection, SelectionStore};
use crate::inventory::sink::{ObservabilitySink, ReportContext, ReportEvent, TracingSink};
use crate::inventory::subscription::{
    AGGREGATE_TOPIC, SELECTION_TOPIC, SubscriptionManager, ViewUpdate, detail_topic,
};
use crate::inventory::taxonomy::{Taxonomy, classify};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

pub struct Dashboard {
    source: Arc<dyn CatalogSource>,
    sink: Arc<dyn ObservabilitySink>,
    taxonomy: RwLock<Option<Taxonomy>>,
    selection: RwLock<SelectionStore>,
    query: RwLock<String>,
    orchestrator: FetchOrchestrator,
    details: DetailResolver,
    subscriptions: Arc<SubscriptionManager>,
}

impl Dashboard {
    /// Dashboard reporting through [`TracingSink`]
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>, config: &ViewerConfig) -> Self {
        Self::with_sink(source, Arc::new(TracingSink), config)
    }

    #[must_use]
    pub fn with_sink(
        source: Arc<dyn CatalogSource>,
        sink: Arc<dyn ObservabilitySink>,
        config: &ViewerConfig,
    ) -> Self {
        Self {
            orchestrator: FetchOrchestrator::new(source.clone(), sink.clone(), config.orchestrator.clone()),
            details: DetailResolver::new(source.clone(), sink.clone(), config.detail_policy),
            source,
            sink,
            taxonomy: RwLock::new(None),
            selection: RwLock::new(SelectionStore::new()),
            query: RwLock::new(String::new()),
            subscriptions: Arc::new(SubscriptionManager::new()),
        }
    }

    /// Loads and classifies the catalog.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the catalog cannot be fetched or parsed; nothing
    /// else can be shown without it.
    pub async fn load_catalog(&self) -> Result<Taxonomy> {
        let types = match self.source.resource_types().await {
            Ok(types) => types,
            Err(e) => {
                self.sink.report(
                    ReportEvent::CatalogFailed { error: e.to_string() },
                    ReportContext::default().with_source(self.source.describe()),
                );
                return Err(e);
            }
        };

        let taxonomy = classify(&types);
        info!(
            "📚 Catalog loaded from {}: {} types, {} in quick access",
            self.source.describe(),
            taxonomy.all().len(),
            taxonomy.quick_access.len()
        );
        *self.taxonomy.write().await = Some(taxonomy.clone());
        Ok(taxonomy)
    }

    /// Taxonomy from the last successful [`Self::load_catalog`]
    pub async fn taxonomy(&self) -> Option<Taxonomy> {
        self.taxonomy.read().await.clone()
    }

    pub async fn selection(&self) -> ResourceSelection {
        self.selection.read().await.snapshot()
    }

    /// Flips one type and re-runs the aggregate for the new selection
    pub async fn toggle(&self, resource_type: impl Into<ResourceTypeName>) -> RunOutcome {
        let resource_type = resource_type.into();
        self.run_selection(|store| store.toggle(&resource_type)).await
    }

    /// Explicit user action: drop every selected type
    pub async fn clear_selection(&self) -> RunOutcome {
        self.run_selection(SelectionStore::clear).await
    }

    /// Forgets cached aggregates and re-fetches the current selection
    pub async fn refresh(&self) -> RunOutcome {
        self.orchestrator.invalidate().await;
        self.run_selection(|store| store.snapshot()).await
    }

    /// Unfiltered visible aggregate
    pub async fn aggregate(&self) -> AggregateResult {
        self.orchestrator.current().await
    }

    /// Sets the filter text and returns what is now visible
    pub async fn set_filter(&self, query: impl Into<String>) -> Vec<ResourceSummary> {
        *self.query.write().await = query.into();
        self.visible().await
    }

    pub async fn filter_text(&self) -> String {
        self.query.read().await.clone()
    }

    /// Visible aggregate with the filter text applied
    pub async fn visible(&self) -> Vec<ResourceSummary> {
        let query = self.query.read().await.clone();
        let aggregate = self.orchestrator.current().await;
        filter(aggregate.items(), &query)
    }

    /// Detail panel toggle for one summary
    pub async fn open(&self, summary: &ResourceSummary) -> DetailOutcome {
        let outcome = self.details.open(summary).await;
        match &outcome {
            DetailOutcome::Opened(entry) => {
                self.subscriptions
                    .notify(&detail_topic(&entry.id), ViewUpdate::DetailOpened(entry.clone()))
                    .await;
            }
            DetailOutcome::Closed => {
                self.subscriptions
                    .notify(&detail_topic(&summary.id), ViewUpdate::DetailClosed)
                    .await;
            }
            DetailOutcome::Failed(_) | DetailOutcome::Superseded => {}
        }
        outcome
    }

    /// Opens a summary from the visible aggregate by id
    ///
    /// # Errors
    ///
    /// Will return `Err` if `id` is not part of the visible aggregate
    pub async fn open_by_id(&self, id: &str) -> Result<DetailOutcome> {
        let summary = self
            .orchestrator
            .current()
            .await
            .find(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("{id} in the visible aggregate")))?;
        Ok(self.open(&summary).await)
    }

    pub async fn close(&self) {
        if let Some(id) = self.details.close().await {
            self.subscriptions
                .notify(&detail_topic(&id), ViewUpdate::DetailClosed)
                .await;
        }
    }

    pub async fn open_id(&self) -> Option<String> {
        self.details.open_id().await
    }

    /// Entry shown in the detail panel, if any
    pub async fn open_entry(&self) -> Option<Arc<DetailCacheEntry>> {
        self.details.open_entry().await
    }

    /// Explicitly drops a cached detail; the next open fetches again
    pub async fn invalidate_detail(&self, id: &str) {
        self.details.invalidate(id).await;
    }

    /// See [`SubscriptionManager::subscribe`] for pattern syntax
    pub async fn subscribe(&self, pattern: &str) -> (String, mpsc::Receiver<ViewUpdate>) {
        self.subscriptions.subscribe(pattern).await
    }

    pub async fn unsubscribe(&self, subscription_id: &str) {
        self.subscriptions.unsubscribe(subscription_id).await;
    }

    async fn run_selection(&self, change: impl FnOnce(&mut SelectionStore) -> ResourceSelection) -> RunOutcome {
        // The run starts under the selection lock so runs are ordered like selections
        let (selection, run) = {
            let mut store = self.selection.write().await;
            let selection = change(&mut store);
            let run = self.orchestrator.start(&selection).await;
            (selection, run)
        };
        debug!("🧭 Selection now [{}] (generation {})", selection.signature(), run.generation());

        self.subscriptions
            .notify(SELECTION_TOPIC, ViewUpdate::Selection(selection))
            .await;
        if let Some(pruned) = run.pruned() {
            self.subscriptions
                .notify(AGGREGATE_TOPIC, ViewUpdate::Aggregate(pruned.clone()))
                .await;
        }

        let outcome = self.orchestrator.finish(run).await;
        if let RunOutcome::Applied(aggregate) = &outcome {
            self.subscriptions
                .notify(AGGREGATE_TOPIC, ViewUpdate::Aggregate(aggregate.clone()))
                .await;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FixtureCatalog;
    use crate::inventory::sink::RecordingSink;
    use serde_json::json;

    fn catalog() -> Arc<FixtureCatalog> {
        Arc::new(
            FixtureCatalog::new(&["pods", "services", "deployments"])
                .with_listing("pods", &["nginx", "redis"])
                .with_listing("services", &["web"])
                .with_details("pods", "nginx", json!({"apiVersion": "v1", "kind": "Pod"})),
        )
    }

    fn dashboard(catalog: Arc<FixtureCatalog>) -> Dashboard {
        Dashboard::with_sink(catalog, Arc::new(RecordingSink::new()), &ViewerConfig::default())
    }

    fn ids(items: &[ResourceSummary]) -> Vec<&str> {
        items.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_load_catalog_classifies() {
        let dashboard = dashboard(catalog());
        let taxonomy = dashboard.load_catalog().await.unwrap();
        assert_eq!(taxonomy.all().len(), 3);
        assert_eq!(dashboard.taxonomy().await, Some(taxonomy));
    }

    #[tokio::test]
    async fn test_toggle_off_prunes_without_refetch() {
        let catalog = catalog();
        let dashboard = dashboard(catalog.clone());

        dashboard.toggle("pods").await;
        dashboard.toggle("services").await;
        assert_eq!(catalog.requests().listings, 3);

        dashboard.toggle("pods").await;
        assert_eq!(ids(&dashboard.visible().await), vec!["services/web"]);
        assert_eq!(catalog.requests().listings, 3);
        assert!(!dashboard.selection().await.contains(&ResourceTypeName::new("pods")));
    }

    #[tokio::test]
    async fn test_filter_applies_to_visible() {
        let dashboard = dashboard(catalog());
        dashboard.toggle("pods").await;

        assert_eq!(ids(&dashboard.set_filter("NGI").await), vec!["pods/nginx"]);
        assert_eq!(dashboard.filter_text().await, "NGI");
        assert_eq!(dashboard.set_filter("").await.len(), 2);
    }

    #[tokio::test]
    async fn test_open_by_id_requires_visible_summary() {
        let dashboard = dashboard(catalog());
        assert!(dashboard.open_by_id("pods/nginx").await.is_err());

        dashboard.toggle("Pods").await;
        let outcome = dashboard.open_by_id("pods/nginx").await.unwrap();
        assert!(outcome.entry().is_some());
        assert_eq!(dashboard.open_id().await.as_deref(), Some("pods/nginx"));

        dashboard.close().await;
        assert_eq!(dashboard.open_id().await, None);
    }

    #[tokio::test]
    async fn test_close_notifies_the_closed_detail_topic() {
        let dashboard = dashboard(catalog());
        dashboard.toggle("pods").await;
        dashboard.open_by_id("pods/nginx").await.unwrap();
        let (_id, mut nginx) = dashboard.subscribe(&detail_topic("pods/nginx")).await;

        dashboard.close().await;
        assert!(matches!(nginx.try_recv(), Ok(ViewUpdate::DetailClosed)));

        dashboard.close().await;
        assert!(nginx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_clear_selection_empties_aggregate() {
        let dashboard = dashboard(catalog());
        dashboard.toggle("pods").await;
        let outcome = dashboard.clear_selection().await;
        assert_eq!(outcome, RunOutcome::Applied(AggregateResult::empty()));
        assert!(dashboard.selection().await.is_empty());
        assert!(dashboard.visible().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_refetches_current_selection() {
        let catalog = catalog();
        let dashboard = dashboard(catalog.clone());
        dashboard.toggle("pods").await;
        dashboard.refresh().await;
        assert_eq!(catalog.requests().listings, 2);
        assert_eq!(dashboard.aggregate().await.len(), 2);
    }
}
