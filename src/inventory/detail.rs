use super::data::{DetailCacheEntry, ResourceSummary};
use super::sink::{ObservabilitySink, ReportContext, ReportEvent};
use crate::backend::CatalogSource;
use crate::config::DetailPolicy;
use crate::error::Error;
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

type DetailResult = Result<Arc<DetailCacheEntry>, Arc<Error>>;
type SharedDetail = Shared<BoxFuture<'static, DetailResult>>;
type WeakDetail = WeakShared<BoxFuture<'static, DetailResult>>;

/// What an `open` call did to the panel
#[derive(Debug, Clone)]
pub enum DetailOutcome {
    /// Panel now shows this entry
    Opened(Arc<DetailCacheEntry>),
    /// The resource was already open; the panel closed
    Closed,
    /// Fetch failed; panel left as it was
    Failed(Arc<Error>),
    /// Another open/close happened while this one was fetching
    Superseded,
}

impl DetailOutcome {
    #[must_use]
    pub const fn entry(&self) -> Option<&Arc<DetailCacheEntry>> {
        match self {
            Self::Opened(entry) => Some(entry),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct PanelState {
    open_id: Option<String>,
    // Bumped by every open/close; a fetch result only lands if it is unchanged
    generation: u64,
}

/// On-demand detail lookups with a keyed cache and an open/closed panel toggle.
pub struct DetailResolver {
    source: Arc<dyn CatalogSource>,
    sink: Arc<dyn ObservabilitySink>,
    policy: DetailPolicy,
    cache: Arc<RwLock<HashMap<String, Arc<DetailCacheEntry>>>>,
    panel: Mutex<PanelState>,
    // Weak: once every caller is gone the request is dropped with them
    in_flight: Arc<Mutex<HashMap<String, WeakDetail>>>,
}

impl DetailResolver {
    #[must_use]
    pub fn new(
        source: Arc<dyn CatalogSource>,
        sink: Arc<dyn ObservabilitySink>,
        policy: DetailPolicy,
    ) -> Self {
        Self {
            source,
            sink,
            policy,
            cache: Arc::new(RwLock::new(HashMap::new())),
            panel: Mutex::new(PanelState::default()),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Clicking the open resource closes the panel; anything else resolves
    /// the detail (cache first) and opens it.
    pub async fn open(&self, summary: &ResourceSummary) -> DetailOutcome {
        let generation = {
            let mut panel = self.panel.lock().await;
            panel.generation += 1;
            if panel.open_id.as_deref() == Some(summary.id.as_str()) {
                panel.open_id = None;
                debug!("📕 Detail panel closed by toggle: {}", summary.id);
                return DetailOutcome::Closed;
            }
            panel.generation
        };

        let cached = self.cached(&summary.id).await;
        let entry = match (cached, self.policy) {
            (Some(entry), DetailPolicy::CacheForever) => {
                debug!("🎯 Detail cache HIT: {}", summary.id);
                entry
            }
            (cached, _) => match self.fetch(summary).await {
                Ok(entry) => entry,
                Err(error) => {
                    self.sink.report(
                        ReportEvent::DetailFailed {
                            id: summary.id.clone(),
                            error: error.to_string(),
                        },
                        ReportContext::default().with_source(self.source.describe()),
                    );
                    match cached {
                        // Refresh failed; the previous document is still good to show
                        Some(entry) => entry,
                        None => return DetailOutcome::Failed(error),
                    }
                }
            },
        };

        let mut panel = self.panel.lock().await;
        if panel.generation != generation {
            debug!("🗑️ Detail result for {} discarded, panel moved on", summary.id);
            return DetailOutcome::Superseded;
        }
        panel.open_id = Some(summary.id.clone());
        drop(panel);
        DetailOutcome::Opened(entry)
    }

    /// Unconditionally closes the panel, returning the id that was open
    pub async fn close(&self) -> Option<String> {
        let mut panel = self.panel.lock().await;
        panel.generation += 1;
        panel.open_id.take()
    }

    pub async fn open_id(&self) -> Option<String> {
        self.panel.lock().await.open_id.clone()
    }

    pub async fn cached(&self, id: &str) -> Option<Arc<DetailCacheEntry>> {
        self.cache.read().await.get(id).cloned()
    }

    /// Entry for whatever is open right now
    pub async fn open_entry(&self) -> Option<Arc<DetailCacheEntry>> {
        let id = self.open_id().await?;
        self.cached(&id).await
    }

    pub async fn invalidate(&self, id: &str) {
        self.cache.write().await.remove(id);
    }

    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// At most one request per id; later callers join the outstanding one.
    async fn fetch(&self, summary: &ResourceSummary) -> DetailResult {
        let shared = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(existing) = in_flight.get(&summary.id).and_then(WeakShared::upgrade) {
                debug!("🔗 Joining in-flight detail fetch: {}", summary.id);
                existing
            } else {
                let shared = self.launch(summary.clone()).shared();
                if let Some(weak) = shared.downgrade() {
                    in_flight.insert(summary.id.clone(), weak);
                }
                shared
            }
        };
        shared.await
    }

    fn launch(&self, summary: ResourceSummary) -> BoxFuture<'static, DetailResult> {
        let source = self.source.clone();
        let cache = self.cache.clone();
        let in_flight = self.in_flight.clone();

        async move {
            info!("🔄 DETAIL FETCH: {}", summary.id);
            let result = match source.details(&summary.resource_type, &summary.name).await {
                Ok(detail) => {
                    let entry = Arc::new(DetailCacheEntry::new(summary.id.clone(), detail));
                    cache.write().await.insert(summary.id.clone(), entry.clone());
                    info!("✅ DETAIL CACHED: {}", summary.id);
                    Ok(entry)
                }
                Err(e) => Err(Arc::new(e)),
            };
            in_flight.lock().await.remove(&summary.id);
            result
        }
        .boxed()
    }
}
