use super::cached_data::CachedData;
use super::data::{AggregateResult, ListingBatch, ResourceSummary, ResourceTypeName};
use super::selection::{ResourceSelection, SelectionSignature};
use super::sink::{ObservabilitySink, ReportContext, ReportEvent};
use crate::backend::CatalogSource;
use crate::config::OrchestratorConfig;
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type SharedBatch = Shared<BoxFuture<'static, Arc<ListingBatch>>>;
type WeakBatch = WeakShared<BoxFuture<'static, Arc<ListingBatch>>>;

/// Result of one `fetch_aggregate` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The aggregate is now the visible one
    Applied(AggregateResult),
    /// A newer selection took over; nothing was applied
    Superseded,
}

impl RunOutcome {
    #[must_use]
    pub const fn aggregate(&self) -> Option<&AggregateResult> {
        match self {
            Self::Applied(aggregate) => Some(aggregate),
            Self::Superseded => None,
        }
    }

    #[must_use]
    pub const fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

/// A run that has claimed its generation but not fetched yet
#[derive(Debug)]
pub struct PendingRun {
    generation: u64,
    selection: ResourceSelection,
    signature: SelectionSignature,
    token: CancellationToken,
    pruned: Option<AggregateResult>,
    // Set when the pruned aggregate already holds every selected type
    settled: Option<AggregateResult>,
}

impl PendingRun {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The visible aggregate right after pruning, if pruning removed anything
    #[must_use]
    pub const fn pruned(&self) -> Option<&AggregateResult> {
        self.pruned.as_ref()
    }
}

#[derive(Debug, Default)]
struct RunState {
    generation: u64,
    signature: SelectionSignature,
    cancel: CancellationToken,
    applied: AggregateResult,
    // Types whose listings in `applied` came from a successful request
    covered: Vec<ResourceTypeName>,
}

/// Turns a selection into an aggregate: one listing request per type, run
/// concurrently, per-type failures tolerated, last selection wins.
pub struct FetchOrchestrator {
    source: Arc<dyn CatalogSource>,
    sink: Arc<dyn ObservabilitySink>,
    config: OrchestratorConfig,
    state: RwLock<RunState>,
    batches: Arc<RwLock<HashMap<SelectionSignature, CachedData<Arc<ListingBatch>>>>>,
    in_flight: Arc<Mutex<HashMap<SelectionSignature, WeakBatch>>>,
    last_good: Arc<RwLock<HashMap<ResourceTypeName, Vec<ResourceSummary>>>>,
}

impl FetchOrchestrator {
    #[must_use]
    pub fn new(
        source: Arc<dyn CatalogSource>,
        sink: Arc<dyn ObservabilitySink>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            source,
            sink,
            config,
            state: RwLock::new(RunState::default()),
            batches: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            last_good: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The aggregate currently visible
    pub async fn current(&self) -> AggregateResult {
        self.state.read().await.applied.clone()
    }

    /// Generation of the most recent run
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Fetches and applies the aggregate for `selection`.
    ///
    /// Starting a run cancels the previous one and immediately prunes the
    /// visible aggregate down to `selection`; the run's own result is applied
    /// only if no newer run started meanwhile.
    pub async fn fetch_aggregate(&self, selection: &ResourceSelection) -> RunOutcome {
        let run = self.start(selection).await;
        self.finish(run).await
    }

    /// First half of [`Self::fetch_aggregate`]: claims a generation and prunes.
    ///
    /// Callers that must order runs with their own state change (the dashboard
    /// holds its selection lock across this call) start here and await
    /// [`Self::finish`] once the lock is released.
    pub async fn start(&self, selection: &ResourceSelection) -> PendingRun {
        let signature = selection.signature();
        let mut state = self.state.write().await;
        // Same signature: the outstanding fetch is still wanted, the new run joins it
        if state.signature != signature || state.cancel.is_cancelled() {
            state.cancel.cancel();
            state.cancel = CancellationToken::new();
        }
        state.generation += 1;
        state.signature = signature.clone();

        let before = state.applied.len();
        state.applied = state.applied.retain_selected(selection);
        state.covered.retain(|resource_type| selection.contains(resource_type));
        let pruned = (state.applied.len() != before).then(|| state.applied.clone());
        let settled = selection
            .iter()
            .all(|resource_type| state.covered.contains(resource_type))
            .then(|| state.applied.clone());

        debug!(
            "🚦 RUN START: generation {} for [{}]",
            state.generation, signature
        );
        PendingRun {
            generation: state.generation,
            selection: selection.clone(),
            signature,
            token: state.cancel.clone(),
            pruned,
            settled,
        }
    }

    /// Second half of [`Self::fetch_aggregate`]
    pub async fn finish(&self, run: PendingRun) -> RunOutcome {
        let PendingRun {
            generation,
            selection,
            signature,
            token,
            settled,
            ..
        } = run;

        if selection.is_empty() {
            debug!("🈳 Empty selection, nothing to fetch (generation {})", generation);
            return self.apply(generation, &selection, AggregateResult::empty()).await;
        }
        if let Some(aggregate) = settled {
            debug!("✂️ [{}] already visible, applied without fetching", signature);
            return self.apply(generation, &selection, aggregate).await;
        }

        let batch = if let Some(batch) = self.cached_batch(&signature).await {
            batch
        } else {
            let shared = self.join_or_launch(&signature, &selection, generation).await;
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    self.sink.report(ReportEvent::RunSuperseded, ReportContext::run(generation, &signature));
                    return RunOutcome::Superseded;
                }
                batch = shared => batch,
            }
        };

        let aggregate = AggregateResult::assemble(&selection, &batch);
        self.apply(generation, &selection, aggregate).await
    }

    /// Drops cached aggregates; the next run for any selection hits the backend
    pub async fn invalidate(&self) {
        self.batches.write().await.clear();
        self.state.write().await.covered.clear();
    }

    async fn apply(
        &self,
        generation: u64,
        selection: &ResourceSelection,
        aggregate: AggregateResult,
    ) -> RunOutcome {
        let mut state = self.state.write().await;
        if state.generation != generation || state.signature != *aggregate.signature() {
            self.sink.report(
                ReportEvent::RunSuperseded,
                ReportContext::run(generation, aggregate.signature()),
            );
            return RunOutcome::Superseded;
        }
        info!(
            "✅ AGGREGATE APPLIED: {} items for [{}] (generation {}, {} failed types)",
            aggregate.len(),
            aggregate.signature(),
            generation,
            aggregate.failed_types().len()
        );
        state.covered = selection
            .iter()
            .filter(|resource_type| !aggregate.failed_types().contains(resource_type))
            .cloned()
            .collect();
        state.applied = aggregate.clone();
        drop(state);
        RunOutcome::Applied(aggregate)
    }

    async fn cached_batch(&self, signature: &SelectionSignature) -> Option<Arc<ListingBatch>> {
        let batches = self.batches.read().await;
        match batches.get(signature) {
            Some(entry) if entry.is_fresh() => {
                debug!("🎯 Aggregate cache HIT: [{}] (age {:.1}s)", signature, entry.age().as_secs_f64());
                entry.fresh().cloned()
            }
            Some(_) => {
                debug!("🔄 Aggregate cache STALE: [{}]", signature);
                None
            }
            None => {
                debug!("❌ Aggregate cache MISS: [{}]", signature);
                None
            }
        }
    }

    /// Single flight per signature: a live in-flight batch is shared, otherwise a new one starts.
    async fn join_or_launch(
        &self,
        signature: &SelectionSignature,
        selection: &ResourceSelection,
        generation: u64,
    ) -> SharedBatch {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(shared) = in_flight.get(signature).and_then(WeakShared::upgrade) {
            debug!("🔗 Joining in-flight fetch for [{}]", signature);
            return shared;
        }

        let shared = self.launch(signature.clone(), selection.clone(), generation).shared();
        if let Some(weak) = shared.downgrade() {
            in_flight.insert(signature.clone(), weak);
        }
        shared
    }

    fn launch(
        &self,
        signature: SelectionSignature,
        selection: ResourceSelection,
        generation: u64,
    ) -> BoxFuture<'static, Arc<ListingBatch>> {
        let source = self.source.clone();
        let sink = self.sink.clone();
        let batches = self.batches.clone();
        let in_flight = self.in_flight.clone();
        let last_good = self.last_good.clone();
        let config = self.config.clone();

        async move {
            let start = Instant::now();
            let context = ReportContext::run(generation, &signature).with_source(source.describe());
            info!("🔄 FETCH START: [{}] ({} types)", signature, selection.len());

            let results: Vec<(ResourceTypeName, Option<Vec<ResourceSummary>>)> =
                stream::iter(selection.iter().cloned())
                    .map(|resource_type| {
                        let source = source.clone();
                        let sink = sink.clone();
                        let context = context.clone();
                        async move {
                            match source.list_names(&resource_type).await {
                                Ok(names) => {
                                    // Names repeat across namespaces; ids stay unique per type
                                    let summaries = names
                                        .into_iter()
                                        .unique()
                                        .map(|name| ResourceSummary::new(resource_type.clone(), name))
                                        .collect();
                                    (resource_type, Some(summaries))
                                }
                                Err(e) => {
                                    sink.report(
                                        ReportEvent::ListingFailed {
                                            resource_type: resource_type.clone(),
                                            error: e.to_string(),
                                        },
                                        context,
                                    );
                                    (resource_type, None)
                                }
                            }
                        }
                    })
                    .buffered(config.max_concurrent_listings.max(1))
                    .collect()
                    .await;

            let mut batch = ListingBatch::default();
            for (resource_type, summaries) in results {
                match summaries {
                    Some(summaries) => {
                        if config.retain_on_failure {
                            last_good
                                .write()
                                .await
                                .insert(resource_type.clone(), summaries.clone());
                        }
                        batch.listings.insert(resource_type, summaries);
                    }
                    None => {
                        if config.retain_on_failure {
                            if let Some(previous) = last_good.read().await.get(&resource_type) {
                                sink.report(
                                    ReportEvent::ListingRetained {
                                        resource_type: resource_type.clone(),
                                        count: previous.len(),
                                    },
                                    context.clone(),
                                );
                                batch.listings.insert(resource_type.clone(), previous.clone());
                            }
                        }
                        batch.failed.push(resource_type);
                    }
                }
            }

            info!(
                "🏁 FETCH DONE: [{}] ({:.2}s, {} ok, {} failed)",
                signature,
                start.elapsed().as_secs_f64(),
                selection.len() - batch.failed.len(),
                batch.failed.len()
            );

            let batch = Arc::new(batch);
            // Failed runs are not reused: re-toggling is the retry
            if batch.is_complete() && !config.aggregate_ttl.is_zero() {
                batches
                    .write()
                    .await
                    .insert(signature.clone(), CachedData::new(batch.clone(), config.aggregate_ttl));
            }
            in_flight.lock().await.remove(&signature);
            batch
        }
        .boxed()
    }
}
