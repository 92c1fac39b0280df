pub mod cached_data;
pub mod data;
pub mod detail;
pub mod filter;
pub mod orchestrator;
pub mod selection;
pub mod sink;
pub mod subscription;
pub mod taxonomy;

pub use data::{AggregateResult, DetailCacheEntry, ResourceDetail, ResourceSummary, ResourceTypeName};
pub use detail::{DetailOutcome, DetailResolver};
pub use filter::filter;
pub use orchestrator::{FetchOrchestrator, RunOutcome};
pub use selection::{ResourceSelection, SelectionSignature, SelectionStore};
pub use sink::{ObservabilitySink, RecordingSink, ReportContext, ReportEvent, TracingSink};
pub use subscription::{SubscriptionManager, ViewUpdate};
pub use taxonomy::{Taxonomy, classify};
