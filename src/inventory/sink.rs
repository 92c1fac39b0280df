//! Observability sink for non-fatal pipeline failures.
//!
//! The orchestrator and the detail resolver never log directly; they hand a
//! [`ReportEvent`] plus a [`ReportContext`] to whatever sink they were built with.

use super::data::ResourceTypeName;
use super::selection::SelectionSignature;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// Catalog could not be loaded; fatal to the initial render
    CatalogFailed { error: String },
    /// One type's listing failed; the type contributes nothing this run
    ListingFailed {
        resource_type: ResourceTypeName,
        error: String,
    },
    /// A failed type fell back to its last successful listing
    ListingRetained {
        resource_type: ResourceTypeName,
        count: usize,
    },
    /// Detail fetch failed; the panel stays as it was
    DetailFailed { id: String, error: String },
    /// A run finished after a newer selection took over and was discarded
    RunSuperseded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportContext {
    pub generation: Option<u64>,
    pub signature: Option<SelectionSignature>,
    pub source: Option<String>,
}

impl ReportContext {
    #[must_use]
    pub fn run(generation: u64, signature: &SelectionSignature) -> Self {
        Self {
            generation: Some(generation),
            signature: Some(signature.clone()),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

pub trait ObservabilitySink: Send + Sync {
    fn report(&self, event: ReportEvent, context: ReportContext);
}

/// Default sink: structured `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ObservabilitySink for TracingSink {
    fn report(&self, event: ReportEvent, context: ReportContext) {
        let generation = context.generation.unwrap_or_default();
        let signature = context
            .signature
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let source = context.source.as_deref().unwrap_or("-");

        match event {
            ReportEvent::CatalogFailed { error } => {
                error!(source, "❌ CATALOG FAILED: {}", error);
            }
            ReportEvent::ListingFailed {
                resource_type,
                error,
            } => {
                warn!(generation, signature = %signature, source, "❌ LISTING FAILED: {} - {}", resource_type, error);
            }
            ReportEvent::ListingRetained {
                resource_type,
                count,
            } => {
                warn!(generation, signature = %signature, "♻️ LISTING RETAINED: {} ({} items from last success)", resource_type, count);
            }
            ReportEvent::DetailFailed { id, error } => {
                warn!(source, "❌ DETAIL FAILED: {} - {}", id, error);
            }
            ReportEvent::RunSuperseded => {
                debug!(generation, signature = %signature, "🗑️ RUN SUPERSEDED, result discarded");
            }
        }
    }
}

/// Keeps every report in memory, for tests and diagnostics
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(ReportEvent, ReportContext)>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(event, _)| event.clone())
            .collect()
    }

    #[must_use]
    pub fn reports(&self) -> Vec<(ReportEvent, ReportContext)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn count(&self, matches: impl Fn(&ReportEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(event, _)| matches(event))
            .count()
    }
}

impl ObservabilitySink for RecordingSink {
    fn report(&self, event: ReportEvent, context: ReportContext) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((event, context));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order_and_context() {
        let sink = RecordingSink::new();
        let signature = SelectionSignature::default();
        sink.report(ReportEvent::RunSuperseded, ReportContext::run(3, &signature));
        sink.report(
            ReportEvent::DetailFailed {
                id: "pods/nginx".to_string(),
                error: "HTTP 500".to_string(),
            },
            ReportContext::default().with_source("fixture"),
        );

        let reports = sink.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].1.generation, Some(3));
        assert_eq!(reports[1].1.source.as_deref(), Some("fixture"));
        assert_eq!(sink.count(|e| matches!(e, ReportEvent::DetailFailed { .. })), 1);
    }

    #[test]
    fn test_tracing_sink_accepts_every_event() {
        let sink = TracingSink;
        sink.report(ReportEvent::CatalogFailed { error: "down".into() }, ReportContext::default());
        sink.report(
            ReportEvent::ListingFailed {
                resource_type: "pods".into(),
                error: "HTTP 500".into(),
            },
            ReportContext::default(),
        );
        sink.report(
            ReportEvent::ListingRetained {
                resource_type: "pods".into(),
                count: 2,
            },
            ReportContext::default(),
        );
        sink.report(ReportEvent::RunSuperseded, ReportContext::default());
    }
}
