use super::data::{AggregateResult, DetailCacheEntry};
use super::selection::ResourceSelection;
use crate::config::SUBSCRIPTION_CHANNEL_CAPACITY;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

pub const SELECTION_TOPIC: &str = "selection";
pub const AGGREGATE_TOPIC: &str = "aggregate";

/// `detail:<id>`
#[must_use]
pub fn detail_topic(id: &str) -> String {
    format!("detail:{id}")
}

/// What the presentation layer hears about
#[derive(Debug, Clone)]
pub enum ViewUpdate {
    Selection(ResourceSelection),
    Aggregate(AggregateResult),
    DetailOpened(Arc<DetailCacheEntry>),
    DetailClosed,
}

pub struct Subscription {
    pub id: String,
    pub pattern: String,
    pub sender: mpsc::Sender<ViewUpdate>,
}

impl Subscription {
    #[must_use]
    pub fn new(pattern: String) -> (Self, mpsc::Receiver<ViewUpdate>) {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CHANNEL_CAPACITY);
        let id = Uuid::new_v4().to_string();

        (
            Self {
                id,
                pattern,
                sender: tx,
            },
            rx,
        )
    }
}

pub struct SubscriptionManager {
    subscriptions: RwLock<HashMap<String, Vec<Subscription>>>,
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Patterns: exact topic, `*`, or a `prefix*`
    pub async fn subscribe(&self, pattern: impl Into<String>) -> (String, mpsc::Receiver<ViewUpdate>) {
        let pattern = pattern.into();
        let (subscription, receiver) = Subscription::new(pattern.clone());
        let id = subscription.id.clone();

        self.subscriptions
            .write()
            .await
            .entry(pattern)
            .or_default()
            .push(subscription);

        (id, receiver)
    }

    pub async fn unsubscribe(&self, subscription_id: &str) {
        let mut subs = self.subscriptions.write().await;

        for subscriptions in subs.values_mut() {
            subscriptions.retain(|s| s.id != subscription_id);
        }

        subs.retain(|_, v| !v.is_empty());
    }

    /// Never blocks the pipeline: full or closed receivers miss the update
    pub async fn notify(&self, topic: &str, update: ViewUpdate) {
        let subs = self.subscriptions.read().await;

        for (pattern, subscriptions) in subs.iter() {
            if Self::pattern_matches(pattern, topic) {
                for subscription in subscriptions {
                    match subscription.sender.try_send(update.clone()) {
                        Ok(()) | Err(TrySendError::Closed(_)) => {}
                        Err(TrySendError::Full(_)) => {
                            debug!("📭 Subscriber {} lagging, dropped {} update", subscription.id, topic);
                        }
                    }
                }
            }
        }
    }

    fn pattern_matches(pattern: &str, topic: &str) -> bool {
        if pattern == "*" || pattern == topic {
            return true;
        }

        // "detail:*" matches "detail:pods/nginx"
        if let Some(prefix) = pattern.strip_suffix('*') {
            return topic.starts_with(prefix);
        }

        false
    }

    pub async fn active_subscriptions(&self) -> usize {
        let subs = self.subscriptions.read().await;
        subs.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_pattern_matching() {
        assert!(SubscriptionManager::pattern_matches("*", "anything"));
        assert!(SubscriptionManager::pattern_matches("detail:*", "detail:pods/nginx"));
        assert!(SubscriptionManager::pattern_matches("aggregate", "aggregate"));
        assert!(!SubscriptionManager::pattern_matches("detail:*", "aggregate"));
    }

    #[tokio::test]
    async fn test_subscribe_unsubscribe() {
        let manager = SubscriptionManager::new();

        let (id1, _rx1) = manager.subscribe(AGGREGATE_TOPIC).await;
        let (id2, _rx2) = manager.subscribe("detail:*").await;
        assert_eq!(manager.active_subscriptions().await, 2);

        manager.unsubscribe(&id1).await;
        assert_eq!(manager.active_subscriptions().await, 1);

        manager.unsubscribe(&id2).await;
        assert_eq!(manager.active_subscriptions().await, 0);
    }

    #[tokio::test]
    async fn test_notification() {
        let manager = SubscriptionManager::new();
        let (_id, mut rx) = manager.subscribe("detail:*").await;

        manager.notify(&detail_topic("pods/nginx"), ViewUpdate::DetailClosed).await;
        manager.notify(AGGREGATE_TOPIC, ViewUpdate::Aggregate(AggregateResult::empty())).await;

        assert!(matches!(rx.recv().await, Some(ViewUpdate::DetailClosed)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_receiver_does_not_block() {
        let manager = SubscriptionManager::new();
        let (_id, _rx) = manager.subscribe("*").await;
        for _ in 0..(SUBSCRIPTION_CHANNEL_CAPACITY * 2) {
            manager.notify(SELECTION_TOPIC, ViewUpdate::Selection(ResourceSelection::empty())).await;
        }
    }
}
