//! Bounded, severity-aware alert store.
//!
//! A capacity-`C` active set with eviction that protects critical
//! visibility, plus an append-only newest-first history capped at `H`.
//! Change notification uses a tokio broadcast channel; events are published
//! while the state lock is held, so subscribers see every active-set
//! transition in mutation order.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::types::{Alert, AlertDraft, Severity};

/// Channel capacity for broadcast.
const CHANNEL_CAPACITY: usize = 256;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("alert store lock poisoned")]
    LockPoisoned,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to an [`AlertStore`].
pub type SharedAlertStore = Arc<AlertStore>;

/// Active-set transitions published to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertStoreEvent {
    /// A new alert entered the active set.
    AlertCreated { alert: Alert },
    /// An active alert was evicted to make room for a new one.
    AlertEvicted { id: String, severity: Severity },
    /// A new alert was denied an active slot (all slots critical); it still
    /// reached history.
    AlertRejected { id: String, severity: Severity },
    /// An alert was explicitly cleared.
    AlertCleared { id: String },
    /// The whole active set was cleared.
    ActiveCleared { count: usize },
}

/// Capacity limits for the store.
#[derive(Debug, Clone, Copy)]
pub struct AlertStoreConfig {
    /// Maximum concurrently active alerts.
    pub capacity: usize,
    /// Maximum history length.
    pub history_limit: usize,
}

impl Default for AlertStoreConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            history_limit: 50,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    /// Insertion-ordered active alerts, oldest first.
    active: Vec<Alert>,
    /// Newest-first creation log, including rejected and evicted alerts.
    history: Vec<Alert>,
}

/// Bounded priority store over live alerts.
pub struct AlertStore {
    config: AlertStoreConfig,
    state: RwLock<StoreState>,
    sender: broadcast::Sender<AlertStoreEvent>,
}

impl AlertStore {
    /// Create a store with the given limits.
    pub fn new(config: AlertStoreConfig) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            config,
            state: RwLock::new(StoreState::default()),
            sender,
        }
    }

    /// Create a shared reference to this store.
    pub fn shared(self) -> SharedAlertStore {
        Arc::new(self)
    }

    /// Materialize a draft and insert it.
    ///
    /// Under capacity the alert is appended. At capacity the first
    /// non-critical active alert is evicted; if every slot is critical, a
    /// non-critical newcomer is rejected from the active set (history still
    /// records it), and a critical newcomer replaces the earliest-inserted
    /// critical alert. History always receives a copy, newest first.
    pub fn create_alert(&self, draft: AlertDraft) -> StoreResult<Alert> {
        let alert = draft.into_alert();

        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;

        let mut admitted = true;
        if state.active.len() < self.config.capacity {
            state.active.push(alert.clone());
        } else if let Some(pos) = state
            .active
            .iter()
            .position(|a| a.severity != Severity::Critical)
        {
            let evicted = state.active.remove(pos);
            self.publish(AlertStoreEvent::AlertEvicted {
                id: evicted.id,
                severity: evicted.severity,
            });
            state.active.push(alert.clone());
        } else if alert.severity != Severity::Critical {
            // Critical visibility is protected from lower-priority noise.
            admitted = false;
            self.publish(AlertStoreEvent::AlertRejected {
                id: alert.id.clone(),
                severity: alert.severity,
            });
        } else {
            let evicted = state.active.remove(0);
            self.publish(AlertStoreEvent::AlertEvicted {
                id: evicted.id,
                severity: evicted.severity,
            });
            state.active.push(alert.clone());
        }

        state.history.insert(0, alert.clone());
        if state.history.len() > self.config.history_limit {
            state.history.truncate(self.config.history_limit);
        }

        if admitted {
            self.publish(AlertStoreEvent::AlertCreated {
                alert: alert.clone(),
            });
            info!(
                id = %alert.id,
                kind = %alert.kind,
                severity = %alert.severity,
                active = state.active.len(),
                "alert created"
            );
        } else {
            debug!(id = %alert.id, "alert rejected, active set is all critical");
        }

        Ok(alert)
    }

    /// Remove one alert from the active set, or all of them when `id` is
    /// `None`. History is never touched. Returns the number removed.
    pub fn clear_alert(&self, id: Option<&str>) -> StoreResult<usize> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;

        match id {
            Some(id) => {
                let before = state.active.len();
                state.active.retain(|a| a.id != id);
                let removed = before - state.active.len();
                if removed > 0 {
                    self.publish(AlertStoreEvent::AlertCleared { id: id.to_string() });
                    debug!(id, "alert cleared");
                }
                Ok(removed)
            }
            None => {
                let count = state.active.len();
                state.active.clear();
                if count > 0 {
                    self.publish(AlertStoreEvent::ActiveCleared { count });
                    debug!(count, "active set cleared");
                }
                Ok(count)
            }
        }
    }

    /// Snapshot of the active set, oldest first.
    pub fn active(&self) -> StoreResult<Vec<Alert>> {
        Ok(self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .active
            .clone())
    }

    /// Snapshot of the history, newest first.
    pub fn history(&self) -> StoreResult<Vec<Alert>> {
        Ok(self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .history
            .clone())
    }

    /// The most recently admitted active alert, for simple consumers.
    pub fn latest(&self) -> StoreResult<Option<Alert>> {
        Ok(self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .active
            .last()
            .cloned())
    }

    /// Number of active alerts.
    pub fn active_len(&self) -> StoreResult<usize> {
        Ok(self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .active
            .len())
    }

    /// Whether an active alert already exists for `kind` + group key.
    pub fn has_active(&self, kind: &str, key: &str) -> StoreResult<bool> {
        Ok(self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .active
            .iter()
            .any(|a| a.kind == kind && a.group_key() == Some(key)))
    }

    /// Subscribe to active-set transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<AlertStoreEvent> {
        self.sender.subscribe()
    }

    /// Number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn publish(&self, event: AlertStoreEvent) {
        // No receivers is fine; state is the source of truth.
        let _ = self.sender.send(event);
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new(AlertStoreConfig::default())
    }
}
