//! Typed pub/sub for graph mutations (C9), generalised from the teacher's
//! `engine/engram/memory_bus.rs` channel bus down to the simpler typed +
//! wildcard model SPEC_FULL.md §4.9 specifies.

use crate::atoms::error::GraphResult;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    EntityCreated,
    EntityUpdated,
    EntityDeleted,
    RelationCreated,
    RelationDeleted,
    ObservationAdded,
    ObservationDeleted,
    GraphSaved,
    GraphLoaded,
}

#[derive(Debug, Clone)]
pub enum GraphEvent {
    EntityCreated {
        at: DateTime<Utc>,
        name: String,
    },
    EntityUpdated {
        at: DateTime<Utc>,
        name: String,
        changes: serde_json::Value,
        previous: serde_json::Value,
    },
    EntityDeleted {
        at: DateTime<Utc>,
        name: String,
    },
    RelationCreated {
        at: DateTime<Utc>,
        from: String,
        to: String,
        relation_type: String,
    },
    RelationDeleted {
        at: DateTime<Utc>,
        from: String,
        to: String,
        relation_type: String,
    },
    ObservationAdded {
        at: DateTime<Utc>,
        name: String,
        observation: String,
    },
    ObservationDeleted {
        at: DateTime<Utc>,
        name: String,
        observation: String,
    },
    GraphSaved {
        at: DateTime<Utc>,
        entity_count: usize,
        relation_count: usize,
    },
    GraphLoaded {
        at: DateTime<Utc>,
        entity_count: usize,
        relation_count: usize,
    },
}

impl GraphEvent {
    pub fn channel(&self) -> Channel {
        match self {
            GraphEvent::EntityCreated { .. } => Channel::EntityCreated,
            GraphEvent::EntityUpdated { .. } => Channel::EntityUpdated,
            GraphEvent::EntityDeleted { .. } => Channel::EntityDeleted,
            GraphEvent::RelationCreated { .. } => Channel::RelationCreated,
            GraphEvent::RelationDeleted { .. } => Channel::RelationDeleted,
            GraphEvent::ObservationAdded { .. } => Channel::ObservationAdded,
            GraphEvent::ObservationDeleted { .. } => Channel::ObservationDeleted,
            GraphEvent::GraphSaved { .. } => Channel::GraphSaved,
            GraphEvent::GraphLoaded { .. } => Channel::GraphLoaded,
        }
    }
}

pub type Listener = Arc<dyn Fn(&GraphEvent) -> GraphResult<()> + Send + Sync>;

/// An opaque handle returned by `subscribe`; dropping it does nothing —
/// call `unsubscribe` explicitly, mirroring the teacher's bus handles.
pub struct Subscription {
    id: u64,
    channel: Option<Channel>,
}

pub struct EventEmitter {
    typed: Mutex<HashMap<Channel, Vec<(u64, Listener)>>>,
    wildcard: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
    /// When true, the first listener error aborts dispatch and is returned
    /// to the caller instead of being logged and swallowed.
    strict: bool,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter").field("strict", &self.strict).finish()
    }
}

impl EventEmitter {
    pub fn new(strict: bool) -> Self {
        EventEmitter {
            typed: Mutex::new(HashMap::new()),
            wildcard: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            strict,
        }
    }

    pub fn subscribe(&self, channel: Channel, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.typed.lock().entry(channel).or_default().push((id, listener));
        Subscription { id, channel: Some(channel) }
    }

    pub fn subscribe_wildcard(&self, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.wildcard.lock().push((id, listener));
        Subscription { id, channel: None }
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        match subscription.channel {
            Some(channel) => {
                if let Some(list) = self.typed.lock().get_mut(&channel) {
                    list.retain(|(id, _)| *id != subscription.id);
                }
            }
            None => {
                self.wildcard.lock().retain(|(id, _)| *id != subscription.id);
            }
        }
    }

    /// Dispatches `event` to its typed channel's listeners, then to wildcard
    /// listeners. Errors are logged and isolated unless `strict`.
    pub fn emit(&self, event: &GraphEvent) -> GraphResult<()> {
        let channel = event.channel();
        let typed_listeners: Vec<Listener> = self
            .typed
            .lock()
            .get(&channel)
            .map(|l| l.iter().map(|(_, f)| f.clone()).collect())
            .unwrap_or_default();
        let wildcard_listeners: Vec<Listener> =
            self.wildcard.lock().iter().map(|(_, f)| f.clone()).collect();

        for listener in typed_listeners.iter().chain(wildcard_listeners.iter()) {
            if let Err(err) = listener(event) {
                if self.strict {
                    return Err(err);
                }
                log::error!("event listener error on {:?}: {err}", channel);
            }
        }
        Ok(())
    }
}
