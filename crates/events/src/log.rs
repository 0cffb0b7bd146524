//! Append-only in-memory event log.
//!
//! The log is the durable record of everything the engine decided (trigger creation,
//! move transitions, interventions, generated supply). Appends are published on the
//! attached bus afterwards.
//!
//! Entries are kept in memory until [`EventLog::truncate_before`] drops the prefix a
//! consumer has already persisted; long-running processes are expected to call it.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use crate::bus::EventBus;
use crate::envelope::EventEnvelope;
use crate::event::Event;
use crate::in_memory_bus::InMemoryEventBus;

#[derive(Debug)]
struct Entries<E> {
    kept: Vec<EventEnvelope<E>>,
    /// Last sequence number handed out, including truncated entries.
    last: u64,
}

#[derive(Debug)]
pub struct EventLog<E> {
    entries: RwLock<Entries<E>>,
    bus: Option<Arc<InMemoryEventBus<EventEnvelope<E>>>>,
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Entries {
                kept: Vec::new(),
                last: 0,
            }),
            bus: None,
        }
    }
}

impl<E: Event> EventLog<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bus(bus: Arc<InMemoryEventBus<EventEnvelope<E>>>) -> Self {
        Self {
            bus: Some(bus),
            ..Self::default()
        }
    }

    /// Append a batch atomically (all or nothing), then publish each envelope.
    pub fn append_all(&self, batch: Vec<(&'static str, Uuid, E)>) -> Vec<EventEnvelope<E>> {
        if batch.is_empty() {
            return Vec::new();
        }

        let committed = {
            let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
            let mut next = entries.last + 1;
            let mut committed = Vec::with_capacity(batch.len());
            for (stream, entity_id, payload) in batch {
                let envelope = EventEnvelope::new(
                    Uuid::now_v7(),
                    stream,
                    entity_id,
                    payload.event_type(),
                    next,
                    Utc::now(),
                    payload,
                );
                entries.last = next;
                next += 1;
                entries.kept.push(envelope.clone());
                committed.push(envelope);
            }
            committed
        };

        if let Some(bus) = &self.bus {
            for envelope in &committed {
                if let Err(err) = bus.publish(envelope.clone()) {
                    tracing::warn!(
                        sequence = envelope.sequence_number(),
                        event_type = envelope.event_type(),
                        "failed to publish event: {err}"
                    );
                }
            }
        }

        committed
    }

    pub fn append(&self, stream: &'static str, entity_id: Uuid, payload: E) -> EventEnvelope<E> {
        // A one-element batch always yields exactly one envelope.
        let mut committed = self.append_all(vec![(stream, entity_id, payload)]);
        committed.remove(0)
    }

    pub fn entries(&self) -> Vec<EventEnvelope<E>> {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).kept.clone()
    }

    /// Entries with a sequence number strictly greater than `after`.
    pub fn since(&self, after: u64) -> Vec<EventEnvelope<E>> {
        self.entries
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .kept
            .iter()
            .filter(|e| e.sequence_number() > after)
            .cloned()
            .collect()
    }

    /// Drops entries with a sequence number below `sequence`; returns how many went.
    /// Later appends keep numbering from where the log left off.
    pub fn truncate_before(&self, sequence: u64) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        let before = entries.kept.len();
        entries.kept.retain(|e| e.sequence_number() >= sequence);
        let dropped = before - entries.kept.len();
        if dropped > 0 {
            tracing::debug!(dropped, sequence, "event log truncated");
        }
        dropped
    }

    /// Entries currently kept in memory.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
