//! Cache event system.
//!
//! Defines cache events and an in-memory queue for event-driven invalidation.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::gauge;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::instruments;
use super::lock::MutexExt;

const SOURCE: &str = "cache::events";

/// Monotonic epoch for ordering events within this process.
pub type Epoch = u64;

/// Cache event with idempotency and ordering support.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier for idempotency.
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Types of cache events that trigger invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Equipment was created or renamed.
    EquipmentUpserted { equipment_id: i64 },
    /// Equipment was deleted (associations included).
    EquipmentDeleted { equipment_id: i64 },
    /// An exercise's name or description changed.
    ExerciseUpdated {
        exercise_id: i64,
        exercise_base_id: i64,
    },
    /// The equipment set of an exercise base changed. `equipment_ids`
    /// holds the union of the old and new sets.
    ExerciseEquipmentChanged {
        exercise_base_id: i64,
        equipment_ids: Vec<i64>,
    },
    ApiKeyUpserted { prefix: String },
    ApiKeyRevoked { prefix: String },
    /// Warm the cache on startup or after a bulk load.
    WarmupOnStartup,
}

/// In-memory event queue for cache invalidation.
pub struct EventQueue {
    queue: Mutex<VecDeque<CacheEvent>>,
    epoch_counter: AtomicU64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn publish(&self, kind: EventKind) {
        let epoch = self.next_epoch();
        let event = CacheEvent::new(kind.clone(), epoch);

        info!(
            target: "wger::cache",
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = ?kind,
            "Cache event enqueued"
        );

        let mut queue = self.queue.lock_recovered(SOURCE, "publish");
        queue.push_back(event);
        gauge!(instruments::EVENT_QUEUE_LEN).set(queue.len() as f64);
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<CacheEvent> {
        let mut queue = self.queue.lock_recovered(SOURCE, "drain");
        let count = limit.min(queue.len());
        let drained = queue.drain(..count).collect();
        gauge!(instruments::EVENT_QUEUE_LEN).set(queue.len() as f64);
        drained
    }

    pub fn len(&self) -> usize {
        self.queue.lock_recovered(SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.queue.lock_recovered(SOURCE, "clear").clear();
        gauge!(instruments::EVENT_QUEUE_LEN).set(0.0);
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
