//! Cache trigger service.
//!
//! High-level API used by write paths to publish cache events and
//! optionally consume them immediately.

use std::sync::Arc;

use tracing::debug;

use super::config::CacheConfig;
use super::consumer::CacheConsumer;
use super::events::{EventKind, EventQueue};

pub struct CacheTrigger {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    consumer: Arc<CacheConsumer>,
}

impl CacheTrigger {
    pub fn new(config: CacheConfig, queue: Arc<EventQueue>, consumer: Arc<CacheConsumer>) -> Self {
        Self {
            config,
            queue,
            consumer,
        }
    }

    /// Publish an event; with `consume_now` the queue is drained before
    /// returning so the invalidation is visible to the caller.
    pub async fn trigger(&self, kind: EventKind, consume_now: bool) {
        if !self.config.is_enabled() {
            debug!(target: "wger::cache", event_kind = ?kind, "Cache trigger skipped: cache disabled");
            return;
        }

        self.queue.publish(kind);

        if consume_now {
            self.consumer.consume().await;
        }
    }

    pub async fn equipment_upserted(&self, equipment_id: i64) {
        self.trigger(EventKind::EquipmentUpserted { equipment_id }, true)
            .await;
    }

    pub async fn equipment_deleted(&self, equipment_id: i64) {
        self.trigger(EventKind::EquipmentDeleted { equipment_id }, true)
            .await;
    }

    pub async fn exercise_updated(&self, exercise_id: i64, exercise_base_id: i64) {
        self.trigger(
            EventKind::ExerciseUpdated {
                exercise_id,
                exercise_base_id,
            },
            true,
        )
        .await;
    }

    pub async fn exercise_equipment_changed(&self, exercise_base_id: i64, equipment_ids: Vec<i64>) {
        self.trigger(
            EventKind::ExerciseEquipmentChanged {
                exercise_base_id,
                equipment_ids,
            },
            true,
        )
        .await;
    }

    pub async fn api_key_upserted(&self, prefix: &str) {
        self.trigger(
            EventKind::ApiKeyUpserted {
                prefix: prefix.to_string(),
            },
            true,
        )
        .await;
    }

    pub async fn api_key_revoked(&self, prefix: &str) {
        self.trigger(
            EventKind::ApiKeyRevoked {
                prefix: prefix.to_string(),
            },
            true,
        )
        .await;
    }

    pub async fn warmup_on_startup(&self) {
        self.trigger(EventKind::WarmupOnStartup, true).await;
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn consumer(&self) -> &Arc<CacheConsumer> {
        &self.consumer
    }
}
