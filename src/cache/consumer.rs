//! Cache consumer for executing consumption plans.
//!
//! Drains events from the queue, merges them into a plan and applies it:
//! object invalidation, fragment invalidation via the registry, then warming.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::application::repos::EquipmentRepo;

use super::config::CacheConfig;
use super::events::EventQueue;
use super::instruments;
use super::keys::{CacheKey, EntityKey};
use super::planner::ConsumptionPlan;
use super::registry::CacheRegistry;
use super::store::{FragmentStore, ObjectStore};


pub struct CacheConsumer {
    config: CacheConfig,
    objects: Arc<ObjectStore>,
    fragments: Arc<FragmentStore>,
    registry: Arc<CacheRegistry>,
    queue: Arc<EventQueue>,
    warm_source: Option<Arc<dyn EquipmentRepo>>,
}

impl CacheConsumer {
    pub fn new(
        config: CacheConfig,
        objects: Arc<ObjectStore>,
        fragments: Arc<FragmentStore>,
        registry: Arc<CacheRegistry>,
        queue: Arc<EventQueue>,
    ) -> Self {
        Self {
            config,
            objects,
            fragments,
            registry,
            queue,
            warm_source: None,
        }
    }

    /// Repository used to reload equipment rows after invalidation.
    pub fn with_warm_source(mut self, repo: Arc<dyn EquipmentRepo>) -> Self {
        self.warm_source = Some(repo);
        self
    }

    /// Consume pending events and execute the plan.
    ///
    /// Returns true if any events were processed.
    #[instrument(skip(self))]
    pub async fn consume(&self) -> bool {
        let started_at = Instant::now();
        let events = self.queue.drain(self.config.consume_batch_limit);
        if events.is_empty() {
            return false;
        }

        let event_count = events.len();
        let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let plan = ConsumptionPlan::from_events(events);

        info!(
            target: "wger::cache",
            event_count,
            event_ids = ?event_ids,
            plan = %plan,
            "Cache consumption starting"
        );

        if self.config.enable_object_cache && !plan.invalidate_entities.is_empty() {
            self.invalidate_objects(&plan);
        }

        let evicted_fragments = if plan.invalidate_entities.is_empty() {
            0
        } else {
            self.invalidate_fragments(&plan)
        };

        if self.config.enable_object_cache && plan.has_warm_actions() {
            self.warm(&plan).await;
        }

        info!(
            target: "wger::cache",
            event_count,
            invalidated = plan.invalidate_entities.len(),
            evicted_fragments,
            "Cache consumption complete"
        );

        histogram!(instruments::CONSUME_MS)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        true
    }

    fn invalidate_objects(&self, plan: &ConsumptionPlan) {
        for entity in &plan.invalidate_entities {
            match entity {
                EntityKey::Equipment(id) => self.objects.invalidate_equipment(*id),
                EntityKey::ApiKey(prefix) => self.objects.invalidate_api_key(prefix),
                EntityKey::EquipmentIndex
                | EntityKey::Exercise(_)
                | EntityKey::ExerciseBase(_)
                | EntityKey::ExerciseIndex => {}
            }
        }
    }

    /// Evict every fragment registered against a changed entity.
    fn invalidate_fragments(&self, plan: &ConsumptionPlan) -> usize {
        let mut evicted = 0;
        for entity in &plan.invalidate_entities {
            for key in self.registry.keys_for_entity(entity) {
                if let CacheKey::Fragment(fragment) = &key
                    && self.fragments.invalidate(fragment)
                {
                    evicted += 1;
                    debug!(target: "wger::cache", fragment = %fragment.name(), entity = ?entity, "fragment evicted");
                }
                self.registry.unregister(&key);
            }
        }
        evicted
    }

    async fn warm(&self, plan: &ConsumptionPlan) {
        let Some(repo) = &self.warm_source else {
            debug!(target: "wger::cache", "Warming skipped: no repository access");
            return;
        };

        for id in &plan.warm_equipment {
            if let Ok(Some(equipment)) = repo.find_equipment(*id).await {
                self.objects.set_equipment(equipment);
            }
        }

        if plan.warm_equipment_index {
            let limit = self.config.object_equipment_limit as u64;
            if let Ok(rows) = repo.list_equipment(limit, 0).await {
                let count = rows.len();
                for equipment in rows {
                    self.objects.set_equipment(equipment);
                }
                debug!(target: "wger::cache", count, "Warmed: equipment");
            }
        }
    }
}
