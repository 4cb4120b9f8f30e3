//! Consumption plan generation.
//!
//! Merges multiple cache events into a single set of invalidation and warm
//! actions.

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::events::{CacheEvent, EventKind};
use super::keys::EntityKey;

#[derive(Debug, Default)]
pub struct ConsumptionPlan {
    /// Entities to invalidate from cache.
    pub invalidate_entities: HashSet<EntityKey>,
    /// Equipment rows to reload into the object cache.
    pub warm_equipment: HashSet<i64>,
    /// Reload the first page of equipment into the object cache.
    pub warm_equipment_index: bool,
}

impl fmt::Display for ConsumptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConsumptionPlan {{ invalidate: {}, warm_equipment: {}, warm_equipment_index: {} }}",
            self.invalidate_entities.len(),
            self.warm_equipment.len(),
            self.warm_equipment_index,
        )
    }
}

impl ConsumptionPlan {
    /// Merge events into a plan.
    ///
    /// Events are deduplicated by id; for equipment rows only the latest
    /// epoch decides between warming and dropping.
    pub fn from_events(events: Vec<CacheEvent>) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();

        let events: Vec<_> = events
            .into_iter()
            .filter(|e| seen_ids.insert(e.id))
            .collect();

        let mut equipment_epochs: HashMap<i64, (u64, bool)> = HashMap::new();

        for event in events {
            match &event.kind {
                EventKind::EquipmentUpserted { equipment_id }
                | EventKind::EquipmentDeleted { equipment_id } => {
                    let deleted = matches!(event.kind, EventKind::EquipmentDeleted { .. });
                    equipment_epochs
                        .entry(*equipment_id)
                        .and_modify(|(epoch, was_deleted)| {
                            if event.epoch > *epoch {
                                *epoch = event.epoch;
                                *was_deleted = deleted;
                            }
                        })
                        .or_insert((event.epoch, deleted));
                }
                EventKind::ExerciseUpdated {
                    exercise_id,
                    exercise_base_id,
                } => {
                    plan.invalidate_entities
                        .insert(EntityKey::Exercise(*exercise_id));
                    plan.invalidate_entities
                        .insert(EntityKey::ExerciseBase(*exercise_base_id));
                    plan.invalidate_entities.insert(EntityKey::ExerciseIndex);
                }
                EventKind::ExerciseEquipmentChanged {
                    exercise_base_id,
                    equipment_ids,
                } => {
                    plan.invalidate_entities
                        .insert(EntityKey::ExerciseBase(*exercise_base_id));
                    plan.invalidate_entities.insert(EntityKey::ExerciseIndex);
                    plan.invalidate_entities
                        .extend(equipment_ids.iter().copied().map(EntityKey::Equipment));
                }
                EventKind::ApiKeyUpserted { prefix } | EventKind::ApiKeyRevoked { prefix } => {
                    plan.invalidate_entities
                        .insert(EntityKey::ApiKey(prefix.clone()));
                }
                EventKind::WarmupOnStartup => {
                    plan.warm_equipment_index = true;
                }
            }
        }

        if !equipment_epochs.is_empty() {
            plan.invalidate_entities.insert(EntityKey::EquipmentIndex);
        }
        for (equipment_id, (_, deleted)) in equipment_epochs {
            plan.invalidate_entities
                .insert(EntityKey::Equipment(equipment_id));
            if !deleted {
                plan.warm_equipment.insert(equipment_id);
            }
        }

        plan
    }

    pub fn has_warm_actions(&self) -> bool {
        self.warm_equipment_index || !self.warm_equipment.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.invalidate_entities.is_empty() && !self.has_warm_actions()
    }
}
