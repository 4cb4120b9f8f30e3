use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    EquipmentRepo, ExercisesRepo, ExercisesWriteRepo, RepoError, UpdateExerciseParams,
};
use crate::cache::CacheTrigger;
use crate::domain::entities::{ExerciseBaseRecord, ExerciseRecord};
use crate::domain::equipment::{normalize_equipment_ids, normalize_exercise_name};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum ExerciseError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("exercise {0} not found")]
    ExerciseNotFound(i64),
    #[error("exercise base {0} not found")]
    BaseNotFound(i64),
    #[error("unknown equipment ids: {0:?}")]
    UnknownEquipment(Vec<i64>),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<DomainError> for ExerciseError {
    fn from(err: DomainError) -> Self {
        Self::Validation {
            field: err.field(),
            message: err.to_string(),
        }
    }
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateExerciseCommand {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct ExerciseService {
    reader: Arc<dyn ExercisesRepo>,
    writer: Arc<dyn ExercisesWriteRepo>,
    equipment: Arc<dyn EquipmentRepo>,
    cache_trigger: Option<Arc<CacheTrigger>>,
}

impl ExerciseService {
    pub fn new(
        reader: Arc<dyn ExercisesRepo>,
        writer: Arc<dyn ExercisesWriteRepo>,
        equipment: Arc<dyn EquipmentRepo>,
    ) -> Self {
        Self {
            reader,
            writer,
            equipment,
            cache_trigger: None,
        }
    }

    pub fn with_cache_trigger_opt(mut self, cache_trigger: Option<Arc<CacheTrigger>>) -> Self {
        self.cache_trigger = cache_trigger;
        self
    }

    pub async fn find_exercise(&self, id: i64) -> Result<Option<ExerciseRecord>, ExerciseError> {
        self.reader
            .find_exercise(id)
            .await
            .map_err(ExerciseError::from)
    }

    pub async fn get_exercise(&self, id: i64) -> Result<ExerciseRecord, ExerciseError> {
        self.find_exercise(id)
            .await?
            .ok_or(ExerciseError::ExerciseNotFound(id))
    }

    pub async fn get_base(&self, id: i64) -> Result<ExerciseBaseRecord, ExerciseError> {
        self.reader
            .find_exercise_base(id)
            .await?
            .ok_or(ExerciseError::BaseNotFound(id))
    }

    /// Apply a name and/or description change. Every successful save
    /// invalidates the equipment overview.
    pub async fn update_exercise(
        &self,
        command: UpdateExerciseCommand,
    ) -> Result<ExerciseRecord, ExerciseError> {
        let current = self.get_exercise(command.id).await?;

        let name = match command.name {
            Some(raw) => normalize_exercise_name(&raw)?,
            None => current.name,
        };
        let description = command
            .description
            .map(|raw| raw.trim().to_string())
            .unwrap_or(current.description);

        let exercise = self
            .writer
            .update_exercise(UpdateExerciseParams {
                id: command.id,
                name,
                description,
            })
            .await
            .map_err(|err| match err {
                RepoError::NotFound => ExerciseError::ExerciseNotFound(command.id),
                other => ExerciseError::Repo(other),
            })?;

        info!(exercise_id = exercise.id, name = %exercise.name, "exercise updated");
        if let Some(trigger) = &self.cache_trigger {
            trigger
                .exercise_updated(exercise.id, exercise.exercise_base_id)
                .await;
        }
        Ok(exercise)
    }

    /// Replace the equipment set of an exercise base.
    pub async fn set_base_equipment(
        &self,
        base_id: i64,
        equipment_ids: &[i64],
    ) -> Result<ExerciseBaseRecord, ExerciseError> {
        let equipment_ids = normalize_equipment_ids(equipment_ids);
        self.ensure_equipment_exists(&equipment_ids).await?;

        let change = self
            .writer
            .replace_base_equipment(base_id, &equipment_ids)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => ExerciseError::BaseNotFound(base_id),
                other => ExerciseError::Repo(other),
            })?;

        info!(
            exercise_base_id = base_id,
            equipment = ?change.base.equipment_ids,
            previous = ?change.previous_equipment_ids,
            "exercise equipment changed"
        );
        if let Some(trigger) = &self.cache_trigger {
            trigger
                .exercise_equipment_changed(base_id, change.touched_equipment_ids())
                .await;
        }
        Ok(change.base)
    }

    async fn ensure_equipment_exists(&self, ids: &[i64]) -> Result<(), ExerciseError> {
        if ids.is_empty() {
            return Ok(());
        }
        let existing = self.equipment.existing_equipment_ids(ids).await?;
        let missing: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| !existing.contains(id))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ExerciseError::UnknownEquipment(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::*;
    use crate::application::repos::{EquipmentAssociationChange, ExerciseWithEquipment};
    use crate::domain::entities::EquipmentRecord;

    struct Fake {
        exercise: Mutex<Option<ExerciseRecord>>,
        base_equipment: Mutex<Vec<i64>>,
        known_equipment: Vec<i64>,
    }

    fn seeded() -> Arc<Fake> {
        let now = OffsetDateTime::now_utc();
        Arc::new(Fake {
            exercise: Mutex::new(Some(ExerciseRecord {
                id: 1,
                exercise_base_id: 10,
                language_id: 2,
                name: "Bench press".to_string(),
                description: "Flat bench".to_string(),
                created_at: now,
                updated_at: now,
            })),
            base_equipment: Mutex::new(vec![3]),
            known_equipment: vec![1, 2, 3],
        })
    }

    fn base(id: i64, equipment_ids: Vec<i64>) -> ExerciseBaseRecord {
        let now = OffsetDateTime::now_utc();
        ExerciseBaseRecord {
            id,
            equipment_ids,
            created_at: now,
            updated_at: now,
        }
    }

    #[async_trait]
    impl ExercisesRepo for Fake {
        async fn find_exercise(&self, id: i64) -> Result<Option<ExerciseRecord>, RepoError> {
            let exercise = self.exercise.lock().expect("exercise lock").clone();
            Ok(exercise.filter(|e| e.id == id))
        }

        async fn find_exercise_base(
            &self,
            id: i64,
        ) -> Result<Option<ExerciseBaseRecord>, RepoError> {
            let ids = self.base_equipment.lock().expect("base lock").clone();
            Ok((id == 10).then(|| base(id, ids)))
        }

        async fn list_exercises_with_equipment(
            &self,
            _language_id: i64,
        ) -> Result<Vec<ExerciseWithEquipment>, RepoError> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl ExercisesWriteRepo for Fake {
        async fn update_exercise(
            &self,
            params: UpdateExerciseParams,
        ) -> Result<ExerciseRecord, RepoError> {
            let mut guard = self.exercise.lock().expect("exercise lock");
            let exercise = guard
                .as_mut()
                .filter(|e| e.id == params.id)
                .ok_or(RepoError::NotFound)?;
            exercise.name = params.name;
            exercise.description = params.description;
            Ok(exercise.clone())
        }

        async fn replace_base_equipment(
            &self,
            base_id: i64,
            equipment_ids: &[i64],
        ) -> Result<EquipmentAssociationChange, RepoError> {
            if base_id != 10 {
                return Err(RepoError::NotFound);
            }
            let mut guard = self.base_equipment.lock().expect("base lock");
            let previous = std::mem::replace(&mut *guard, equipment_ids.to_vec());
            Ok(EquipmentAssociationChange {
                base: base(base_id, equipment_ids.to_vec()),
                previous_equipment_ids: previous,
            })
        }
    }

    #[async_trait]
    impl EquipmentRepo for Fake {
        async fn count_equipment(&self) -> Result<u64, RepoError> {
            Ok(self.known_equipment.len() as u64)
        }

        async fn list_equipment(
            &self,
            _limit: u64,
            _offset: u64,
        ) -> Result<Vec<EquipmentRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn find_equipment(&self, _id: i64) -> Result<Option<EquipmentRecord>, RepoError> {
            Ok(None)
        }

        async fn existing_equipment_ids(&self, ids: &[i64]) -> Result<Vec<i64>, RepoError> {
            Ok(ids
                .iter()
                .copied()
                .filter(|id| self.known_equipment.contains(id))
                .collect())
        }
    }

    fn service(fake: Arc<Fake>) -> ExerciseService {
        ExerciseService::new(fake.clone(), fake.clone(), fake)
    }

    #[tokio::test]
    async fn partial_update_keeps_untouched_fields() {
        let service = service(seeded());
        let updated = service
            .update_exercise(UpdateExerciseCommand {
                id: 1,
                name: Some("  Incline press ".to_string()),
                description: None,
            })
            .await
            .expect("update");

        assert_eq!(updated.name, "Incline press");
        assert_eq!(updated.description, "Flat bench");
    }

    #[tokio::test]
    async fn blank_name_is_a_validation_error() {
        let service = service(seeded());
        let err = service
            .update_exercise(UpdateExerciseCommand {
                id: 1,
                name: Some(" ".to_string()),
                description: None,
            })
            .await
            .expect_err("blank name");

        assert!(matches!(err, ExerciseError::Validation { field: "name", .. }));
    }

    #[tokio::test]
    async fn unknown_exercise_is_not_found() {
        let service = service(seeded());
        let err = service
            .update_exercise(UpdateExerciseCommand {
                id: 99,
                ..Default::default()
            })
            .await
            .expect_err("missing exercise");

        assert!(matches!(err, ExerciseError::ExerciseNotFound(99)));
    }

    #[tokio::test]
    async fn equipment_set_is_deduplicated_and_checked() {
        let fake = seeded();
        let service = service(fake.clone());

        let base = service
            .set_base_equipment(10, &[2, 1, 2])
            .await
            .expect("replace");
        assert_eq!(base.equipment_ids, vec![1, 2]);

        let err = service
            .set_base_equipment(10, &[1, 7, 8])
            .await
            .expect_err("unknown equipment");
        assert!(matches!(err, ExerciseError::UnknownEquipment(ref ids) if ids == &vec![7, 8]));
        assert_eq!(*fake.base_equipment.lock().expect("base lock"), vec![1, 2]);
    }

    #[tokio::test]
    async fn unknown_base_is_not_found() {
        let service = service(seeded());
        assert!(matches!(
            service.set_base_equipment(11, &[]).await,
            Err(ExerciseError::BaseNotFound(11))
        ));
    }
}
