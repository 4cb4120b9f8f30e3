use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;

use crate::application::repos::{
    EquipmentAssociationChange, ExerciseWithEquipment, ExercisesRepo, ExercisesWriteRepo,
    RepoError, UpdateExerciseParams,
};
use crate::domain::entities::{ExerciseBaseRecord, ExerciseRecord};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ExerciseRow {
    id: i64,
    exercise_base_id: i64,
    language_id: i64,
    name: String,
    description: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ExerciseRow> for ExerciseRecord {
    fn from(row: ExerciseRow) -> Self {
        Self {
            id: row.id,
            exercise_base_id: row.exercise_base_id,
            language_id: row.language_id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ExerciseBaseRow {
    id: i64,
    equipment_ids: Vec<i64>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ExerciseBaseRow> for ExerciseBaseRecord {
    fn from(row: ExerciseBaseRow) -> Self {
        Self {
            id: row.id,
            equipment_ids: row.equipment_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ExerciseWithEquipmentRow {
    #[sqlx(flatten)]
    exercise: ExerciseRow,
    equipment_ids: Vec<i64>,
}

const SELECT_BASE: &str = r#"
    SELECT b.id,
           COALESCE(
               ARRAY(
                   SELECT be.equipment_id
                   FROM exercise_base_equipment be
                   WHERE be.exercise_base_id = b.id
                   ORDER BY be.equipment_id
               ),
               '{}'
           ) AS equipment_ids,
           b.created_at,
           b.updated_at
    FROM exercise_bases b
    WHERE b.id = $1
"#;

async fn load_base(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<ExerciseBaseRecord>, RepoError> {
    let row = sqlx::query_as::<_, ExerciseBaseRow>(SELECT_BASE)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

    Ok(row.map(ExerciseBaseRecord::from))
}

#[async_trait]
impl ExercisesRepo for PostgresRepositories {
    async fn find_exercise(&self, id: i64) -> Result<Option<ExerciseRecord>, RepoError> {
        let row = sqlx::query_as::<_, ExerciseRow>(
            r#"
            SELECT id, exercise_base_id, language_id, name, description, created_at, updated_at
            FROM exercises
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ExerciseRecord::from))
    }

    async fn find_exercise_base(&self, id: i64) -> Result<Option<ExerciseBaseRecord>, RepoError> {
        let row = sqlx::query_as::<_, ExerciseBaseRow>(SELECT_BASE)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ExerciseBaseRecord::from))
    }

    async fn list_exercises_with_equipment(
        &self,
        language_id: i64,
    ) -> Result<Vec<ExerciseWithEquipment>, RepoError> {
        let rows = sqlx::query_as::<_, ExerciseWithEquipmentRow>(
            r#"
            SELECT e.id, e.exercise_base_id, e.language_id, e.name, e.description,
                   e.created_at, e.updated_at,
                   array_agg(be.equipment_id ORDER BY be.equipment_id) AS equipment_ids
            FROM exercises e
            INNER JOIN exercise_base_equipment be ON be.exercise_base_id = e.exercise_base_id
            WHERE e.language_id = $1
            GROUP BY e.id
            ORDER BY e.name, e.id
            "#,
        )
        .bind(language_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| ExerciseWithEquipment {
                exercise: row.exercise.into(),
                equipment_ids: row.equipment_ids,
            })
            .collect())
    }
}

#[async_trait]
impl ExercisesWriteRepo for PostgresRepositories {
    async fn update_exercise(
        &self,
        params: UpdateExerciseParams,
    ) -> Result<ExerciseRecord, RepoError> {
        let row = sqlx::query_as::<_, ExerciseRow>(
            r#"
            UPDATE exercises
            SET name = $2, description = $3, updated_at = now()
            WHERE id = $1
            RETURNING id, exercise_base_id, language_id, name, description, created_at, updated_at
            "#,
        )
        .bind(params.id)
        .bind(params.name)
        .bind(params.description)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(ExerciseRecord::from).ok_or(RepoError::NotFound)
    }

    async fn replace_base_equipment(
        &self,
        base_id: i64,
        equipment_ids: &[i64],
    ) -> Result<EquipmentAssociationChange, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let locked = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM exercise_bases WHERE id = $1 FOR UPDATE",
        )
        .bind(base_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if locked.is_none() {
            return Err(RepoError::NotFound);
        }

        let previous_equipment_ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT equipment_id
            FROM exercise_base_equipment
            WHERE exercise_base_id = $1
            ORDER BY equipment_id
            "#,
        )
        .bind(base_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM exercise_base_equipment WHERE exercise_base_id = $1")
            .bind(base_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO exercise_base_equipment (exercise_base_id, equipment_id)
            SELECT $1, equipment_id FROM UNNEST($2::bigint[]) AS t(equipment_id)
            "#,
        )
        .bind(base_id)
        .bind(equipment_ids)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("UPDATE exercise_bases SET updated_at = now() WHERE id = $1")
            .bind(base_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let base = load_base(&mut tx, base_id)
            .await?
            .ok_or(RepoError::NotFound)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(EquipmentAssociationChange {
            base,
            previous_equipment_ids,
        })
    }
}
