use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::application::repos::{FixtureData, FixtureRepo, RepoError};

use super::{PostgresRepositories, map_sqlx_error};

const SERIAL_TABLES: [&str; 3] = ["equipment", "exercise_bases", "exercises"];

#[async_trait]
impl FixtureRepo for PostgresRepositories {
    async fn load_fixture(&self, data: &FixtureData) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        for language in &data.languages {
            sqlx::query(
                r#"
                INSERT INTO languages (id, short_name, full_name)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE
                SET short_name = EXCLUDED.short_name, full_name = EXCLUDED.full_name
                "#,
            )
            .bind(language.id)
            .bind(&language.short_name)
            .bind(&language.full_name)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        for item in &data.equipment {
            sqlx::query(
                r#"
                INSERT INTO equipment (id, name)
                VALUES ($1, $2)
                ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name, updated_at = now()
                "#,
            )
            .bind(item.id)
            .bind(&item.name)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        for base in &data.exercise_bases {
            sqlx::query("INSERT INTO exercise_bases (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
                .bind(base.id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

            sqlx::query("DELETE FROM exercise_base_equipment WHERE exercise_base_id = $1")
                .bind(base.id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

            sqlx::query(
                r#"
                INSERT INTO exercise_base_equipment (exercise_base_id, equipment_id)
                SELECT $1, equipment_id FROM UNNEST($2::bigint[]) AS t(equipment_id)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(base.id)
            .bind(&base.equipment)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        for exercise in &data.exercises {
            sqlx::query(
                r#"
                INSERT INTO exercises (id, exercise_base_id, language_id, name, description)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id) DO UPDATE
                SET exercise_base_id = EXCLUDED.exercise_base_id,
                    language_id = EXCLUDED.language_id,
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    updated_at = now()
                "#,
            )
            .bind(exercise.id)
            .bind(exercise.exercise_base)
            .bind(exercise.language)
            .bind(&exercise.name)
            .bind(&exercise.description)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        for table in SERIAL_TABLES {
            sync_sequence(&mut tx, table).await?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }
}

/// Move the id sequence past explicitly inserted ids.
async fn sync_sequence(tx: &mut Transaction<'_, Postgres>, table: &str) -> Result<(), RepoError> {
    let sql = format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), COALESCE(MAX(id), 0) + 1, false) FROM {table}"
    );
    sqlx::query(&sql)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}
