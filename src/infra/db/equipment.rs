use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    CreateEquipmentParams, EquipmentRepo, EquipmentWriteRepo, RepoError, UpdateEquipmentParams,
};
use crate::domain::entities::EquipmentRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct EquipmentRow {
    id: i64,
    name: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<EquipmentRow> for EquipmentRecord {
    fn from(row: EquipmentRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl EquipmentRepo for PostgresRepositories {
    async fn count_equipment(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM equipment")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn list_equipment(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<EquipmentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, EquipmentRow>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM equipment
            ORDER BY name, id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(Self::convert_bound(limit)?)
        .bind(Self::convert_bound(offset)?)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(EquipmentRecord::from).collect())
    }

    async fn find_equipment(&self, id: i64) -> Result<Option<EquipmentRecord>, RepoError> {
        let row = sqlx::query_as::<_, EquipmentRow>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM equipment
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(EquipmentRecord::from))
    }

    async fn existing_equipment_ids(&self, ids: &[i64]) -> Result<Vec<i64>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_scalar::<_, i64>("SELECT id FROM equipment WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl EquipmentWriteRepo for PostgresRepositories {
    async fn create_equipment(
        &self,
        params: CreateEquipmentParams,
    ) -> Result<EquipmentRecord, RepoError> {
        let row = sqlx::query_as::<_, EquipmentRow>(
            r#"
            INSERT INTO equipment (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(params.name)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_equipment(
        &self,
        params: UpdateEquipmentParams,
    ) -> Result<EquipmentRecord, RepoError> {
        let row = sqlx::query_as::<_, EquipmentRow>(
            r#"
            UPDATE equipment
            SET name = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(params.id)
        .bind(params.name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(EquipmentRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_equipment(&self, id: i64) -> Result<EquipmentRecord, RepoError> {
        // Associations go with the row through ON DELETE CASCADE.
        let row = sqlx::query_as::<_, EquipmentRow>(
            r#"
            DELETE FROM equipment
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(EquipmentRecord::from).ok_or(RepoError::NotFound)
    }
}
