use async_trait::async_trait;

use crate::application::repos::{LanguagesRepo, RepoError};
use crate::domain::entities::LanguageRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct LanguageRow {
    id: i64,
    short_name: String,
    full_name: String,
}

impl From<LanguageRow> for LanguageRecord {
    fn from(row: LanguageRow) -> Self {
        Self {
            id: row.id,
            short_name: row.short_name,
            full_name: row.full_name,
        }
    }
}

#[async_trait]
impl LanguagesRepo for PostgresRepositories {
    async fn list_languages(&self) -> Result<Vec<LanguageRecord>, RepoError> {
        let rows = sqlx::query_as::<_, LanguageRow>(
            "SELECT id, short_name, full_name FROM languages ORDER BY id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(LanguageRecord::from).collect())
    }

    async fn find_language_by_short_name(
        &self,
        short_name: &str,
    ) -> Result<Option<LanguageRecord>, RepoError> {
        let row = sqlx::query_as::<_, LanguageRow>(
            "SELECT id, short_name, full_name FROM languages WHERE short_name = $1",
        )
        .bind(short_name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(LanguageRecord::from))
    }
}
