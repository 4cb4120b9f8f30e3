use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{ApiKeysRepo, CreateApiKeyParams, RepoError};
use crate::domain::api_keys::{ApiKeyRecord, ApiScope};

use super::{PostgresRepositories, map_sqlx_error};

const KEY_COLUMNS: &str =
    "id, name, prefix, hashed_secret, scopes, expires_at, revoked_at, last_used_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct ApiKeyRow {
    id: Uuid,
    name: String,
    prefix: String,
    hashed_secret: Vec<u8>,
    scopes: Vec<String>,
    expires_at: Option<OffsetDateTime>,
    revoked_at: Option<OffsetDateTime>,
    last_used_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl TryFrom<ApiKeyRow> for ApiKeyRecord {
    type Error = RepoError;

    fn try_from(row: ApiKeyRow) -> Result<Self, Self::Error> {
        let scopes = row
            .scopes
            .iter()
            .map(|slug| slug.parse::<ApiScope>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| RepoError::Integrity {
                message: format!("api key `{}`: {err}", row.prefix),
            })?;

        Ok(ApiKeyRecord {
            id: row.id,
            name: row.name,
            prefix: row.prefix,
            hashed_secret: row.hashed_secret,
            scopes,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ApiKeysRepo for PostgresRepositories {
    async fn create_key(&self, params: CreateApiKeyParams) -> Result<ApiKeyRecord, RepoError> {
        let scopes: Vec<&str> = params.scopes.iter().map(|scope| scope.as_str()).collect();
        let sql = format!(
            r#"
            INSERT INTO api_keys (id, name, prefix, hashed_secret, scopes, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {KEY_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ApiKeyRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.name)
            .bind(params.prefix)
            .bind(params.hashed_secret)
            .bind(scopes)
            .bind(params.expires_at)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        ApiKeyRecord::try_from(row)
    }

    async fn list_keys(&self) -> Result<Vec<ApiKeyRecord>, RepoError> {
        let sql = format!("SELECT {KEY_COLUMNS} FROM api_keys ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, ApiKeyRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(ApiKeyRecord::try_from).collect()
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<ApiKeyRecord>, RepoError> {
        let sql = format!("SELECT {KEY_COLUMNS} FROM api_keys WHERE prefix = $1");
        let row = sqlx::query_as::<_, ApiKeyRow>(&sql)
            .bind(prefix)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ApiKeyRecord::try_from).transpose()
    }

    async fn revoke_key(
        &self,
        id: Uuid,
        revoked_at: OffsetDateTime,
    ) -> Result<ApiKeyRecord, RepoError> {
        let sql = format!(
            r#"
            UPDATE api_keys
            SET revoked_at = COALESCE(revoked_at, $1)
            WHERE id = $2
            RETURNING {KEY_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ApiKeyRow>(&sql)
            .bind(revoked_at)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.ok_or(RepoError::NotFound)
            .and_then(ApiKeyRecord::try_from)
    }

    async fn update_last_used(&self, id: Uuid, when: OffsetDateTime) -> Result<(), RepoError> {
        sqlx::query("UPDATE api_keys SET last_used_at = $1 WHERE id = $2")
            .bind(when)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
