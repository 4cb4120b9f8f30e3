use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::application::repos::{ApiKeysRepo, CreateApiKeyParams, RepoError};
use crate::cache::{CacheTrigger, ObjectStore};
use crate::domain::api_keys::{ApiKeyRecord, ApiScope};

const TOKEN_PREFIX: &str = "wger";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ApiKeyError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("invalid scope set")]
    InvalidScopes,
    #[error("key name must not be blank")]
    BlankName,
    #[error("key not found")]
    NotFound,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiAuthError {
    #[error("missing api key")]
    Missing,
    #[error("invalid api key")]
    Invalid,
    #[error("expired api key")]
    Expired,
    #[error("revoked api key")]
    Revoked,
    #[error("api key lacks the `{0}` scope")]
    MissingScope(ApiScope),
    #[error("api key lookup failed: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct IssueApiKeyCommand {
    pub name: String,
    pub scopes: Vec<ApiScope>,
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct ApiKeyIssued {
    pub record: ApiKeyRecord,
    pub token: String,
}

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct ApiPrincipal {
    pub key_id: Uuid,
    pub name: String,
    pub prefix: String,
    pub scopes: Vec<ApiScope>,
}

impl ApiPrincipal {
    pub fn requires(&self, needed: ApiScope) -> Result<(), ApiAuthError> {
        if self.scopes.contains(&needed) {
            Ok(())
        } else {
            Err(ApiAuthError::MissingScope(needed))
        }
    }
}

#[derive(Clone)]
pub struct ApiKeyService {
    repo: Arc<dyn ApiKeysRepo>,
    cache: Option<Arc<ObjectStore>>,
    cache_trigger: Option<Arc<CacheTrigger>>,
}

impl ApiKeyService {
    pub fn new(repo: Arc<dyn ApiKeysRepo>) -> Self {
        Self {
            repo,
            cache: None,
            cache_trigger: None,
        }
    }

    pub fn with_cache(mut self, cache: Option<Arc<ObjectStore>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_cache_trigger_opt(mut self, cache_trigger: Option<Arc<CacheTrigger>>) -> Self {
        self.cache_trigger = cache_trigger;
        self
    }

    pub async fn issue(&self, cmd: IssueApiKeyCommand) -> Result<ApiKeyIssued, ApiKeyError> {
        let name = cmd.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiKeyError::BlankName);
        }
        let mut scopes = cmd.scopes;
        scopes.sort_by_key(|scope| scope.as_str());
        scopes.dedup();
        if scopes.is_empty() {
            return Err(ApiKeyError::InvalidScopes);
        }

        let prefix = Self::generate_prefix();
        let secret = Self::generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");
        let hashed_secret = Self::hash_secret(&secret);

        let record = self
            .repo
            .create_key(CreateApiKeyParams {
                name,
                prefix,
                hashed_secret,
                scopes,
                expires_at: cmd.expires_at,
            })
            .await?;

        if let Some(trigger) = &self.cache_trigger {
            trigger.api_key_upserted(&record.prefix).await;
        }

        Ok(ApiKeyIssued { record, token })
    }

    pub async fn revoke(&self, id: Uuid) -> Result<ApiKeyRecord, ApiKeyError> {
        let now = OffsetDateTime::now_utc();
        let record = self
            .repo
            .revoke_key(id, now)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => ApiKeyError::NotFound,
                other => ApiKeyError::Repo(other),
            })?;

        if let Some(trigger) = &self.cache_trigger {
            trigger.api_key_revoked(&record.prefix).await;
        }

        Ok(record)
    }

    pub async fn list(&self) -> Result<Vec<ApiKeyRecord>, ApiKeyError> {
        self.repo.list_keys().await.map_err(ApiKeyError::from)
    }

    pub async fn authenticate(&self, token: &str) -> Result<ApiPrincipal, ApiAuthError> {
        let parsed = Self::parse_token(token).ok_or(ApiAuthError::Invalid)?;
        let record = self.load_by_prefix(&parsed.prefix).await?;

        let now = OffsetDateTime::now_utc();
        if record.revoked_at.is_some_and(|revoked_at| revoked_at <= now) {
            return Err(ApiAuthError::Revoked);
        }
        if record.expires_at.is_some_and(|expires_at| expires_at <= now) {
            return Err(ApiAuthError::Expired);
        }

        let hashed_input = Self::hash_secret(&parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(ApiAuthError::Invalid);
        }

        // last_used_at is advisory; never block authentication on it
        let repo = self.repo.clone();
        let key_id = record.id;
        tokio::spawn(async move {
            if let Err(err) = repo.update_last_used(key_id, now).await {
                warn!(key_id = %key_id, error = %err, "failed to record api key usage");
            }
        });

        Ok(ApiPrincipal {
            key_id: record.id,
            name: record.name,
            prefix: record.prefix,
            scopes: record.scopes,
        })
    }

    async fn load_by_prefix(&self, prefix: &str) -> Result<ApiKeyRecord, ApiAuthError> {
        if let Some(cached) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get_api_key_by_prefix(prefix))
        {
            return Ok(cached);
        }

        let record = self
            .repo
            .find_by_prefix(prefix)
            .await
            .map_err(|err| {
                warn!(prefix, error = %err, "api key lookup failed");
                ApiAuthError::Unavailable(err.to_string())
            })?
            .ok_or(ApiAuthError::Invalid)?;

        if let Some(cache) = &self.cache {
            cache.set_api_key(record.clone());
        }
        Ok(record)
    }

    fn hash_secret(secret: &str) -> Vec<u8> {
        Sha256::digest(secret.as_bytes()).to_vec()
    }

    fn generate_prefix() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_string()
    }

    fn generate_secret() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }

    fn parse_token(token: &str) -> Option<ParsedToken> {
        let mut parts = token.trim().splitn(3, '_');
        if parts.next()? != TOKEN_PREFIX {
            return None;
        }
        let prefix = parts.next()?;
        let secret = parts.next()?;
        if secret.len() < MIN_SECRET_LEN || prefix.is_empty() {
            return None;
        }
        Some(ParsedToken {
            prefix: prefix.to_string(),
            secret: secret.to_string(),
        })
    }
}

struct ParsedToken {
    prefix: String,
    secret: String,
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::cache::CacheConfig;

    #[derive(Default)]
    struct MemoryKeys {
        keys: Mutex<Vec<ApiKeyRecord>>,
    }

    #[async_trait]
    impl ApiKeysRepo for MemoryKeys {
        async fn create_key(&self, params: CreateApiKeyParams) -> Result<ApiKeyRecord, RepoError> {
            let record = ApiKeyRecord {
                id: Uuid::new_v4(),
                name: params.name,
                prefix: params.prefix,
                hashed_secret: params.hashed_secret,
                scopes: params.scopes,
                expires_at: params.expires_at,
                revoked_at: None,
                last_used_at: None,
                created_at: OffsetDateTime::now_utc(),
            };
            self.keys.lock().await.push(record.clone());
            Ok(record)
        }

        async fn list_keys(&self) -> Result<Vec<ApiKeyRecord>, RepoError> {
            Ok(self.keys.lock().await.clone())
        }

        async fn find_by_prefix(&self, prefix: &str) -> Result<Option<ApiKeyRecord>, RepoError> {
            Ok(self
                .keys
                .lock()
                .await
                .iter()
                .find(|key| key.prefix == prefix)
                .cloned())
        }

        async fn revoke_key(
            &self,
            id: Uuid,
            revoked_at: OffsetDateTime,
        ) -> Result<ApiKeyRecord, RepoError> {
            let mut keys = self.keys.lock().await;
            let key = keys
                .iter_mut()
                .find(|key| key.id == id)
                .ok_or(RepoError::NotFound)?;
            key.revoked_at = Some(revoked_at);
            Ok(key.clone())
        }

        async fn update_last_used(&self, _id: Uuid, _when: OffsetDateTime) -> Result<(), RepoError> {
            Ok(())
        }
    }

    fn service() -> ApiKeyService {
        ApiKeyService::new(Arc::new(MemoryKeys::default()))
    }

    fn command(scopes: Vec<ApiScope>) -> IssueApiKeyCommand {
        IssueApiKeyCommand {
            name: "ci".to_string(),
            scopes,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn issued_token_authenticates() {
        let service = service();
        let issued = service
            .issue(command(vec![ApiScope::EquipmentWrite]))
            .await
            .expect("issue");

        assert!(issued.token.starts_with("wger_"));
        let principal = service.authenticate(&issued.token).await.expect("auth");
        assert_eq!(principal.key_id, issued.record.id);
        assert!(principal.requires(ApiScope::EquipmentWrite).is_ok());
        assert_eq!(
            principal.requires(ApiScope::ExerciseWrite),
            Err(ApiAuthError::MissingScope(ApiScope::ExerciseWrite))
        );
    }

    #[tokio::test]
    async fn issue_rejects_empty_scopes_and_blank_names() {
        let service = service();
        assert!(matches!(
            service.issue(command(Vec::new())).await,
            Err(ApiKeyError::InvalidScopes)
        ));

        let mut blank = command(vec![ApiScope::EquipmentWrite]);
        blank.name = "  ".to_string();
        assert!(matches!(
            service.issue(blank).await,
            Err(ApiKeyError::BlankName)
        ));
    }

    #[tokio::test]
    async fn malformed_tokens_are_invalid() {
        let service = service();
        for token in ["", "wger_abc", "sk_abc_0123456789012345678901234567890123", "wger_abc_short"] {
            assert_eq!(
                service.authenticate(token).await.err(),
                Some(ApiAuthError::Invalid),
                "token {token:?}"
            );
        }
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let service = service();
        let issued = service
            .issue(command(vec![ApiScope::EquipmentWrite]))
            .await
            .expect("issue");
        let forged = format!(
            "wger_{}_{}",
            issued.record.prefix,
            "0".repeat(MIN_SECRET_LEN)
        );

        assert_eq!(
            service.authenticate(&forged).await.err(),
            Some(ApiAuthError::Invalid)
        );
    }

    #[tokio::test]
    async fn revoked_and_expired_keys_are_rejected() {
        let service = service();
        let issued = service
            .issue(command(vec![ApiScope::EquipmentWrite]))
            .await
            .expect("issue");
        service.revoke(issued.record.id).await.expect("revoke");
        assert_eq!(
            service.authenticate(&issued.token).await.err(),
            Some(ApiAuthError::Revoked)
        );

        let mut expiring = command(vec![ApiScope::EquipmentWrite]);
        expiring.expires_at = Some(OffsetDateTime::now_utc() - time::Duration::minutes(1));
        let expired = service.issue(expiring).await.expect("issue");
        assert_eq!(
            service.authenticate(&expired.token).await.err(),
            Some(ApiAuthError::Expired)
        );
    }

    #[tokio::test]
    async fn revoking_unknown_key_is_not_found() {
        assert!(matches!(
            service().revoke(Uuid::new_v4()).await,
            Err(ApiKeyError::NotFound)
        ));
    }

    #[tokio::test]
    async fn revocation_written_elsewhere_is_seen_once_cache_entry_is_stale() {
        let repo = Arc::new(MemoryKeys::default());
        let store = Arc::new(ObjectStore::new(&CacheConfig {
            api_key_ttl_secs: 0,
            ..Default::default()
        }));
        let service = ApiKeyService::new(repo.clone()).with_cache(Some(store));
        let issued = service
            .issue(command(vec![ApiScope::EquipmentWrite]))
            .await
            .expect("issue");
        service.authenticate(&issued.token).await.expect("auth");

        // another process revokes the key without publishing a cache event
        repo.revoke_key(issued.record.id, OffsetDateTime::now_utc())
            .await
            .expect("revoke in repo");

        assert_eq!(
            service.authenticate(&issued.token).await.err(),
            Some(ApiAuthError::Revoked)
        );
    }

    struct BrokenKeys;

    #[async_trait]
    impl ApiKeysRepo for BrokenKeys {
        async fn create_key(&self, _params: CreateApiKeyParams) -> Result<ApiKeyRecord, RepoError> {
            Err(RepoError::Timeout)
        }

        async fn list_keys(&self) -> Result<Vec<ApiKeyRecord>, RepoError> {
            Err(RepoError::Timeout)
        }

        async fn find_by_prefix(&self, _prefix: &str) -> Result<Option<ApiKeyRecord>, RepoError> {
            Err(RepoError::Timeout)
        }

        async fn revoke_key(
            &self,
            _id: Uuid,
            _revoked_at: OffsetDateTime,
        ) -> Result<ApiKeyRecord, RepoError> {
            Err(RepoError::Timeout)
        }

        async fn update_last_used(&self, _id: Uuid, _when: OffsetDateTime) -> Result<(), RepoError> {
            Err(RepoError::Timeout)
        }
    }

    #[tokio::test]
    async fn repository_failure_is_not_reported_as_bad_credentials() {
        let service = ApiKeyService::new(Arc::new(BrokenKeys));
        let token = format!("wger_abcdef123456_{}", "a".repeat(MIN_SECRET_LEN));

        assert!(matches!(
            service.authenticate(&token).await,
            Err(ApiAuthError::Unavailable(_))
        ));
    }
}
