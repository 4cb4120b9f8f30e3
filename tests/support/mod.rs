#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use wger::application::api_keys::IssueApiKeyCommand;
use wger::application::context::{ContextOptions, Repositories, ServiceContext};
use wger::application::fixtures::parse_fixture;
use wger::application::repos::{
    ApiKeysRepo, CreateApiKeyParams, CreateEquipmentParams, EquipmentAssociationChange,
    EquipmentRepo, EquipmentWriteRepo, ExerciseWithEquipment, ExercisesRepo, ExercisesWriteRepo,
    FixtureData, FixtureRepo, HealthRepo, LanguagesRepo, RepoError, UpdateEquipmentParams,
    UpdateExerciseParams,
};
use wger::domain::api_keys::{ApiKeyRecord, ApiScope};
use wger::domain::entities::{
    EquipmentRecord, ExerciseBaseRecord, ExerciseRecord, LanguageRecord,
};
use wger::infra::http::{RouterState, build_router};

pub const DEFAULT_FIXTURE: &str = include_str!("../../fixtures/default.toml");

#[derive(Default)]
struct MemoryState {
    languages: Vec<LanguageRecord>,
    equipment: BTreeMap<i64, EquipmentRecord>,
    bases: BTreeMap<i64, Vec<i64>>,
    exercises: BTreeMap<i64, ExerciseRecord>,
    api_keys: Vec<ApiKeyRecord>,
}

/// In-memory stand-in for every repository trait.
#[derive(Default)]
pub struct MemoryRepo {
    state: Mutex<MemoryState>,
    unhealthy: AtomicBool,
}

impl MemoryRepo {
    pub fn with_fixture(data: &FixtureData) -> Arc<Self> {
        let repo = Arc::new(Self::default());
        repo.apply(data);
        repo
    }

    pub fn seeded() -> Arc<Self> {
        let data = parse_fixture(DEFAULT_FIXTURE).expect("default fixture parses");
        Self::with_fixture(&data)
    }

    /// Languages only, plus `count` equipment rows named `Equipment NN`.
    pub fn with_equipment_count(count: i64) -> Arc<Self> {
        let mut data = parse_fixture(DEFAULT_FIXTURE).expect("default fixture parses");
        data.equipment.clear();
        data.exercise_bases.clear();
        data.exercises.clear();
        let repo = Self::with_fixture(&data);
        {
            let mut state = repo.state.lock().expect("state lock");
            for id in 1..=count {
                state.equipment.insert(id, equipment(id, &format!("Equipment {id:02}")));
            }
        }
        repo
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.unhealthy.store(unhealthy, Ordering::SeqCst);
    }

    pub fn equipment_named(&self, name: &str) -> Option<EquipmentRecord> {
        let state = self.state.lock().expect("state lock");
        state.equipment.values().find(|e| e.name == name).cloned()
    }

    pub fn equipment_by_id(&self, id: i64) -> Option<EquipmentRecord> {
        let state = self.state.lock().expect("state lock");
        state.equipment.get(&id).cloned()
    }

    pub fn base_equipment(&self, base_id: i64) -> Vec<i64> {
        let state = self.state.lock().expect("state lock");
        state.bases.get(&base_id).cloned().unwrap_or_default()
    }

    /// Mark a key revoked without going through the service or cache.
    pub fn revoke_key_row(&self, prefix: &str) {
        let mut state = self.state.lock().expect("state lock");
        if let Some(key) = state.api_keys.iter_mut().find(|k| k.prefix == prefix) {
            key.revoked_at = Some(OffsetDateTime::now_utc());
        }
    }

    fn apply(&self, data: &FixtureData) {
        let mut state = self.state.lock().expect("state lock");
        let now = OffsetDateTime::now_utc();
        for language in &data.languages {
            state.languages.retain(|l| l.id != language.id);
            state.languages.push(LanguageRecord {
                id: language.id,
                short_name: language.short_name.clone(),
                full_name: language.full_name.clone(),
            });
        }
        state.languages.sort_by_key(|l| l.id);
        for item in &data.equipment {
            state.equipment.insert(item.id, equipment(item.id, &item.name));
        }
        for base in &data.exercise_bases {
            let mut ids = base.equipment.clone();
            ids.sort_unstable();
            ids.dedup();
            state.bases.insert(base.id, ids);
        }
        for exercise in &data.exercises {
            state.exercises.insert(
                exercise.id,
                ExerciseRecord {
                    id: exercise.id,
                    exercise_base_id: exercise.exercise_base,
                    language_id: exercise.language,
                    name: exercise.name.clone(),
                    description: exercise.description.clone(),
                    created_at: now,
                    updated_at: now,
                },
            );
        }
    }
}

fn equipment(id: i64, name: &str) -> EquipmentRecord {
    let now = OffsetDateTime::now_utc();
    EquipmentRecord {
        id,
        name: name.to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn base_record(id: i64, equipment_ids: Vec<i64>) -> ExerciseBaseRecord {
    let now = OffsetDateTime::now_utc();
    ExerciseBaseRecord {
        id,
        equipment_ids,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl EquipmentRepo for MemoryRepo {
    async fn count_equipment(&self) -> Result<u64, RepoError> {
        Ok(self.state.lock().expect("state lock").equipment.len() as u64)
    }

    async fn list_equipment(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<EquipmentRecord>, RepoError> {
        let state = self.state.lock().expect("state lock");
        let mut items: Vec<EquipmentRecord> = state.equipment.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_equipment(&self, id: i64) -> Result<Option<EquipmentRecord>, RepoError> {
        Ok(self.equipment_by_id(id))
    }

    async fn existing_equipment_ids(&self, ids: &[i64]) -> Result<Vec<i64>, RepoError> {
        let state = self.state.lock().expect("state lock");
        Ok(ids
            .iter()
            .copied()
            .filter(|id| state.equipment.contains_key(id))
            .collect())
    }
}

#[async_trait]
impl EquipmentWriteRepo for MemoryRepo {
    async fn create_equipment(
        &self,
        params: CreateEquipmentParams,
    ) -> Result<EquipmentRecord, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let id = state.equipment.keys().max().copied().unwrap_or(0) + 1;
        let record = equipment(id, &params.name);
        state.equipment.insert(id, record.clone());
        Ok(record)
    }

    async fn update_equipment(
        &self,
        params: UpdateEquipmentParams,
    ) -> Result<EquipmentRecord, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let record = state
            .equipment
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        record.name = params.name;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn delete_equipment(&self, id: i64) -> Result<EquipmentRecord, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let record = state.equipment.remove(&id).ok_or(RepoError::NotFound)?;
        for ids in state.bases.values_mut() {
            ids.retain(|equipment_id| *equipment_id != id);
        }
        Ok(record)
    }
}

#[async_trait]
impl ExercisesRepo for MemoryRepo {
    async fn find_exercise(&self, id: i64) -> Result<Option<ExerciseRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .expect("state lock")
            .exercises
            .get(&id)
            .cloned())
    }

    async fn find_exercise_base(&self, id: i64) -> Result<Option<ExerciseBaseRecord>, RepoError> {
        let state = self.state.lock().expect("state lock");
        Ok(state
            .bases
            .get(&id)
            .map(|ids| base_record(id, ids.clone())))
    }

    async fn list_exercises_with_equipment(
        &self,
        language_id: i64,
    ) -> Result<Vec<ExerciseWithEquipment>, RepoError> {
        let state = self.state.lock().expect("state lock");
        let mut entries: Vec<ExerciseWithEquipment> = state
            .exercises
            .values()
            .filter(|exercise| exercise.language_id == language_id)
            .filter_map(|exercise| {
                let ids = state.bases.get(&exercise.exercise_base_id)?;
                (!ids.is_empty()).then(|| ExerciseWithEquipment {
                    exercise: exercise.clone(),
                    equipment_ids: ids.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.exercise.name.cmp(&b.exercise.name));
        Ok(entries)
    }
}

#[async_trait]
impl ExercisesWriteRepo for MemoryRepo {
    async fn update_exercise(
        &self,
        params: UpdateExerciseParams,
    ) -> Result<ExerciseRecord, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let record = state
            .exercises
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        record.name = params.name;
        record.description = params.description;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn replace_base_equipment(
        &self,
        base_id: i64,
        equipment_ids: &[i64],
    ) -> Result<EquipmentAssociationChange, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let ids = state.bases.get_mut(&base_id).ok_or(RepoError::NotFound)?;
        let previous = std::mem::replace(ids, equipment_ids.to_vec());
        Ok(EquipmentAssociationChange {
            base: base_record(base_id, equipment_ids.to_vec()),
            previous_equipment_ids: previous,
        })
    }
}

#[async_trait]
impl LanguagesRepo for MemoryRepo {
    async fn list_languages(&self) -> Result<Vec<LanguageRecord>, RepoError> {
        Ok(self.state.lock().expect("state lock").languages.clone())
    }

    async fn find_language_by_short_name(
        &self,
        short_name: &str,
    ) -> Result<Option<LanguageRecord>, RepoError> {
        let state = self.state.lock().expect("state lock");
        Ok(state
            .languages
            .iter()
            .find(|l| l.short_name == short_name)
            .cloned())
    }
}

#[async_trait]
impl ApiKeysRepo for MemoryRepo {
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
        self.state
            .lock()
            .expect("state lock")
            .api_keys
            .push(record.clone());
        Ok(record)
    }

    async fn list_keys(&self) -> Result<Vec<ApiKeyRecord>, RepoError> {
        Ok(self.state.lock().expect("state lock").api_keys.clone())
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<ApiKeyRecord>, RepoError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        let state = self.state.lock().expect("state lock");
        Ok(state.api_keys.iter().find(|k| k.prefix == prefix).cloned())
    }

    async fn revoke_key(
        &self,
        id: Uuid,
        revoked_at: OffsetDateTime,
    ) -> Result<ApiKeyRecord, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let key = state
            .api_keys
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or(RepoError::NotFound)?;
        key.revoked_at.get_or_insert(revoked_at);
        Ok(key.clone())
    }

    async fn update_last_used(&self, id: Uuid, when: OffsetDateTime) -> Result<(), RepoError> {
        let mut state = self.state.lock().expect("state lock");
        if let Some(key) = state.api_keys.iter_mut().find(|k| k.id == id) {
            key.last_used_at = Some(when);
        }
        Ok(())
    }
}

#[async_trait]
impl FixtureRepo for MemoryRepo {
    async fn load_fixture(&self, data: &FixtureData) -> Result<(), RepoError> {
        self.apply(data);
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryRepo {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            Err(RepoError::Timeout)
        } else {
            Ok(())
        }
    }
}

/// Router, services and backing store of one test application.
pub struct TestApp {
    pub router: Router,
    pub context: ServiceContext,
    pub repo: Arc<MemoryRepo>,
}

impl TestApp {
    pub fn new(repo: Arc<MemoryRepo>) -> Self {
        Self::with_options(repo, ContextOptions::default())
    }

    pub fn with_options(repo: Arc<MemoryRepo>, options: ContextOptions) -> Self {
        let context = ServiceContext::build(Repositories::shared(repo.clone()), options);
        let router = build_router(RouterState::from_context(&context));
        Self {
            router,
            context,
            repo,
        }
    }

    pub async fn token(&self, scopes: &[ApiScope]) -> String {
        self.context
            .api_keys
            .issue(IssueApiKeyCommand {
                name: "test".to_string(),
                scopes: scopes.to_vec(),
                expires_at: None,
            })
            .await
            .expect("issue api key")
            .token
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None, Body::empty()).await
    }

    pub async fn post_form(&self, uri: &str, token: Option<&str>, form: &str) -> TestResponse {
        self.send(
            Method::POST,
            uri,
            token,
            Some("application/x-www-form-urlencoded"),
            Body::from(form.to_string()),
        )
        .await
    }

    pub async fn send_json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        json: serde_json::Value,
    ) -> TestResponse {
        self.send(
            method,
            uri,
            token,
            Some("application/json"),
            Body::from(json.to_string()),
        )
        .await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        content_type: Option<&str>,
        body: Body,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(body).expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("json body")
    }

    /// Number of equipment rows in a rendered list page.
    pub fn equipment_rows(&self) -> usize {
        self.body.matches("data-equipment=").count()
    }
}
