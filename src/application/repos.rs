//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PaginationError;
use crate::domain::api_keys::{ApiKeyRecord, ApiScope};
use crate::domain::entities::{
    EquipmentRecord, ExerciseBaseRecord, ExerciseRecord, LanguageRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateEquipmentParams {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct UpdateEquipmentParams {
    pub id: i64,
    pub name: String,
}

#[async_trait]
pub trait EquipmentRepo: Send + Sync {
    async fn count_equipment(&self) -> Result<u64, RepoError>;

    /// Equipment ordered by name, then id.
    async fn list_equipment(&self, limit: u64, offset: u64)
    -> Result<Vec<EquipmentRecord>, RepoError>;

    async fn find_equipment(&self, id: i64) -> Result<Option<EquipmentRecord>, RepoError>;

    /// Subset of `ids` that exist.
    async fn existing_equipment_ids(&self, ids: &[i64]) -> Result<Vec<i64>, RepoError>;
}

#[async_trait]
pub trait EquipmentWriteRepo: Send + Sync {
    async fn create_equipment(
        &self,
        params: CreateEquipmentParams,
    ) -> Result<EquipmentRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when the row does not exist.
    async fn update_equipment(
        &self,
        params: UpdateEquipmentParams,
    ) -> Result<EquipmentRecord, RepoError>;

    /// Removes the row and every exercise-base association pointing at it.
    async fn delete_equipment(&self, id: i64) -> Result<EquipmentRecord, RepoError>;
}

/// An exercise translation together with its base's equipment set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseWithEquipment {
    pub exercise: ExerciseRecord,
    pub equipment_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct UpdateExerciseParams {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// Equipment set of an exercise base before and after a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentAssociationChange {
    pub base: ExerciseBaseRecord,
    pub previous_equipment_ids: Vec<i64>,
}

impl EquipmentAssociationChange {
    /// Equipment ids present on either side of the change.
    pub fn touched_equipment_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .previous_equipment_ids
            .iter()
            .chain(self.base.equipment_ids.iter())
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[async_trait]
pub trait ExercisesRepo: Send + Sync {
    async fn find_exercise(&self, id: i64) -> Result<Option<ExerciseRecord>, RepoError>;

    async fn find_exercise_base(&self, id: i64) -> Result<Option<ExerciseBaseRecord>, RepoError>;

    /// Every exercise in `language_id` whose base references at least one
    /// piece of equipment, ordered by name.
    async fn list_exercises_with_equipment(
        &self,
        language_id: i64,
    ) -> Result<Vec<ExerciseWithEquipment>, RepoError>;
}

#[async_trait]
pub trait ExercisesWriteRepo: Send + Sync {
    async fn update_exercise(&self, params: UpdateExerciseParams)
    -> Result<ExerciseRecord, RepoError>;

    /// Replace the base's equipment set atomically.
    async fn replace_base_equipment(
        &self,
        base_id: i64,
        equipment_ids: &[i64],
    ) -> Result<EquipmentAssociationChange, RepoError>;
}

#[async_trait]
pub trait LanguagesRepo: Send + Sync {
    async fn list_languages(&self) -> Result<Vec<LanguageRecord>, RepoError>;

    async fn find_language_by_short_name(
        &self,
        short_name: &str,
    ) -> Result<Option<LanguageRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateApiKeyParams {
    pub name: String,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub scopes: Vec<ApiScope>,
    pub expires_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait ApiKeysRepo: Send + Sync {
    async fn create_key(&self, params: CreateApiKeyParams) -> Result<ApiKeyRecord, RepoError>;
    async fn list_keys(&self) -> Result<Vec<ApiKeyRecord>, RepoError>;
    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<ApiKeyRecord>, RepoError>;
    async fn revoke_key(&self, id: Uuid, revoked_at: OffsetDateTime)
    -> Result<ApiKeyRecord, RepoError>;
    async fn update_last_used(&self, id: Uuid, when: OffsetDateTime) -> Result<(), RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}

/// Catalogue contents loaded from a fixture file. Ids are explicit so that
/// fixtures can reference each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FixtureData {
    pub languages: Vec<LanguageFixture>,
    pub equipment: Vec<EquipmentFixture>,
    pub exercise_bases: Vec<ExerciseBaseFixture>,
    pub exercises: Vec<ExerciseFixture>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LanguageFixture {
    pub id: i64,
    pub short_name: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EquipmentFixture {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExerciseBaseFixture {
    pub id: i64,
    #[serde(default)]
    pub equipment: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExerciseFixture {
    pub id: i64,
    pub exercise_base: i64,
    pub language: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[async_trait]
pub trait FixtureRepo: Send + Sync {
    /// Upsert every row of `data` in a single transaction.
    async fn load_fixture(&self, data: &FixtureData) -> Result<(), RepoError>;
}
