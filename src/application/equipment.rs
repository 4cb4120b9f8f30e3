use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::pagination::{
    NumberedPage, OffsetPage, PageSelector, PaginationError, Paginator,
};
use crate::application::repos::{
    CreateEquipmentParams, EquipmentRepo, EquipmentWriteRepo, RepoError, UpdateEquipmentParams,
};
use crate::cache::{CacheTrigger, EntityKey, ObjectStore, deps};
use crate::domain::entities::EquipmentRecord;
use crate::domain::equipment::normalize_equipment_name;
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum EquipmentError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("equipment {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<DomainError> for EquipmentError {
    fn from(err: DomainError) -> Self {
        Self::Validation {
            field: err.field(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateEquipmentCommand {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct UpdateEquipmentCommand {
    pub id: i64,
    pub name: String,
}

#[derive(Clone)]
pub struct EquipmentService {
    reader: Arc<dyn EquipmentRepo>,
    writer: Arc<dyn EquipmentWriteRepo>,
    paginator: Paginator,
    cache: Option<Arc<ObjectStore>>,
    cache_trigger: Option<Arc<CacheTrigger>>,
}

impl EquipmentService {
    pub fn new(
        reader: Arc<dyn EquipmentRepo>,
        writer: Arc<dyn EquipmentWriteRepo>,
        paginator: Paginator,
    ) -> Self {
        Self {
            reader,
            writer,
            paginator,
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

    pub fn paginator(&self) -> Paginator {
        self.paginator
    }

    /// One page of the equipment list, ordered by name.
    pub async fn list_page(
        &self,
        selector: PageSelector,
    ) -> Result<NumberedPage<EquipmentRecord>, EquipmentError> {
        deps::record(EntityKey::EquipmentIndex);
        let total = self.reader.count_equipment().await?;
        let window = self.paginator.resolve(selector, total)?;
        let items = self
            .reader
            .list_equipment(window.limit, window.offset)
            .await?;
        Ok(NumberedPage::new(items, window, total))
    }

    /// Limit/offset slice for the JSON API. Out-of-range offsets yield an
    /// empty slice.
    pub async fn list_window(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<OffsetPage<EquipmentRecord>, EquipmentError> {
        deps::record(EntityKey::EquipmentIndex);
        let count = self.reader.count_equipment().await?;
        let items = if offset >= count {
            Vec::new()
        } else {
            self.reader.list_equipment(limit, offset).await?
        };
        Ok(OffsetPage {
            count,
            limit,
            offset,
            items,
        })
    }

    pub async fn find(&self, id: i64) -> Result<Option<EquipmentRecord>, EquipmentError> {
        deps::record(EntityKey::Equipment(id));
        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get_equipment(id)) {
            return Ok(Some(cached));
        }

        let found = self.reader.find_equipment(id).await?;
        if let (Some(cache), Some(equipment)) = (&self.cache, &found) {
            cache.set_equipment(equipment.clone());
        }
        Ok(found)
    }

    pub async fn get(&self, id: i64) -> Result<EquipmentRecord, EquipmentError> {
        self.find(id).await?.ok_or(EquipmentError::NotFound(id))
    }

    pub async fn create(
        &self,
        command: CreateEquipmentCommand,
    ) -> Result<EquipmentRecord, EquipmentError> {
        let name = normalize_equipment_name(&command.name)?;
        let equipment = self
            .writer
            .create_equipment(CreateEquipmentParams { name })
            .await?;

        info!(equipment_id = equipment.id, name = %equipment.name, "equipment created");
        if let Some(trigger) = &self.cache_trigger {
            trigger.equipment_upserted(equipment.id).await;
        }
        Ok(equipment)
    }

    pub async fn update(
        &self,
        command: UpdateEquipmentCommand,
    ) -> Result<EquipmentRecord, EquipmentError> {
        let name = normalize_equipment_name(&command.name)?;
        let equipment = self
            .writer
            .update_equipment(UpdateEquipmentParams {
                id: command.id,
                name,
            })
            .await
            .map_err(|err| not_found_or(err, command.id))?;

        info!(equipment_id = equipment.id, name = %equipment.name, "equipment updated");
        if let Some(trigger) = &self.cache_trigger {
            trigger.equipment_upserted(equipment.id).await;
        }
        Ok(equipment)
    }

    pub async fn delete(&self, id: i64) -> Result<EquipmentRecord, EquipmentError> {
        let equipment = self
            .writer
            .delete_equipment(id)
            .await
            .map_err(|err| not_found_or(err, id))?;

        info!(equipment_id = id, name = %equipment.name, "equipment deleted");
        if let Some(trigger) = &self.cache_trigger {
            trigger.equipment_deleted(id).await;
        }
        Ok(equipment)
    }
}

fn not_found_or(err: RepoError, id: i64) -> EquipmentError {
    match err {
        RepoError::NotFound => EquipmentError::NotFound(id),
        other => EquipmentError::Repo(other),
    }
}
