use std::collections::BTreeMap;
use std::sync::Arc;

use askama::Template;
use axum::http::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::application::error::HttpError;
use crate::application::repos::{EquipmentRepo, ExercisesRepo, RepoError};
use crate::cache::{EntityKey, FragmentCache, FragmentKey, deps};
use crate::domain::entities::LanguageRecord;
use crate::presentation::views::{
    EquipmentOverviewFragmentTemplate, EquipmentOverviewView, OverviewEquipmentView,
    OverviewExerciseView,
};

const SOURCE: &str = "application::overview::EquipmentOverviewService";

pub const EQUIPMENT_OVERVIEW_FRAGMENT: &str = "equipment-overview";

/// Cache key of the overview fragment for one language.
pub fn fragment_key(language_id: i64) -> FragmentKey {
    FragmentKey::new(EQUIPMENT_OVERVIEW_FRAGMENT, [language_id])
}

#[derive(Debug, Error)]
pub enum OverviewError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to render overview fragment: {0}")]
    Render(#[from] askama::Error),
}

impl From<OverviewError> for HttpError {
    fn from(err: OverviewError) -> Self {
        HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load equipment overview",
            &err,
        )
    }
}

/// Equipment grouped with the exercises that use it, per language.
#[derive(Clone)]
pub struct EquipmentOverviewService {
    equipment: Arc<dyn EquipmentRepo>,
    exercises: Arc<dyn ExercisesRepo>,
    fragments: FragmentCache,
    show_shariff: bool,
}

impl EquipmentOverviewService {
    pub fn new(
        equipment: Arc<dyn EquipmentRepo>,
        exercises: Arc<dyn ExercisesRepo>,
        fragments: FragmentCache,
    ) -> Self {
        Self {
            equipment,
            exercises,
            fragments,
            show_shariff: true,
        }
    }

    pub fn with_shariff(mut self, show_shariff: bool) -> Self {
        self.show_shariff = show_shariff;
        self
    }

    pub fn fragments(&self) -> &FragmentCache {
        &self.fragments
    }

    pub async fn load_view(
        &self,
        language: &LanguageRecord,
    ) -> Result<EquipmentOverviewView, OverviewError> {
        let fragment_html = self.render_fragment(language).await?;
        Ok(EquipmentOverviewView {
            fragment_html,
            show_shariff: self.show_shariff,
        })
    }

    /// The cached overview fragment for `language`, rendered on a miss.
    pub async fn render_fragment(&self, language: &LanguageRecord) -> Result<String, OverviewError> {
        let key = fragment_key(language.id);
        self.fragments
            .get_or_render(key, self.render_uncached(language))
            .await
    }

    async fn render_uncached(&self, language: &LanguageRecord) -> Result<String, OverviewError> {
        let equipment = self.load_groups(language.id).await?;
        debug!(
            language = %language.short_name,
            equipment_count = equipment.len(),
            "rendering equipment overview"
        );
        let html = EquipmentOverviewFragmentTemplate {
            language_code: language.short_name.clone(),
            equipment,
        }
        .render()?;
        Ok(html)
    }

    async fn load_groups(&self, language_id: i64) -> Result<Vec<OverviewEquipmentView>, OverviewError> {
        deps::record(EntityKey::EquipmentIndex);
        deps::record(EntityKey::ExerciseIndex);

        let total = self.equipment.count_equipment().await?;
        let equipment = self.equipment.list_equipment(total, 0).await?;
        let exercises = self.exercises.list_exercises_with_equipment(language_id).await?;

        let mut by_equipment: BTreeMap<i64, Vec<OverviewExerciseView>> = BTreeMap::new();
        for entry in exercises {
            deps::record(EntityKey::Exercise(entry.exercise.id));
            deps::record(EntityKey::ExerciseBase(entry.exercise.exercise_base_id));
            for equipment_id in entry.equipment_ids {
                by_equipment
                    .entry(equipment_id)
                    .or_default()
                    .push(OverviewExerciseView {
                        id: entry.exercise.id,
                        name: entry.exercise.name.clone(),
                    });
            }
        }

        Ok(equipment
            .into_iter()
            .map(|item| {
                deps::record(EntityKey::Equipment(item.id));
                let mut exercises = by_equipment.remove(&item.id).unwrap_or_default();
                exercises.sort_by(|a, b| a.name.cmp(&b.name));
                OverviewEquipmentView {
                    id: item.id,
                    name: item.name,
                    exercises,
                }
            })
            .collect())
    }
}
