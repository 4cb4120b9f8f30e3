use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{FixtureData, FixtureRepo, RepoError};
use crate::cache::{CacheTrigger, EventKind};
use crate::domain::equipment::{normalize_equipment_name, normalize_exercise_name};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fixture: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid fixture: {0}")]
    Invalid(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Summary of a loaded fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureSummary {
    pub languages: usize,
    pub equipment: usize,
    pub exercise_bases: usize,
    pub exercises: usize,
}

pub fn parse_fixture(raw: &str) -> Result<FixtureData, FixtureError> {
    let data: FixtureData = toml::from_str(raw)?;
    validate_fixture(&data)?;
    Ok(data)
}

/// Cross-reference checks the database would otherwise report as
/// constraint violations.
pub fn validate_fixture(data: &FixtureData) -> Result<(), FixtureError> {
    let languages = unique_ids("language", data.languages.iter().map(|l| l.id))?;
    let equipment = unique_ids("equipment", data.equipment.iter().map(|e| e.id))?;
    let bases = unique_ids("exercise base", data.exercise_bases.iter().map(|b| b.id))?;
    unique_ids("exercise", data.exercises.iter().map(|e| e.id))?;

    for item in &data.equipment {
        normalize_equipment_name(&item.name)
            .map_err(|err| FixtureError::Invalid(format!("equipment {}: {err}", item.id)))?;
    }

    for base in &data.exercise_bases {
        if let Some(missing) = base.equipment.iter().find(|id| !equipment.contains(id)) {
            return Err(FixtureError::Invalid(format!(
                "exercise base {} references unknown equipment {missing}",
                base.id
            )));
        }
    }

    for exercise in &data.exercises {
        if !bases.contains(&exercise.exercise_base) {
            return Err(FixtureError::Invalid(format!(
                "exercise {} references unknown exercise base {}",
                exercise.id, exercise.exercise_base
            )));
        }
        if !languages.contains(&exercise.language) {
            return Err(FixtureError::Invalid(format!(
                "exercise {} references unknown language {}",
                exercise.id, exercise.language
            )));
        }
        normalize_exercise_name(&exercise.name)
            .map_err(|err| FixtureError::Invalid(format!("exercise {}: {err}", exercise.id)))?;
    }

    Ok(())
}

fn unique_ids(
    kind: &str,
    ids: impl Iterator<Item = i64>,
) -> Result<HashSet<i64>, FixtureError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(FixtureError::Invalid(format!("duplicate {kind} id {id}")));
        }
    }
    Ok(seen)
}

#[derive(Clone)]
pub struct FixtureService {
    repo: Arc<dyn FixtureRepo>,
    cache_trigger: Option<Arc<CacheTrigger>>,
}

impl FixtureService {
    pub fn new(repo: Arc<dyn FixtureRepo>) -> Self {
        Self {
            repo,
            cache_trigger: None,
        }
    }

    pub fn with_cache_trigger_opt(mut self, cache_trigger: Option<Arc<CacheTrigger>>) -> Self {
        self.cache_trigger = cache_trigger;
        self
    }

    pub async fn load_file(&self, path: &Path) -> Result<FixtureSummary, FixtureError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FixtureError::Read {
                path: path.display().to_string(),
                source,
            })?;
        let data = parse_fixture(&raw)?;
        self.load(&data).await
    }

    pub async fn load(&self, data: &FixtureData) -> Result<FixtureSummary, FixtureError> {
        validate_fixture(data)?;
        self.repo.load_fixture(data).await?;

        let summary = FixtureSummary {
            languages: data.languages.len(),
            equipment: data.equipment.len(),
            exercise_bases: data.exercise_bases.len(),
            exercises: data.exercises.len(),
        };
        info!(
            languages = summary.languages,
            equipment = summary.equipment,
            exercise_bases = summary.exercise_bases,
            exercises = summary.exercises,
            "fixture loaded"
        );

        if let Some(trigger) = &self.cache_trigger {
            for item in &data.equipment {
                trigger
                    .trigger(EventKind::EquipmentUpserted { equipment_id: item.id }, false)
                    .await;
            }
            for exercise in &data.exercises {
                trigger
                    .trigger(
                        EventKind::ExerciseUpdated {
                            exercise_id: exercise.id,
                            exercise_base_id: exercise.exercise_base,
                        },
                        false,
                    )
                    .await;
            }
            trigger.consumer().consume().await;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[languages]]
id = 2
short_name = "en"
full_name = "English"

[[equipment]]
id = 1
name = "Dumbbells"

[[exercise_bases]]
id = 1
equipment = [1]

[[exercises]]
id = 2
exercise_base = 1
language = 2
name = "Biceps curls"
"#;

    #[test]
    fn parses_valid_fixture() {
        let data = parse_fixture(SAMPLE).expect("valid fixture");
        assert_eq!(data.equipment.len(), 1);
        assert_eq!(data.exercises[0].description, "");
    }

    #[test]
    fn rejects_dangling_equipment_reference() {
        let raw = SAMPLE.replace("equipment = [1]", "equipment = [1, 9]");
        let err = parse_fixture(&raw).expect_err("dangling reference");
        assert!(err.to_string().contains("unknown equipment 9"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let raw = format!("{SAMPLE}\n[[equipment]]\nid = 1\nname = \"Kettlebell\"\n");
        let err = parse_fixture(&raw).expect_err("duplicate id");
        assert!(err.to_string().contains("duplicate equipment id 1"));
    }

    #[test]
    fn rejects_overlong_equipment_name() {
        let raw = SAMPLE.replace("\"Dumbbells\"", &format!("\"{}\"", "x".repeat(51)));
        assert!(matches!(parse_fixture(&raw), Err(FixtureError::Invalid(_))));
    }
}
