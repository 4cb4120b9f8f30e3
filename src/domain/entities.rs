//! Domain entities mirrored from persistent storage.

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

/// A piece of training equipment (dumbbells, kettlebell, pull-up bar, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipmentRecord {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub created_at: OffsetDateTime,
    #[serde(skip)]
    pub updated_at: OffsetDateTime,
}

impl fmt::Display for EquipmentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageRecord {
    pub id: i64,
    pub short_name: String,
    pub full_name: String,
}

impl fmt::Display for LanguageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// Language-neutral exercise. Owns the equipment association shared by all
/// of its translations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseBaseRecord {
    pub id: i64,
    pub equipment_ids: Vec<i64>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A translation of an exercise base into one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseRecord {
    pub id: i64,
    pub exercise_base_id: i64,
    pub language_id: i64,
    pub name: String,
    pub description: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl fmt::Display for ExerciseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
