//! Equipment and exercise field rules.

use super::error::DomainError;

pub const EQUIPMENT_NAME_MAX_CHARS: usize = 50;
pub const EXERCISE_NAME_MAX_CHARS: usize = 200;

/// Trim and validate an equipment name.
pub fn normalize_equipment_name(raw: &str) -> Result<String, DomainError> {
    normalize_required("name", raw, EQUIPMENT_NAME_MAX_CHARS)
}

/// Trim and validate an exercise name.
pub fn normalize_exercise_name(raw: &str) -> Result<String, DomainError> {
    normalize_required("name", raw, EXERCISE_NAME_MAX_CHARS)
}

fn normalize_required(
    field: &'static str,
    raw: &str,
    max_chars: usize,
) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Required { field });
    }
    let chars = trimmed.chars().count();
    if chars > max_chars {
        return Err(DomainError::TooLong {
            field,
            max: max_chars,
            actual: chars,
        });
    }
    Ok(trimmed.to_string())
}

/// Sort and deduplicate a set of equipment ids.
pub fn normalize_equipment_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}
