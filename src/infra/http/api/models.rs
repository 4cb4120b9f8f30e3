use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::application::pagination::OffsetPage;
use crate::domain::entities::{EquipmentRecord, ExerciseBaseRecord, ExerciseRecord};

#[derive(Debug, Serialize)]
pub struct EquipmentResponse {
    pub id: i64,
    pub name: String,
}

impl From<EquipmentRecord> for EquipmentResponse {
    fn from(record: EquipmentRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
        }
    }
}

/// Limit/offset envelope: `{count, next, previous, results}`.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn from_page<R>(path: &str, page: OffsetPage<R>) -> Self
    where
        T: From<R>,
    {
        let next = page
            .next_offset()
            .map(|offset| page_link(path, page.limit, offset));
        let previous = page
            .previous_offset()
            .map(|offset| page_link(path, page.limit, offset));
        Self {
            count: page.count,
            next,
            previous,
            results: page.items.into_iter().map(T::from).collect(),
        }
    }
}

fn page_link(path: &str, limit: u64, offset: u64) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("limit", &limit.to_string());
    if offset > 0 {
        query.append_pair("offset", &offset.to_string());
    }
    format!("{path}?{}", query.finish())
}

#[derive(Debug, Serialize)]
pub struct ExerciseResponse {
    pub id: i64,
    pub exercise_base: i64,
    pub language: i64,
    pub name: String,
    pub description: String,
}

impl From<ExerciseRecord> for ExerciseResponse {
    fn from(record: ExerciseRecord) -> Self {
        Self {
            id: record.id,
            exercise_base: record.exercise_base_id,
            language: record.language_id,
            name: record.name,
            description: record.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExerciseBaseResponse {
    pub id: i64,
    pub equipment: Vec<i64>,
}

impl From<ExerciseBaseRecord> for ExerciseBaseResponse {
    fn from(record: ExerciseBaseRecord) -> Self {
        Self {
            id: record.id,
            equipment: record.equipment_ids,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ExercisePatchRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EquipmentSetRequest {
    pub equipment: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(count: u64, limit: u64, offset: u64) -> OffsetPage<EquipmentRecord> {
        OffsetPage {
            count,
            limit,
            offset,
            items: Vec::new(),
        }
    }

    #[test]
    fn first_page_links_forward_only() {
        let list: ListResponse<EquipmentResponse> =
            ListResponse::from_page("/api/v2/equipment/", page(53, 20, 0));
        assert_eq!(list.next.as_deref(), Some("/api/v2/equipment/?limit=20&offset=20"));
        assert_eq!(list.previous, None);
    }

    #[test]
    fn previous_link_to_first_page_drops_offset() {
        let list: ListResponse<EquipmentResponse> =
            ListResponse::from_page("/api/v2/equipment/", page(53, 20, 20));
        assert_eq!(list.previous.as_deref(), Some("/api/v2/equipment/?limit=20"));
        assert_eq!(list.next.as_deref(), Some("/api/v2/equipment/?limit=20&offset=40"));
    }
}
