use std::sync::Arc;

use crate::application::api_keys::ApiKeyService;
use crate::application::context::ServiceContext;
use crate::application::equipment::EquipmentService;
use crate::application::exercises::ExerciseService;

#[derive(Clone)]
pub struct ApiState {
    pub api_keys: Arc<ApiKeyService>,
    pub equipment: Arc<EquipmentService>,
    pub exercises: Arc<ExerciseService>,
    pub default_limit: u64,
    pub max_limit: u64,
}

impl ApiState {
    pub fn from_context(context: &ServiceContext) -> Self {
        let max_limit = context.api_max_limit.max(1);
        Self {
            api_keys: context.api_keys.clone(),
            equipment: context.equipment.clone(),
            exercises: context.exercises.clone(),
            default_limit: u64::from(context.equipment.paginator().per_page()).min(max_limit),
            max_limit,
        }
    }

    /// Requested page size, defaulted and clamped to `1..=max_limit`.
    pub fn clamp_limit(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }
}
