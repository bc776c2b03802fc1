use serde::{Deserialize, Serialize};

use crate::{
    model::entity::Module,
    progress::{CourseId, ModuleId},
    web::dto::progress::UpdateStatus,
};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EnrollResponse {
    pub course_id: CourseId,
    pub enrolled: bool,
    /// `false` when the user was already enrolled.
    pub newly_enrolled: bool,
    /// Where progress continues: the course start for a new enrollment.
    pub last_module: Option<ModuleId>,
    /// `degraded` when the starting module could not be stored.
    pub status: UpdateStatus,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ResumeResponse {
    pub course_id: CourseId,
    /// `None` for a course without modules.
    pub module_id: Option<ModuleId>,
    /// `true` when `module_id` came from stored progress rather than the
    /// course start.
    pub resumed: bool,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ModuleProgress {
    pub is_completed: bool,
    pub course_progress_percentage: u8,
    pub completed_modules_count: usize,
    pub total_modules: i64,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ModuleDetailResponse {
    pub id: ModuleId,
    pub course_id: CourseId,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    pub previous_module: Option<ModuleId>,
    pub next_module: Option<ModuleId>,
    pub progress: ModuleProgress,
}

impl ModuleDetailResponse {
    pub fn new(
        module: &Module,
        previous_module: Option<ModuleId>,
        next_module: Option<ModuleId>,
        progress: ModuleProgress,
    ) -> Self {
        Self {
            id: module.id(),
            course_id: module.course_id(),
            title: module.title().to_string(),
            description: module.description().to_string(),
            order_index: module.order_index(),
            previous_module,
            next_module,
            progress,
        }
    }
}
