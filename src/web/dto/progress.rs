use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    model::entity::Course,
    progress::{CourseId, ModuleId, ProgressSnapshot},
};

/// Progress of the current user in one course.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseProgressResponse {
    pub course_id: CourseId,
    pub course_title: String,
    pub last_module: Option<ModuleId>,
    pub completed_modules: Vec<ModuleId>,
    pub progress_percentage: u8,
    pub total_modules: i64,
}

impl CourseProgressResponse {
    pub fn new(course: &Course, snapshot: ProgressSnapshot) -> Self {
        Self {
            course_id: course.id(),
            course_title: course.title().to_string(),
            last_module: snapshot.last_module,
            completed_modules: snapshot.completed_modules.into_iter().collect(),
            progress_percentage: snapshot.percentage,
            total_modules: snapshot.total_modules,
        }
    }

    pub fn completed_set(&self) -> BTreeSet<ModuleId> {
        self.completed_modules.iter().copied().collect()
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseProgressSummary {
    pub course_id: CourseId,
    pub course_title: String,
    pub progress_percentage: u8,
    pub last_module: Option<ModuleId>,
    pub completed_modules_count: usize,
    pub total_modules: i64,
}

impl CourseProgressSummary {
    pub fn new(course: &Course, snapshot: &ProgressSnapshot) -> Self {
        Self {
            course_id: course.id(),
            course_title: course.title().to_string(),
            progress_percentage: snapshot.percentage,
            last_module: snapshot.last_module,
            completed_modules_count: snapshot.completed_modules.len(),
            total_modules: snapshot.total_modules,
        }
    }
}

/// Progress across every course the user is enrolled in.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AllProgressResponse {
    pub courses: Vec<CourseProgressSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProgressUpdateBody {
    /// Module the user is on; required.
    pub module_id: Option<ModuleId>,
    /// `true` marks the module done, `false` withdraws it, absent leaves it.
    #[serde(default)]
    pub completed: Option<bool>,
    /// Seconds spent since the previous update, added to the durable record.
    #[serde(default)]
    pub time_spent_seconds: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    /// Progress reached the key-value store.
    Success,
    /// The key-value store could not be written; see the server log.
    Degraded,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProgressUpdateResponse {
    pub status: UpdateStatus,
    pub course_id: CourseId,
    pub module_id: ModuleId,
    pub completed: Option<bool>,
    /// Whether the durable copy was written.
    pub mirrored: bool,
}
