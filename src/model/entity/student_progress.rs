use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::progress::{CourseId, ModuleId, UserId};

/// Durable, non-expiring copy of a student's progress on one module. Kept for
/// backup and analytics next to the key-value store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct StudentProgress {
    id: i64,
    user_id: UserId,
    course_id: CourseId,
    module_id: ModuleId,
    last_accessed: DateTime<Utc>,
    time_spent_seconds: i32,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    #[schema(value_type = Object)]
    data: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct StudentProgressUpsert {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub module_id: ModuleId,
    /// `None` keeps whatever completion state the row already has.
    pub completed: Option<bool>,
    /// Added to the running total.
    pub time_spent_seconds: i32,
}

impl ResourceTyped for StudentProgress {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::StudentProgress
    }
}

impl StudentProgress {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    pub fn last_accessed(&self) -> &DateTime<Utc> {
        &self.last_accessed
    }

    pub fn time_spent_seconds(&self) -> i32 {
        self.time_spent_seconds
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn completed_at(&self) -> Option<&DateTime<Utc>> {
        self.completed_at.as_ref()
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }
}

impl StudentProgress {
    /// Insert or update the row for (user, course, module).
    ///
    /// `completed_at` is stamped the first time the row becomes completed and
    /// is left alone afterwards, also when completion is withdrawn.
    pub async fn upsert(mm: &ModelManager, data: StudentProgressUpsert) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            r#"
            INSERT INTO student_progress
                (user_id, course_id, module_id, completed, completed_at, time_spent_seconds, last_accessed)
            VALUES (
                $1, $2, $3,
                COALESCE($4::boolean, false),
                CASE WHEN COALESCE($4::boolean, false) THEN now() ELSE NULL END,
                GREATEST($5, 0),
                now()
            )
            ON CONFLICT (user_id, course_id, module_id) DO UPDATE SET
                completed = COALESCE($4::boolean, student_progress.completed),
                completed_at = CASE
                    WHEN COALESCE($4::boolean, student_progress.completed)
                         AND student_progress.completed_at IS NULL THEN now()
                    ELSE student_progress.completed_at
                END,
                time_spent_seconds = student_progress.time_spent_seconds + EXCLUDED.time_spent_seconds,
                last_accessed = now()
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.course_id)
        .bind(data.module_id)
        .bind(data.completed)
        .bind(data.time_spent_seconds)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    /// Mirror rows for one scope, most recently accessed first.
    pub async fn for_scope(
        mm: &ModelManager,
        user: UserId,
        course: CourseId,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM student_progress WHERE user_id = $1 AND course_id = $2 ORDER BY last_accessed DESC",
        )
        .bind(user)
        .bind(course)
        .fetch_all(mm.executor())
        .await?;

        Ok(result)
    }
}
