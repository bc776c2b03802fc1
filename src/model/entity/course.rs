use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::model::access::HasStudents;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, Repository, error::DatabaseResult};
use crate::progress::{CourseId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Course {
    id: CourseId,
    title: String,
    overview: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CourseCreate {
    pub title: String,
    pub overview: String,
}

impl ResourceTyped for Course {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Course
    }
}

impl Course {
    pub fn id(&self) -> CourseId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn overview(&self) -> &str {
        &self.overview
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }
}

#[async_trait]
impl Repository<Course, CourseCreate, CourseId> for Course {
    async fn create(mm: &ModelManager, data: CourseCreate) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            "INSERT INTO courses (title, overview) VALUES ($1, $2) RETURNING id, title, overview, created_at",
        )
        .bind(&data.title)
        .bind(&data.overview)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    async fn find_by_id(mm: &ModelManager, id: CourseId) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;

        Ok(result)
    }

    async fn list(mm: &ModelManager, limit: i64, offset: i64) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM courses ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

// Enrollment

impl Course {
    /// Returns `false` when the user was already enrolled.
    pub async fn enroll(&self, mm: &ModelManager, user: UserId) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "INSERT INTO course_students (course_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(self.id)
        .bind(user)
        .execute(mm.executor())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Courses the user is enrolled in, newest first.
    pub async fn enrolled_for(mm: &ModelManager, user: UserId) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT c.id, c.title, c.overview, c.created_at
            FROM courses c
            JOIN course_students cs ON cs.course_id = c.id
            WHERE cs.user_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(user)
        .fetch_all(mm.executor())
        .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasStudents for Course {
    async fn has_student(&self, mm: &ModelManager, user: UserId) -> DatabaseResult<bool> {
        let result: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM course_students WHERE course_id = $1 AND user_id = $2)",
        )
        .bind(self.id)
        .bind(user)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }
}
