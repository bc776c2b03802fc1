use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, Repository, error::DatabaseResult};
use crate::progress::{CourseId, ModuleId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Module {
    id: ModuleId,
    course_id: CourseId,
    title: String,
    description: String,
    order_index: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ModuleCreate {
    pub course_id: CourseId,
    pub title: String,
    pub description: String,
    /// Appended after the last module of the course when absent.
    pub order_index: Option<i32>,
}

impl ResourceTyped for Module {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Module
    }
}

impl Module {
    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }
}

#[async_trait]
impl Repository<Module, ModuleCreate, ModuleId> for Module {
    async fn create(mm: &ModelManager, data: ModuleCreate) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            r#"
            INSERT INTO modules (course_id, title, description, order_index)
            VALUES (
                $1, $2, $3,
                COALESCE($4, (SELECT COALESCE(MAX(order_index) + 1, 0) FROM modules WHERE course_id = $1))
            )
            RETURNING id, course_id, title, description, order_index
            "#,
        )
        .bind(data.course_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.order_index)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    async fn find_by_id(mm: &ModelManager, id: ModuleId) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM modules WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;

        Ok(result)
    }

    async fn list(mm: &ModelManager, limit: i64, offset: i64) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM modules ORDER BY course_id, order_index LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM modules")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl Module {
    /// Modules of a course in reading order.
    pub async fn for_course(mm: &ModelManager, course: CourseId) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM modules WHERE course_id = $1 ORDER BY order_index, id")
            .bind(course)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn first_in_course(mm: &ModelManager, course: CourseId) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM modules WHERE course_id = $1 ORDER BY order_index, id LIMIT 1",
        )
        .bind(course)
        .fetch_optional(mm.executor())
        .await?;
        Ok(result)
    }

    /// `None` when the module does not exist or belongs to another course.
    pub async fn find_in_course(
        mm: &ModelManager,
        course: CourseId,
        id: ModuleId,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM modules WHERE id = $1 AND course_id = $2")
            .bind(id)
            .bind(course)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn count_for_course(mm: &ModelManager, course: CourseId) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM modules WHERE course_id = $1")
            .bind(course)
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

/// Previous and next module around `current` in an ordered module list.
pub fn neighbours(modules: &[Module], current: ModuleId) -> (Option<ModuleId>, Option<ModuleId>) {
    let Some(pos) = modules.iter().position(|m| m.id == current) else {
        return (None, None);
    };
    let prev = pos.checked_sub(1).map(|i| modules[i].id);
    let next = modules.get(pos + 1).map(|m| m.id);
    (prev, next)
}

#[cfg(test)]
mod test {
    use super::*;

    fn module(id: i64, order: i32) -> Module {
        Module {
            id: ModuleId::new(id),
            course_id: CourseId::new(1),
            title: format!("Module {id}"),
            description: String::new(),
            order_index: order,
        }
    }

    #[test]
    fn neighbours_in_the_middle() {
        let modules = vec![module(4, 0), module(9, 1), module(2, 2)];
        assert_eq!(
            neighbours(&modules, ModuleId::new(9)),
            (Some(ModuleId::new(4)), Some(ModuleId::new(2)))
        );
    }

    #[test]
    fn neighbours_at_the_edges() {
        let modules = vec![module(4, 0), module(9, 1)];
        assert_eq!(neighbours(&modules, ModuleId::new(4)), (None, Some(ModuleId::new(9))));
        assert_eq!(neighbours(&modules, ModuleId::new(9)), (Some(ModuleId::new(4)), None));
        assert_eq!(neighbours(&modules, ModuleId::new(77)), (None, None));
    }
}
