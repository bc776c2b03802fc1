use crate::model::{ModelManager, error::DatabaseResult};

#[derive(Debug, Clone)]
pub enum ResourceType {
    Course,
    Module,
    Enrollment,
    StudentProgress,
}

pub trait ResourceTyped {
    fn get_resource_type() -> ResourceType;
}

/// Reads and inserts shared by the course catalogue entities. Updates and
/// deletes belong to the platform that owns the catalogue.
#[async_trait::async_trait]
pub trait Repository<T, Create, V>
where
    T: ResourceTyped,
    V: Clone + Copy,
{
    async fn create(mm: &ModelManager, data: Create) -> DatabaseResult<T>;

    async fn find_by_id(mm: &ModelManager, id: V) -> DatabaseResult<Option<T>>;

    async fn list(mm: &ModelManager, limit: i64, offset: i64) -> DatabaseResult<Vec<T>>;

    async fn count(mm: &ModelManager) -> DatabaseResult<i64>;
}
