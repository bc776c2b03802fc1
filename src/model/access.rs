use crate::{
    model::{
        ModelManager,
        error::{DatabaseError, DatabaseResult},
    },
    progress::UserId,
    web::{AuthenticatedUser, UserRole},
};

/// Resources whose members are allowed to see progress on them.
#[async_trait::async_trait]
pub trait HasStudents {
    async fn has_student(&self, mm: &ModelManager, user: UserId) -> DatabaseResult<bool>;
}

/// Enrollment gate for progress reads and writes. Progress itself is never
/// used to decide access.
pub async fn check_enrollment<T: HasStudents + Sync>(
    mm: &ModelManager,
    ctx: &AuthenticatedUser,
    resource: &T,
) -> DatabaseResult<()> {
    // admin can see everyone's progress
    if ctx.user_role() == UserRole::Admin {
        return Ok(());
    }

    if resource.has_student(mm, ctx.user_id()).await? {
        Ok(())
    } else {
        Err(DatabaseError::Forbidden)
    }
}
