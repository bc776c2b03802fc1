use crate::{
    model::{Repository, ResourceTyped, check_enrollment, entity::Course},
    progress::CourseId,
    web::{AppState, AuthenticatedUser, WebError, WebResult, doc::ApiDoc},
};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod courses;
pub mod health;
pub mod progress;

pub fn build_app<S: Send + Sync + Clone + 'static>(state: AppState, docs: bool) -> Router<S> {
    let mut router = Router::new()
        .merge(progress::routes(state.clone()))
        .merge(courses::routes(state.clone()))
        .merge(health::routes(state.clone()))
        .layer(CookieManagerLayer::default())
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    if docs {
        let openapi = ApiDoc::openapi();

        router = router.merge(SwaggerUi::new("/api/v1/docs").url("/api-doc/openapi.json", openapi));
    }

    router
}

async fn fetch_course(state: &AppState, id: CourseId) -> WebResult<Course> {
    Course::find_by_id(state.pool(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))
}

/// The course, provided `user` may see progress on it.
async fn fetch_enrolled_course(
    state: &AppState,
    user: &AuthenticatedUser,
    id: CourseId,
) -> WebResult<Course> {
    let course = fetch_course(state, id).await?;
    check_enrollment(state.pool(), user, &course)
        .await
        .map_err(|e| WebError::from_access(Course::get_resource_type(), e))?;
    Ok(course)
}
