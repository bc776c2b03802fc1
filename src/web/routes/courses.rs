use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};

use super::{fetch_course, fetch_enrolled_course};
use crate::{
    model::{
        ResourceTyped,
        entity::{Course, Module, neighbours},
    },
    progress::{CourseId, ModuleId, completion_percentage},
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::courses::{EnrollResponse, ModuleDetailResponse, ModuleProgress, ResumeResponse},
        dto::progress::UpdateStatus,
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let tracked = Router::new()
        .route(
            "/api/v1/courses/{course_id}/modules/{module_id}",
            get(module_get_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::track_module_view_fn,
        ));

    Router::new()
        .route("/api/v1/courses/{course_id}/enroll", post(course_enroll_handler))
        .route("/api/v1/courses/{course_id}/resume", get(course_resume_handler))
        .merge(tracked)
        .route_layer(middleware::from_fn(middlewares::extract_context_fn))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/enroll",
    description = "Enroll the current user; progress starts at the first module of the course",
    params(
        ("course_id" = i64, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Enrolled", body = EnrollResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
async fn course_enroll_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = fetch_course(&state, course_id).await?;

    let newly_enrolled = course
        .enroll(state.pool(), user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    let first = Module::first_in_course(state.pool(), course.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    // re-enrolling does not throw away where the user already is
    let mut stored = true;
    let last_module = match (&first, newly_enrolled) {
        (Some(first), true) => {
            stored = state
                .tracker()
                .set_last_module(user.user_id(), course.id(), first.id())
                .await;
            Some(first.id())
        }
        (Some(first), false) => Some(
            state
                .tracker()
                .get_last_module(user.user_id(), course.id())
                .await
                .unwrap_or(first.id()),
        ),
        (None, _) => None,
    };

    tracing::info!(
        "user {} enrolled in course {} (new: {newly_enrolled})",
        user.user_id(),
        course.id()
    );

    let res = EnrollResponse {
        course_id: course.id(),
        enrolled: true,
        newly_enrolled,
        last_module,
        status: if stored {
            UpdateStatus::Success
        } else {
            UpdateStatus::Degraded
        },
    };

    Ok((StatusCode::OK, Json(res)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/resume",
    description = "Module the current user should continue with",
    params(
        ("course_id" = i64, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Module to resume at", body = ResumeResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
async fn course_resume_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = fetch_enrolled_course(&state, user, course_id).await?;

    let stored = state
        .tracker()
        .get_last_module(user.user_id(), course.id())
        .await;

    // the stored pointer is only trusted while the module is still part of the course
    let resumed = match stored {
        Some(module_id) => Module::find_in_course(state.pool(), course.id(), module_id)
            .await
            .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?,
        None => None,
    };

    let res = match resumed {
        Some(module) => ResumeResponse {
            course_id: course.id(),
            module_id: Some(module.id()),
            resumed: true,
        },
        None => {
            let first = Module::first_in_course(state.pool(), course.id())
                .await
                .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;
            ResumeResponse {
                course_id: course.id(),
                module_id: first.map(|m| m.id()),
                resumed: false,
            }
        }
    };

    Ok((StatusCode::OK, Json(res)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/modules/{module_id}",
    description = "Module with the current user's progress. Viewing a module makes it the user's last module",
    params(
        ("course_id" = i64, Path, description = "ID of the course"),
        ("module_id" = i64, Path, description = "ID of the module")
    ),
    responses(
        (status = 200, description = "Module found", body = ModuleDetailResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Course or module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
async fn module_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((course_id, module_id)): Path<(CourseId, ModuleId)>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = fetch_enrolled_course(&state, user, course_id).await?;

    let modules = Module::for_course(state.pool(), course.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;
    let module = modules
        .iter()
        .find(|m| m.id() == module_id)
        .ok_or_else(|| WebError::resource_not_found(Module::get_resource_type()))?;

    let total = modules.len() as i64;
    let completed = state
        .tracker()
        .get_completed_modules(user.user_id(), course.id())
        .await;

    let progress = ModuleProgress {
        is_completed: completed.contains(&module.id()),
        course_progress_percentage: completion_percentage(completed.len(), total),
        completed_modules_count: completed.len(),
        total_modules: total,
    };
    let (previous, next) = neighbours(&modules, module.id());

    Ok((
        StatusCode::OK,
        Json(ModuleDetailResponse::new(module, previous, next, progress)),
    ))
}
