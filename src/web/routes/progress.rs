use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};

use super::fetch_enrolled_course;
use crate::{
    error::log_error,
    model::{
        ResourceTyped,
        entity::{Course, Module, StudentProgress, StudentProgressUpsert},
    },
    progress::CourseId,
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::progress::{
            AllProgressResponse, CourseProgressResponse, CourseProgressSummary,
            ProgressUpdateBody, ProgressUpdateResponse, UpdateStatus,
        },
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/api/v1/progress/", get(progress_all_handler))
        .route(
            "/api/v1/courses/{course_id}/progress/",
            get(progress_get_handler).post(progress_update_handler),
        )
        .route_layer(middleware::from_fn(middlewares::extract_context_fn))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/progress/",
    description = "Progress of the current user in every enrolled course",
    responses(
        (status = 200, description = "Progress collected", body = AllProgressResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
async fn progress_all_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let courses = Course::enrolled_for(state.pool(), user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    let mut summaries = Vec::with_capacity(courses.len());
    for course in &courses {
        let total = Module::count_for_course(state.pool(), course.id())
            .await
            .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;
        let snapshot = state.tracker().snapshot(user.user_id(), course.id(), total).await;
        summaries.push(CourseProgressSummary::new(course, &snapshot));
    }

    Ok((StatusCode::OK, Json(AllProgressResponse { courses: summaries })))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/progress/",
    description = "Progress of the current user in one course",
    params(
        ("course_id" = i64, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Progress found", body = CourseProgressResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
async fn progress_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = fetch_enrolled_course(&state, user, course_id).await?;

    let total = Module::count_for_course(state.pool(), course.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;
    let snapshot = state.tracker().snapshot(user.user_id(), course.id(), total).await;

    Ok((StatusCode::OK, Json(CourseProgressResponse::new(&course, snapshot))))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/progress/",
    description = "Record that the current user is on a module, optionally marking it (un)completed",
    params(
        ("course_id" = i64, Path, description = "ID of the course")
    ),
    request_body = ProgressUpdateBody,
    responses(
        (status = 200, description = "Progress recorded, see `status` for the store outcome", body = ProgressUpdateResponse),
        (status = 400, description = "module_id is missing", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Course or module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = []),
        ("bearer" = [])
    )
)]
async fn progress_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    Json(payload): Json<ProgressUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = fetch_enrolled_course(&state, user, course_id).await?;

    let module_id = payload.module_id.ok_or_else(|| {
        WebError::resource_bad_request(StudentProgress::get_resource_type(), "module_id is required")
    })?;

    let module = Module::find_in_course(state.pool(), course.id(), module_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Module::get_resource_type()))?;

    let tracker = state.tracker();
    let mut stored = tracker
        .set_last_module(user.user_id(), course.id(), module.id())
        .await;
    if let Some(completed) = payload.completed {
        stored &= tracker
            .mark_module_completed(user.user_id(), course.id(), module.id(), completed)
            .await;
    }

    // the durable copy is best effort as well, it never fails the request
    let mirrored = StudentProgress::upsert(
        state.pool(),
        StudentProgressUpsert {
            user_id: user.user_id(),
            course_id: course.id(),
            module_id: module.id(),
            completed: payload.completed,
            time_spent_seconds: payload.time_spent_seconds.unwrap_or(0),
        },
    )
    .await
    .inspect_err(|e| log_error(e))
    .is_ok();

    let res = ProgressUpdateResponse {
        status: if stored {
            UpdateStatus::Success
        } else {
            UpdateStatus::Degraded
        },
        course_id: course.id(),
        module_id: module.id(),
        completed: payload.completed,
        mirrored,
    };

    Ok((StatusCode::OK, Json(res)))
}
