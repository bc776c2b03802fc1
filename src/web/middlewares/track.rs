use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    progress::{CourseId, ModuleId},
    web::{AppState, RequestContext},
};

/// Moves the caller's last-module pointer to the module they just viewed.
///
/// Only successful views by authenticated users are recorded, and a failed
/// store write never changes the response.
pub async fn track_module_view_fn(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((course_id, module_id)): Path<(CourseId, ModuleId)>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;

    if let Some(user) = ctx.maybe_user() {
        if response.status().is_success() {
            state
                .tracker()
                .set_last_module(user.user_id(), course_id, module_id)
                .await;
        }
    }

    response
}
