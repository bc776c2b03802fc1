use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    Config, auth,
    auth::CryptError,
    web::{RequestContext, UserRole, context::AuthenticatedUser, error::WebError},
};

pub static AUTH_TOKEN: &str = "SID";

/// Token from the `SID` cookie, falling back to an `Authorization: Bearer`
/// header for non-browser clients.
fn find_token(cookies: &Cookies, req: &Request) -> Option<(&'static str, String)> {
    if let Some(cookie) = cookies.get(AUTH_TOKEN) {
        return Some((AUTH_TOKEN, cookie.value().to_string()));
    }

    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| ("Authorization", t.trim().to_string()))
}

pub async fn extract_context_fn(
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let Some((source, token)) = find_token(&cookies, &req) else {
        req.extensions_mut().insert(RequestContext::new(None));
        return Ok(next.run(req).await);
    };

    let secret = Config::get_or_init(false).await.app().jwt();
    let claims = auth::process_token(&token, secret)
        .map_err(|e| WebError::auth_token_invalid(source, CryptError::from(e)))?
        .claims;

    let id = claims
        .user_id()
        .map_err(|e| WebError::auth_token_invalid(source, e))?;
    let role = claims
        .role
        .as_deref()
        .map(UserRole::from)
        .unwrap_or(UserRole::Student);

    tracing::trace!("request by user {id} ({role})");
    req.extensions_mut()
        .insert(RequestContext::new(Some(AuthenticatedUser::new(id, role))));

    Ok(next.run(req).await)
}
