use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub struct TokenAuthModifier;

impl Modify for TokenAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "SID",
                    "JWT token for current user",
                ))),
            );
            schema.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::routes::progress::progress_all_handler,
        crate::web::routes::progress::progress_get_handler,
        crate::web::routes::progress::progress_update_handler,
        crate::web::routes::courses::course_enroll_handler,
        crate::web::routes::courses::course_resume_handler,
        crate::web::routes::courses::module_get_handler,
        crate::web::routes::health::health_handler,
    ),
    modifiers(&TokenAuthModifier),
    tags(
        (name = "progress", description = "Per-course student progress"),
        (name = "courses", description = "Enrollment and module navigation"),
    )
)]
pub struct ApiDoc;
