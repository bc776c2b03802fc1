mod auth;
pub use auth::{AUTH_TOKEN, extract_context_fn};

mod track;
pub use track::track_module_view_fn;
