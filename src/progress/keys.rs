use super::{CourseId, ModuleId, UserId};

pub static DEFAULT_PREFIX: &str = "educa";

/// Key layout shared with every deployment reading the same redis:
///
/// ```text
/// {prefix}:user:{user}:course:{course}:last_module   -> module id
/// {prefix}:user:{user}:course:{course}:completed     -> set of module ids
/// ```
#[derive(Debug, Clone)]
pub struct ProgressKeys {
    prefix: String,
}

impl Default for ProgressKeys {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl ProgressKeys {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn last_module(&self, user: UserId, course: CourseId) -> String {
        format!("{}:last_module", self.scope(user, course))
    }

    pub fn completed(&self, user: UserId, course: CourseId) -> String {
        format!("{}:completed", self.scope(user, course))
    }

    fn scope(&self, user: UserId, course: CourseId) -> String {
        format!("{}:user:{}:course:{}", self.prefix, user, course)
    }
}

pub(crate) fn encode_module(module: ModuleId) -> String {
    module.to_string()
}
