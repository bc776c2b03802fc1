//! Student progress per (user, course): the last visited module and the set
//! of completed modules, kept in an expiring key-value store.

mod ids;
pub use ids::{CourseId, ModuleId, UserId};

mod keys;
pub use keys::{DEFAULT_PREFIX, ProgressKeys};

mod tracker;
pub use tracker::{DEFAULT_RETENTION, ProgressSnapshot, ProgressTracker, completion_percentage};
