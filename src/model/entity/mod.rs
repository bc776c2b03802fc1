mod course;
pub use course::{Course, CourseCreate};

mod module;
pub use module::{Module, ModuleCreate, neighbours};

mod student_progress;
pub use student_progress::{StudentProgress, StudentProgressUpsert};
