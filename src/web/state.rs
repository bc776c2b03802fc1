use crate::model::ModelManager;
use crate::progress::ProgressTracker;

#[derive(Debug, Clone)]
pub struct AppState {
    mm: ModelManager,
    tracker: ProgressTracker,
}

impl AppState {
    pub fn new(mm: ModelManager, tracker: ProgressTracker) -> Self {
        Self { mm, tracker }
    }

    pub fn pool(&self) -> &ModelManager {
        &self.mm
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }
}
