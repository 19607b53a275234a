use std::path::PathBuf;

use events::EventBus;
use orchestrator::{DemoOrchestrator, OrchestratorConfig};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: DemoOrchestrator,
    pub event_bus: EventBus,
    /// Built frontend served for paths no route matches
    pub app_dir: Option<PathBuf>,
}

impl AppState {
    /// State backed by the simulated collaborator suite.
    pub fn new(config: OrchestratorConfig) -> Self {
        Self::with_orchestrator(DemoOrchestrator::new(config, EventBus::new()))
    }

    pub fn with_orchestrator(orchestrator: DemoOrchestrator) -> Self {
        Self {
            event_bus: orchestrator.event_bus().clone(),
            orchestrator,
            app_dir: None,
        }
    }

    pub fn with_app_dir(mut self, app_dir: PathBuf) -> Self {
        self.app_dir = Some(app_dir);
        self
    }
}
