// Application state for HTTP handlers
use crate::application::chart_service::PollingChart;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub charts: Vec<Arc<PollingChart>>,
}

impl AppState {
    pub fn chart(&self, id: &str) -> Option<&Arc<PollingChart>> {
        self.charts.iter().find(|c| c.id() == id)
    }
}
