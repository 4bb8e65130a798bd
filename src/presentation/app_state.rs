// Application state for HTTP handlers
use tokio::sync::{mpsc, watch};

use crate::application::dashboard_session::{LayerSnapshot, SessionEvent};
use crate::application::live_channel::ConsumptionSwitch;
use crate::domain::telemetry::ConnectionState;
use crate::infrastructure::echarts_renderer::ChartSnapshot;
use crate::infrastructure::memory_map::MapSnapshot;

#[derive(Clone)]
pub struct AppState {
    pub events: mpsc::Sender<SessionEvent>,
    pub consumption: ConsumptionSwitch,
    pub endpoint: String,
    pub connection: watch::Receiver<ConnectionState>,
    pub chart: watch::Receiver<ChartSnapshot>,
    pub map: watch::Receiver<MapSnapshot>,
    pub layers: watch::Receiver<LayerSnapshot>,
}
