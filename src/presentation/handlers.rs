// HTTP request handlers
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::dashboard_session::{LayerSnapshot, SessionEvent};
use crate::application::ports::PointerEvent;
use crate::domain::layer::{FeatureCollection, IconRef};
use crate::domain::telemetry::{ConnectionState, ConsumptionMode};
use crate::infrastructure::memory_map::MapSnapshot;
use crate::presentation::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct ChannelStatus {
    pub endpoint: String,
    pub state: ConnectionState,
    pub consumption: ConsumptionMode,
}

#[derive(Debug, Serialize)]
pub struct MapView {
    #[serde(flatten)]
    pub map: MapSnapshot,
    pub pending_layers: LayerSnapshot,
}

#[derive(Debug, Serialize)]
pub struct KeyResponse {
    pub handled: bool,
    pub consumption: ConsumptionMode,
}

#[derive(Debug, Deserialize)]
pub struct CreateLayerBody {
    pub icon: IconRef,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current chart option with the last applied batch
pub async fn get_chart(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.chart.borrow().clone())
}

pub async fn get_map(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(MapView {
        map: state.map.borrow().clone(),
        pending_layers: state.layers.borrow().clone(),
    })
}

pub async fn get_channel(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ChannelStatus {
        endpoint: state.endpoint.clone(),
        state: *state.connection.borrow(),
        consumption: state.consumption.mode(),
    })
}

/// Key press from the page; only the toggle key has an effect
pub async fn press_key(
    Path(code): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let handled = state.consumption.handle_key(&code);
    if let Some(mode) = handled {
        tracing::info!("Live consumption is now {:?}", mode);
    }
    Json(KeyResponse {
        handled: handled.is_some(),
        consumption: state.consumption.mode(),
    })
}

pub async fn pointer_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<PointerEvent>,
) -> StatusCode {
    forward(&state, SessionEvent::Pointer(event)).await
}

pub async fn create_layer(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateLayerBody>,
) -> StatusCode {
    forward(&state, SessionEvent::CreateLayer { name, icon: body.icon }).await
}

pub async fn remove_layer(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    forward(&state, SessionEvent::RemoveLayer(name)).await
}

/// Replace the report features of every mode layer
pub async fn put_reports(
    State(state): State<Arc<AppState>>,
    Json(reports): Json<FeatureCollection>,
) -> StatusCode {
    forward(&state, SessionEvent::Reports(reports)).await
}

async fn forward(state: &AppState, event: SessionEvent) -> StatusCode {
    match state.events.send(event).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            tracing::error!("Dashboard session is not running: {:?}", e.0);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
