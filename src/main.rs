// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::sync::{mpsc, watch};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::chart_sink::ChartSink;
use crate::application::dashboard_session::{DashboardSession, LayerSnapshot};
use crate::application::icon_loader::IconAssetLoader;
use crate::application::live_channel::{ConsumptionSwitch, LiveChannel};
use crate::infrastructure::asset_fetcher::AssetFetcher;
use crate::infrastructure::config::{load_dashboard_config, resolve_endpoint};
use crate::infrastructure::echarts_renderer::{ChartSnapshot, EchartsRenderer};
use crate::infrastructure::memory_map::{MapSnapshot, MemoryMap};
use crate::infrastructure::ws_connector::WebSocketConnector;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    create_layer, get_channel, get_chart, get_map, health_check, pointer_event, press_key,
    put_reports, remove_layer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config()?;
    let endpoint = resolve_endpoint(&config.channel);

    let (batch_tx, batch_rx) = mpsc::channel(64);
    let (icon_tx, icon_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (chart_tx, chart_rx) = watch::channel(ChartSnapshot::default());
    let (map_tx, map_rx) = watch::channel(MapSnapshot::default());
    let (layers_tx, layers_rx) = watch::channel(LayerSnapshot::default());

    // Live channel (infrastructure connector, application loop)
    let consumption = ConsumptionSwitch::new();
    let channel = LiveChannel::new(
        Arc::new(WebSocketConnector::new()),
        endpoint.clone(),
        config.channel.reconnect_policy(),
        consumption.clone(),
        batch_tx,
    );
    let connection = channel.state();

    // Session owns the map and the chart
    let chart = ChartSink::new(
        EchartsRenderer::with_publisher(chart_tx),
        &config.chart.layout(),
    );
    let mut session = DashboardSession::new(MemoryMap::with_publisher(map_tx), chart)
        .with_layer_publisher(layers_tx);
    session.preload_layers(
        config
            .layers
            .iter()
            .map(|layer| (layer.name.clone(), layer.icon_ref())),
    );

    // Icons load in the background; their layers appear as they arrive
    let loader = IconAssetLoader::new(Arc::new(AssetFetcher::new()), icon_tx);
    for layer in &config.layers {
        loader.load(layer.icon_spec(&config.assets));
    }
    drop(loader);

    tokio::spawn(channel.run());
    tokio::spawn(session.run(batch_rx, icon_rx, event_rx));

    // Create application state
    let state = Arc::new(AppState {
        events: event_tx,
        consumption,
        endpoint,
        connection,
        chart: chart_rx,
        map: map_rx,
        layers: layers_rx,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/chart", get(get_chart))
        .route("/map", get(get_map))
        .route("/channel", get(get_channel))
        .route("/input/key/:code", post(press_key))
        .route("/map/pointer", post(pointer_event))
        .route("/layers/:name", put(create_layer).delete(remove_layer))
        .route("/reports", put(put_reports))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.listen.parse()?;
    tracing::info!("Starting propagation dashboard on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
