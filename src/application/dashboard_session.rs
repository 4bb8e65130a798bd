// Dashboard session - Single owner of the map, chart and layer state
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::{mpsc, watch};

use crate::application::chart_sink::ChartSink;
use crate::application::icon_loader::LoadedIcon;
use crate::application::layer_registry::{CreateOutcome, LayerRegistry};
use crate::application::ports::{ChartRenderer, MapEngine, PointerEvent};
use crate::domain::layer::{FeatureCollection, IconRef};
use crate::domain::telemetry::Batch;
use crate::error::LayerError;

/// Everything the dashboard's inputs can ask of the session
#[derive(Debug)]
pub enum SessionEvent {
    Pointer(PointerEvent),
    CreateLayer { name: String, icon: IconRef },
    RemoveLayer(String),
    Reports(FeatureCollection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerRequest {
    Ready(CreateOutcome),
    /// Waiting for the icon to finish loading
    Pending,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerSnapshot {
    pub active: BTreeMap<String, IconRef>,
    pub pending: BTreeMap<String, IconRef>,
}

pub struct DashboardSession<M: MapEngine, R: ChartRenderer> {
    map: M,
    chart: ChartSink<R>,
    registry: LayerRegistry,
    pending: BTreeMap<String, IconRef>,
    staged: BTreeMap<String, FeatureCollection>,
    layers: Option<watch::Sender<LayerSnapshot>>,
}

impl<M: MapEngine, R: ChartRenderer> DashboardSession<M, R> {
    pub fn new(map: M, chart: ChartSink<R>) -> Self {
        Self {
            map,
            chart,
            registry: LayerRegistry::new(),
            pending: BTreeMap::new(),
            staged: BTreeMap::new(),
            layers: None,
        }
    }

    pub fn with_layer_publisher(mut self, publisher: watch::Sender<LayerSnapshot>) -> Self {
        self.layers = Some(publisher);
        self
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn chart(&self) -> &ChartSink<R> {
        &self.chart
    }

    pub fn layer_snapshot(&self) -> LayerSnapshot {
        LayerSnapshot {
            active: self
                .registry
                .names()
                .filter_map(|name| {
                    self.registry
                        .icon_of(name)
                        .map(|icon| (name.to_string(), icon.clone()))
                })
                .collect(),
            pending: self.pending.clone(),
        }
    }

    pub fn apply_batch(&mut self, batch: Batch) {
        self.chart.apply(batch);
    }

    /// Create a layer now, or once its icon is registered
    pub fn request_layer(&mut self, name: &str, icon: IconRef) -> LayerRequest {
        match self.registry.create_layer(&mut self.map, name, &icon) {
            Ok(outcome) => {
                self.pending.remove(name);
                if let Some(features) = self.staged.remove(name) {
                    self.registry.set_features(&mut self.map, name, features);
                }
                self.publish_layers();
                LayerRequest::Ready(outcome)
            }
            Err(LayerError::IconNotRegistered { .. }) => {
                tracing::debug!("Layer {} waits for icon {}", name, icon);
                self.pending.insert(name.to_string(), icon);
                self.publish_layers();
                LayerRequest::Pending
            }
        }
    }

    pub fn remove_layer(&mut self, name: &str) -> bool {
        let was_pending = self.pending.remove(name).is_some();
        self.staged.remove(name);
        let removed = self.registry.remove_layer(&mut self.map, name);
        self.publish_layers();
        removed || was_pending
    }

    /// Register a loaded icon and create every layer that waited for it
    pub fn register_icon(&mut self, icon: LoadedIcon) {
        self.map.add_image(&icon.name, icon.image);
        tracing::debug!("Registered icon {}", icon.name);

        let ready: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, waiting_for)| **waiting_for == icon.name)
            .map(|(name, _)| name.clone())
            .collect();

        for name in ready {
            self.request_layer(&name, icon.name.clone());
        }
    }

    /// Route reports to their mode's layer, replacing each layer's data.
    /// Layers not created yet keep the data until they are.
    pub fn apply_reports(&mut self, reports: FeatureCollection) {
        for (mode, features) in reports.partition_by_mode() {
            let layer = mode.layer_name();
            if self.registry.is_active(&layer) {
                self.registry.set_features(&mut self.map, &layer, features);
            } else {
                tracing::debug!("Layer {} not created yet, staging {} features", layer, features.len());
                self.staged.insert(layer, features);
            }
        }
    }

    pub fn handle_pointer(&mut self, event: &PointerEvent) -> bool {
        self.registry.dispatch(&mut self.map, event)
    }

    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Pointer(event) => {
                self.handle_pointer(&event);
            }
            SessionEvent::CreateLayer { name, icon } => {
                self.request_layer(&name, icon);
            }
            SessionEvent::RemoveLayer(name) => {
                self.remove_layer(&name);
            }
            SessionEvent::Reports(reports) => self.apply_reports(reports),
        }
    }

    /// Request every configured layer up front; most will wait for icons
    pub fn preload_layers(&mut self, layers: impl IntoIterator<Item = (String, IconRef)>) {
        for (name, icon) in layers {
            self.request_layer(&name, icon);
        }
    }

    /// Serve events until every sender is gone. Batches, icons and the
    /// remaining events are each handled in arrival order, one at a time.
    pub async fn run(
        mut self,
        mut batches: mpsc::Receiver<Batch>,
        mut icons: mpsc::Receiver<LoadedIcon>,
        mut events: mpsc::Receiver<SessionEvent>,
    ) -> Self {
        loop {
            tokio::select! {
                Some(batch) = batches.recv() => self.apply_batch(batch),
                Some(icon) = icons.recv() => self.register_icon(icon),
                Some(event) = events.recv() => self.handle(event),
                else => break,
            }
        }
        tracing::debug!("Dashboard session inputs closed");
        self
    }

    fn publish_layers(&self) {
        if let Some(publisher) = &self.layers {
            publisher.send_replace(self.layer_snapshot());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{IconImage, PointerEventKind};
    use crate::domain::chart::ChartLayout;
    use crate::domain::geo::LngLat;
    use crate::domain::layer::{Feature, ReportMode};
    use crate::infrastructure::echarts_renderer::EchartsRenderer;
    use crate::infrastructure::memory_map::MemoryMap;
    use serde_json::json;

    fn session() -> DashboardSession<MemoryMap, EchartsRenderer> {
        DashboardSession::new(
            MemoryMap::new(),
            ChartSink::new(EchartsRenderer::new(), &ChartLayout::default()),
        )
    }

    fn icon(name: &str) -> LoadedIcon {
        LoadedIcon {
            name: IconRef::new(name),
            image: IconImage {
                width: 22,
                height: 28,
                rgba: vec![0; 22 * 28 * 4],
            },
        }
    }

    #[test]
    fn test_layer_waits_for_icon() {
        let mut session = session();

        let request = session.request_layer("ft8_layer", IconRef::new("ft8MarkerIcon"));
        assert_eq!(request, LayerRequest::Pending);
        assert!(!session.map().has_layer("ft8_layer"));

        session.register_icon(icon("ft8MarkerIcon"));

        assert!(session.map().has_layer("ft8_layer"));
        let snapshot = session.layer_snapshot();
        assert!(snapshot.pending.is_empty());
        assert_eq!(snapshot.active["ft8_layer"].as_str(), "ft8MarkerIcon");
    }

    #[test]
    fn test_icon_that_never_loads_keeps_layer_pending() {
        let mut session = session();
        session.preload_layers(
            ReportMode::ALL
                .iter()
                .map(|mode| (mode.layer_name(), mode.icon())),
        );
        session.register_icon(icon("ft8MarkerIcon"));

        let snapshot = session.layer_snapshot();
        assert_eq!(snapshot.active.len(), 1);
        assert_eq!(snapshot.pending.len(), ReportMode::ALL.len() - 1);
        assert!(snapshot.pending.contains_key("udarp_layer"));
    }

    #[test]
    fn test_remove_pending_layer() {
        let mut session = session();
        session.request_layer("own_layer", IconRef::new("ownMarkerIcon"));

        assert!(session.remove_layer("own_layer"));
        session.register_icon(icon("ownMarkerIcon"));

        assert!(!session.map().has_layer("own_layer"));
        assert!(!session.remove_layer("own_layer"));
    }

    #[test]
    fn test_reports_route_to_mode_layers() {
        let mut session = session();
        for mode in [ReportMode::Ft8, ReportMode::Generic] {
            session.register_icon(icon(mode.icon().as_str()));
            session.request_layer(&mode.layer_name(), mode.icon());
        }

        session.apply_reports(FeatureCollection::new(vec![
            Feature::point(LngLat::new(16.6, 49.2), "a", "FT8"),
            Feature::point(LngLat::new(-3.7, 40.4), "b", "JT65"),
            Feature::point(LngLat::new(2.3, 48.8), "c", "WSPR"),
        ]));

        let snapshot = session.map().snapshot();
        assert_eq!(snapshot.sources["ft8_layer"].len(), 1);
        assert_eq!(snapshot.sources["generic_layer"].len(), 1);
        assert!(!snapshot.sources.contains_key("wspr_layer"));

        // WSPR reports show up once their layer exists
        session.register_icon(icon("wsprMarkerIcon"));
        session.request_layer("wspr_layer", IconRef::new("wsprMarkerIcon"));
        assert_eq!(session.map().snapshot().sources["wspr_layer"].len(), 1);

        // A new query clears layers it has nothing for
        session.apply_reports(FeatureCollection::default());
        assert!(session.map().snapshot().sources["ft8_layer"].is_empty());
    }

    #[test]
    fn test_pointer_events_drive_popup() {
        let mut session = session();
        session.register_icon(icon("ft8MarkerIcon"));
        session.request_layer("ft8_layer", IconRef::new("ft8MarkerIcon"));

        session.handle(SessionEvent::Pointer(PointerEvent::Enter {
            layer: "ft8_layer".to_string(),
            feature: Feature::point(LngLat::new(-170.0, 10.0), "<b>KH6</b>", "FT8"),
            pointer: LngLat::new(170.0, 12.0),
        }));
        assert_eq!(
            session.map().snapshot().popups["ft8_layer_popup"].at,
            LngLat::new(190.0, 10.0)
        );

        session.handle(SessionEvent::Pointer(PointerEvent::Leave {
            layer: "ft8_layer".to_string(),
        }));
        assert!(session.map().snapshot().popups.is_empty());
        assert!(session.map().is_subscribed("ft8_layer", PointerEventKind::Leave));
    }

    #[tokio::test]
    async fn test_run_applies_batches_icons_and_events() {
        let session = session();
        let (batch_tx, batch_rx) = mpsc::channel(4);
        let (icon_tx, icon_rx) = mpsc::channel(4);
        let (event_tx, event_rx) = mpsc::channel(4);

        batch_tx
            .send(Batch::parse(r#"[["10:00",1.5],["10:01",2.0]]"#).unwrap().unwrap())
            .await
            .unwrap();
        event_tx
            .send(SessionEvent::CreateLayer {
                name: "ft8_layer".to_string(),
                icon: IconRef::new("ft8MarkerIcon"),
            })
            .await
            .unwrap();
        icon_tx.send(icon("ft8MarkerIcon")).await.unwrap();
        drop((batch_tx, icon_tx, event_tx));

        let session = session.run(batch_rx, icon_rx, event_rx).await;

        let option = &session.chart().renderer().snapshot().option;
        assert_eq!(option["xAxis"]["data"], json!(["10:00", "10:01"]));
        assert_eq!(option["series"][0]["data"], json!([1.5, 2.0]));
        // Either arrival order ends with the layer created
        let layers = session.layer_snapshot();
        assert_eq!(layers.active["ft8_layer"].as_str(), "ft8MarkerIcon");
        assert!(layers.pending.is_empty());
        assert!(session.map().has_layer("ft8_layer"));
    }
}
