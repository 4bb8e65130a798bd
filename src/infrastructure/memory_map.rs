// In-process map engine - keeps the overlay state a browser map mirrors
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::watch;

use crate::application::ports::{Cursor, IconImage, MapEngine, PointerEventKind};
use crate::domain::geo::LngLat;
use crate::domain::layer::{FeatureCollection, IconRef};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Length of the RGBA payload handed to the engine
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolLayer {
    pub source: String,
    pub icon: IconRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupState {
    pub at: LngLat,
    pub html: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapSnapshot {
    pub images: BTreeMap<IconRef, ImageInfo>,
    pub sources: BTreeMap<String, FeatureCollection>,
    pub layers: BTreeMap<String, SymbolLayer>,
    pub subscriptions: BTreeSet<(String, PointerEventKind)>,
    pub popups: BTreeMap<String, PopupState>,
    pub cursor: Cursor,
}

/// Map engine that records every source, layer and popup in memory and
/// optionally publishes a snapshot after each change.
pub struct MemoryMap {
    state: MapSnapshot,
    publisher: Option<watch::Sender<MapSnapshot>>,
}

impl MemoryMap {
    pub fn new() -> Self {
        Self {
            state: MapSnapshot::default(),
            publisher: None,
        }
    }

    /// Map that pushes its state to `publisher` on every mutation
    pub fn with_publisher(publisher: watch::Sender<MapSnapshot>) -> Self {
        Self {
            publisher: Some(publisher),
            ..Self::new()
        }
    }

    pub fn snapshot(&self) -> MapSnapshot {
        self.state.clone()
    }

    fn publish(&self) {
        if let Some(publisher) = &self.publisher {
            publisher.send_replace(self.state.clone());
        }
    }
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl MapEngine for MemoryMap {
    fn add_image(&mut self, name: &IconRef, image: IconImage) {
        self.state.images.insert(
            name.clone(),
            ImageInfo {
                width: image.width,
                height: image.height,
                bytes: image.rgba.len(),
            },
        );
        self.publish();
    }

    fn has_image(&self, name: &IconRef) -> bool {
        self.state.images.contains_key(name)
    }

    fn add_source(&mut self, name: &str, data: FeatureCollection) {
        if self.state.sources.contains_key(name) {
            tracing::warn!("Source {} already exists, replacing it", name);
        }
        self.state.sources.insert(name.to_string(), data);
        self.publish();
    }

    fn set_source_data(&mut self, name: &str, data: FeatureCollection) -> bool {
        match self.state.sources.get_mut(name) {
            Some(source) => {
                *source = data;
                self.publish();
                true
            }
            None => false,
        }
    }

    fn remove_source(&mut self, name: &str) {
        if self.state.sources.remove(name).is_some() {
            self.publish();
        }
    }

    fn has_source(&self, name: &str) -> bool {
        self.state.sources.contains_key(name)
    }

    fn add_symbol_layer(&mut self, layer: &str, source: &str, icon: &IconRef) {
        if self.state.layers.contains_key(layer) {
            tracing::warn!("Layer {} already exists, replacing it", layer);
        }
        self.state.layers.insert(
            layer.to_string(),
            SymbolLayer {
                source: source.to_string(),
                icon: icon.clone(),
            },
        );
        self.publish();
    }

    fn remove_layer(&mut self, layer: &str) {
        if self.state.layers.remove(layer).is_some() {
            self.publish();
        }
    }

    fn has_layer(&self, layer: &str) -> bool {
        self.state.layers.contains_key(layer)
    }

    fn subscribe(&mut self, layer: &str, kind: PointerEventKind) {
        if self.state.subscriptions.insert((layer.to_string(), kind)) {
            self.publish();
        }
    }

    fn unsubscribe(&mut self, layer: &str, kind: PointerEventKind) {
        if self.state.subscriptions.remove(&(layer.to_string(), kind)) {
            self.publish();
        }
    }

    fn is_subscribed(&self, layer: &str, kind: PointerEventKind) -> bool {
        self.state.subscriptions.contains(&(layer.to_string(), kind))
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        if self.state.cursor != cursor {
            self.state.cursor = cursor;
            self.publish();
        }
    }

    fn show_popup(&mut self, popup: &str, at: LngLat, html: &str) {
        self.state.popups.insert(
            popup.to_string(),
            PopupState {
                at,
                html: html.to_string(),
            },
        );
        self.publish();
    }

    fn remove_popup(&mut self, popup: &str) {
        if self.state.popups.remove(popup).is_some() {
            self.publish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publishes_on_change() {
        let (tx, rx) = watch::channel(MapSnapshot::default());
        let mut map = MemoryMap::with_publisher(tx);

        map.add_source("ft8_layer", FeatureCollection::default());
        map.add_symbol_layer("ft8_layer", "ft8_layer", &IconRef::new("ft8MarkerIcon"));

        let snapshot = rx.borrow().clone();
        assert!(snapshot.sources.contains_key("ft8_layer"));
        assert_eq!(snapshot.layers["ft8_layer"].icon.as_str(), "ft8MarkerIcon");
    }

    #[test]
    fn test_image_registration_records_size() {
        let mut map = MemoryMap::new();
        map.add_image(
            &IconRef::new("ownMarkerIcon"),
            IconImage {
                width: 26,
                height: 32,
                rgba: vec![0; 26 * 32 * 4],
            },
        );

        let info = &map.snapshot().images[&IconRef::new("ownMarkerIcon")];
        assert_eq!((info.width, info.height, info.bytes), (26, 32, 26 * 32 * 4));
        assert!(map.has_image(&IconRef::new("ownMarkerIcon")));
    }

    #[test]
    fn test_missing_source_data_is_rejected() {
        let mut map = MemoryMap::new();
        assert!(!map.set_source_data("nope", FeatureCollection::default()));
    }

    #[test]
    fn test_snapshot_serializes_subscriptions() {
        let mut map = MemoryMap::new();
        map.subscribe("wspr_layer", PointerEventKind::Enter);

        let json = serde_json::to_value(map.snapshot()).unwrap();
        assert_eq!(json["subscriptions"][0][0], "wspr_layer");
        assert_eq!(json["subscriptions"][0][1], "enter");
    }
}
