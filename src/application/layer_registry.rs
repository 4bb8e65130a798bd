// Layer registry - Creates and tears down named marker layers
use serde::Serialize;
use std::collections::BTreeMap;

use crate::application::popup_controller::PopupController;
use crate::application::ports::{MapEngine, PointerEvent, PointerEventKind};
use crate::domain::layer::{FeatureCollection, IconRef};
use crate::error::LayerError;

const HOVER_EVENTS: [PointerEventKind; 2] = [PointerEventKind::Enter, PointerEventKind::Leave];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateOutcome {
    Created,
    /// Layer already existed with the same icon
    Unchanged,
    /// Layer already existed; its symbol layer now uses the new icon
    IconReplaced,
}

#[derive(Debug)]
struct ActiveLayer {
    icon: IconRef,
    popup: PopupController,
}

/// Tracks the layers this dashboard created on the map
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: BTreeMap<String, ActiveLayer>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `name` as a symbol layer over an empty GeoJSON source of the
    /// same name, with hover handlers routed to the layer's popup.
    ///
    /// The icon must already be registered; this never waits for it.
    /// Calling it again is safe: each of source, layer and subscription is
    /// only added when missing.
    pub fn create_layer(
        &mut self,
        map: &mut dyn MapEngine,
        name: &str,
        icon: &IconRef,
    ) -> Result<CreateOutcome, LayerError> {
        if !map.has_image(icon) {
            return Err(LayerError::IconNotRegistered {
                layer: name.to_string(),
                icon: icon.to_string(),
            });
        }

        // A known layer the map lost is built again from scratch
        let outcome = match self.layers.get(name) {
            Some(_) if !map.has_layer(name) => CreateOutcome::Created,
            Some(existing) if existing.icon == *icon => CreateOutcome::Unchanged,
            Some(_) => CreateOutcome::IconReplaced,
            None => CreateOutcome::Created,
        };

        if outcome != CreateOutcome::Unchanged {
            // Source before layer, layer before subscriptions
            if !map.has_source(name) {
                map.add_source(name, FeatureCollection::default());
            }
            if map.has_layer(name) {
                map.remove_layer(name);
            }
            map.add_symbol_layer(name, name, icon);
        }

        for kind in HOVER_EVENTS {
            if !map.is_subscribed(name, kind) {
                map.subscribe(name, kind);
            }
        }

        self.layers
            .entry(name.to_string())
            .and_modify(|layer| layer.icon = icon.clone())
            .or_insert_with(|| ActiveLayer {
                icon: icon.clone(),
                popup: PopupController::new(name),
            });

        tracing::debug!("Layer {} with icon {}: {:?}", name, icon, outcome);
        Ok(outcome)
    }

    /// Undo everything `create_layer` did. Layer and source are checked
    /// independently, so this never fails for unknown names.
    /// Returns whether anything was removed.
    pub fn remove_layer(&mut self, map: &mut dyn MapEngine, name: &str) -> bool {
        let mut removed = false;

        if let Some(mut layer) = self.layers.remove(name) {
            if layer.popup.is_visible() {
                layer.popup.on_leave(map);
            }
            removed = true;
        }

        for kind in HOVER_EVENTS {
            if map.is_subscribed(name, kind) {
                map.unsubscribe(name, kind);
                removed = true;
            }
        }

        if map.has_layer(name) {
            map.remove_layer(name);
            removed = true;
        }

        if map.has_source(name) {
            map.remove_source(name);
            removed = true;
        }

        if removed {
            tracing::debug!("Removed layer {}", name);
        }
        removed
    }

    /// Replace the features shown by a layer. Returns false when the layer
    /// has no source on the map.
    pub fn set_features(
        &self,
        map: &mut dyn MapEngine,
        name: &str,
        features: FeatureCollection,
    ) -> bool {
        map.set_source_data(name, features)
    }

    /// Route a pointer event to the popup of the layer it targets. Events
    /// for layers without a matching subscription are ignored.
    pub fn dispatch(&mut self, map: &mut dyn MapEngine, event: &PointerEvent) -> bool {
        if !map.is_subscribed(event.layer(), event.kind()) {
            return false;
        }
        let Some(layer) = self.layers.get_mut(event.layer()) else {
            return false;
        };

        match event {
            PointerEvent::Enter {
                feature, pointer, ..
            } => layer.popup.on_hover(map, feature, *pointer).is_some(),
            PointerEvent::Leave { .. } => {
                layer.popup.on_leave(map);
                true
            }
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn icon_of(&self, name: &str) -> Option<&IconRef> {
        self.layers.get(name).map(|layer| &layer.icon)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }
}
