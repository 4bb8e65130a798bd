// Hover popup for one map layer
use crate::application::ports::{Cursor, MapEngine};
use crate::domain::geo::{wrap_toward, LngLat};
use crate::domain::layer::Feature;

/// Owns the single popup shared by every feature of a layer
#[derive(Debug, Clone)]
pub struct PopupController {
    popup_id: String,
    visible: bool,
}

impl PopupController {
    pub fn new(layer: &str) -> Self {
        Self {
            popup_id: format!("{}_popup", layer),
            visible: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Show the feature's description at its position on the world copy
    /// nearest the pointer. Returns where the popup was placed.
    pub fn on_hover(
        &mut self,
        map: &mut dyn MapEngine,
        feature: &Feature,
        pointer: LngLat,
    ) -> Option<LngLat> {
        let Some(origin) = feature.geometry.lng_lat() else {
            tracing::debug!("Feature without coordinates under pointer, no popup");
            return None;
        };

        map.set_cursor(Cursor::Pointer);

        let at = LngLat::new(wrap_toward(origin.lng, pointer.lng), origin.lat);
        map.show_popup(&self.popup_id, at, &feature.properties.description);
        self.visible = true;

        Some(at)
    }

    pub fn on_leave(&mut self, map: &mut dyn MapEngine) {
        map.set_cursor(Cursor::Default);
        map.remove_popup(&self.popup_id);
        self.visible = false;
    }
}
