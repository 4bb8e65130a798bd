// Geographic helpers for a horizontally wrapped world map
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Shift `feature_lng` by whole turns until it lies within 180° of
/// `pointer_lng`, so a popup lands on the world copy under the cursor.
pub fn wrap_toward(feature_lng: f64, pointer_lng: f64) -> f64 {
    if !feature_lng.is_finite() || !pointer_lng.is_finite() {
        return feature_lng;
    }

    let turns = (pointer_lng - feature_lng) / 360.0;
    // A feature exactly 180° away stays on its own side
    let turns = if turns.fract().abs() == 0.5 {
        turns.trunc()
    } else {
        turns.round()
    };
    feature_lng + 360.0 * turns
}
