// Chart domain models - layout and live window updates
use serde::Serialize;

use super::telemetry::Batch;

/// Static multi-axis chart configuration, applied once at startup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLayout {
    pub subtitle: String,
    /// One value axis and one line series per entry, in axis order
    pub axes: Vec<String>,
    /// Series replaced by every incoming batch
    pub live_series: String,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            subtitle: "live".to_string(),
            axes: vec!["R".to_string(), "Freq".to_string(), "Angle".to_string()],
            live_series: "R".to_string(),
        }
    }
}

/// Category axis and series values, applied together
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartUpdate {
    pub categories: Vec<String>,
    pub series: String,
    pub values: Vec<f64>,
}

impl ChartUpdate {
    pub fn from_batch(series: &str, batch: &Batch) -> Self {
        Self {
            categories: batch.labels(),
            series: series.to_string(),
            values: batch.values(),
        }
    }
}
