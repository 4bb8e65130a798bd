// ECharts option builder - Holds the chart option a browser widget renders
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::application::ports::ChartRenderer;
use crate::domain::chart::{ChartLayout, ChartUpdate};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSnapshot {
    pub option: Value,
    pub updated_at: Option<String>,
}

pub struct EchartsRenderer {
    snapshot: ChartSnapshot,
    publisher: Option<watch::Sender<ChartSnapshot>>,
}

impl EchartsRenderer {
    pub fn new() -> Self {
        Self {
            snapshot: ChartSnapshot::default(),
            publisher: None,
        }
    }

    pub fn with_publisher(publisher: watch::Sender<ChartSnapshot>) -> Self {
        Self {
            publisher: Some(publisher),
            ..Self::new()
        }
    }

    pub fn snapshot(&self) -> &ChartSnapshot {
        &self.snapshot
    }

    fn publish(&self) {
        if let Some(publisher) = &self.publisher {
            publisher.send_replace(self.snapshot.clone());
        }
    }
}

impl Default for EchartsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn layout_option(layout: &ChartLayout) -> Value {
    let y_axes: Vec<Value> = layout
        .axes
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "type": "value",
                "scale": true,
                "splitLine": { "show": true },
            })
        })
        .collect();

    let mut series: Vec<Value> = layout
        .axes
        .iter()
        .enumerate()
        .map(|(index, name)| {
            json!({
                "name": name,
                "type": "line",
                "yAxisIndex": index,
                "data": [],
            })
        })
        .collect();

    if !layout.axes.contains(&layout.live_series) {
        series.push(json!({
            "name": layout.live_series,
            "type": "line",
            "yAxisIndex": 0,
            "data": [],
        }));
    }

    json!({
        "tooltip": { "trigger": "axis" },
        "grid": { "left": "3%", "right": "4%", "bottom": "3%", "containLabel": true },
        "toolbox": {
            "left": "center",
            "feature": { "dataZoom": { "yAxisIndex": "none" } },
        },
        "title": { "subtext": layout.subtitle },
        "xAxis": { "type": "category", "boundaryGap": false, "data": [] },
        "yAxis": y_axes,
        "dataZoom": [{ "type": "inside", "throttle": 50 }],
        "series": series,
    })
}

impl ChartRenderer for EchartsRenderer {
    fn configure(&mut self, layout: &ChartLayout) {
        self.snapshot.option = layout_option(layout);
        self.publish();
    }

    fn update(&mut self, update: &ChartUpdate) {
        let option = &mut self.snapshot.option;
        option["xAxis"]["data"] = json!(update.categories);

        let values = json!(update.values);
        if !option["series"].is_array() {
            option["series"] = json!([]);
        }
        if let Some(series) = option["series"].as_array_mut() {
            match series.iter_mut().find(|s| s["name"] == update.series.as_str()) {
                Some(target) => target["data"] = values,
                None => series.push(json!({
                    "name": update.series,
                    "type": "line",
                    "data": values,
                })),
            }
        }

        self.snapshot.updated_at = Some(Utc::now().to_rfc3339());
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_has_one_axis_per_series() {
        let mut renderer = EchartsRenderer::new();
        renderer.configure(&ChartLayout::default());

        let option = &renderer.snapshot().option;
        assert_eq!(option["yAxis"].as_array().unwrap().len(), 3);
        assert_eq!(option["series"][2]["name"], "Angle");
        assert_eq!(option["series"][2]["yAxisIndex"], 2);
        assert_eq!(option["xAxis"]["type"], "category");
    }

    #[test]
    fn test_update_sets_axis_and_series_together() {
        let (tx, rx) = watch::channel(ChartSnapshot::default());
        let mut renderer = EchartsRenderer::with_publisher(tx);
        renderer.configure(&ChartLayout::default());

        renderer.update(&ChartUpdate {
            categories: vec!["10:00".to_string(), "10:01".to_string()],
            series: "R".to_string(),
            values: vec![1.5, 2.0],
        });

        let published = rx.borrow().clone();
        assert_eq!(published.option["xAxis"]["data"], json!(["10:00", "10:01"]));
        assert_eq!(published.option["series"][0]["data"], json!([1.5, 2.0]));
        assert_eq!(published.option["series"][1]["data"], json!([]));
        assert!(published.updated_at.is_some());
    }

    #[test]
    fn test_unknown_live_series_is_appended() {
        let mut renderer = EchartsRenderer::new();
        renderer.configure(&ChartLayout {
            live_series: "last".to_string(),
            ..ChartLayout::default()
        });

        let option = &renderer.snapshot().option;
        assert_eq!(option["series"].as_array().unwrap().len(), 4);
        assert_eq!(option["series"][3]["name"], "last");
    }
}
