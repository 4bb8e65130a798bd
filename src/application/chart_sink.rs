// Chart sink - Projects the latest batch onto the chart
use crate::application::ports::ChartRenderer;
use crate::domain::chart::{ChartLayout, ChartUpdate};
use crate::domain::telemetry::Batch;

pub struct ChartSink<R: ChartRenderer> {
    renderer: R,
    series: String,
    last: Option<Batch>,
}

impl<R: ChartRenderer> ChartSink<R> {
    /// Configure the renderer with `layout` and target its live series
    pub fn new(mut renderer: R, layout: &ChartLayout) -> Self {
        renderer.configure(layout);
        Self {
            renderer,
            series: layout.live_series.clone(),
            last: None,
        }
    }

    /// Replace the visible window with `batch`. Nothing is merged with the
    /// previous batch.
    pub fn apply(&mut self, batch: Batch) {
        let update = ChartUpdate::from_batch(&self.series, &batch);
        self.renderer.update(&update);
        tracing::debug!("Chart updated with {} records", batch.len());
        self.last = Some(batch);
    }

    pub fn last_batch(&self) -> Option<&Batch> {
        self.last.as_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}
