// Ports to the live stream, asset host, map engine and chart engine
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::domain::chart::{ChartLayout, ChartUpdate};
use crate::domain::geo::LngLat;
use crate::domain::layer::{Feature, FeatureCollection, IconRef};
use crate::error::{ChannelError, IconError};

/// Text frames of one connection, in arrival order. The stream ends when
/// the connection closes.
pub type FrameStream = BoxStream<'static, Result<String, ChannelError>>;

#[async_trait]
pub trait StreamConnector: Send + Sync {
    /// Open a fresh connection. Connections are never reused.
    async fn connect(&self, url: &str) -> Result<FrameStream, ChannelError>;
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, IconError>;
}

/// Decoded RGBA icon ready for the map engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerEventKind {
    Enter,
    Leave,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
}

/// Pointer event emitted by the map engine for a subscribed layer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    Enter {
        layer: String,
        feature: Feature,
        pointer: LngLat,
    },
    Leave {
        layer: String,
    },
}

impl PointerEvent {
    pub fn layer(&self) -> &str {
        match self {
            PointerEvent::Enter { layer, .. } | PointerEvent::Leave { layer } => layer,
        }
    }

    pub fn kind(&self) -> PointerEventKind {
        match self {
            PointerEvent::Enter { .. } => PointerEventKind::Enter,
            PointerEvent::Leave { .. } => PointerEventKind::Leave,
        }
    }
}

/// Operations the dashboard needs from the map rendering engine
pub trait MapEngine: Send {
    fn add_image(&mut self, name: &IconRef, image: IconImage);
    fn has_image(&self, name: &IconRef) -> bool;

    fn add_source(&mut self, name: &str, data: FeatureCollection);
    /// Replace a source's data. Returns false when the source does not exist.
    fn set_source_data(&mut self, name: &str, data: FeatureCollection) -> bool;
    fn remove_source(&mut self, name: &str);
    fn has_source(&self, name: &str) -> bool;

    fn add_symbol_layer(&mut self, layer: &str, source: &str, icon: &IconRef);
    fn remove_layer(&mut self, layer: &str);
    fn has_layer(&self, layer: &str) -> bool;

    fn subscribe(&mut self, layer: &str, kind: PointerEventKind);
    fn unsubscribe(&mut self, layer: &str, kind: PointerEventKind);
    fn is_subscribed(&self, layer: &str, kind: PointerEventKind) -> bool;

    fn set_cursor(&mut self, cursor: Cursor);
    /// Show or move the popup with this id. Showing an existing id replaces it.
    fn show_popup(&mut self, popup: &str, at: LngLat, html: &str);
    fn remove_popup(&mut self, popup: &str);
}

/// Operations the dashboard needs from the charting widget
pub trait ChartRenderer: Send {
    fn configure(&mut self, layout: &ChartLayout);
    /// Set the category axis and the series data in one update.
    fn update(&mut self, update: &ChartUpdate);
}
