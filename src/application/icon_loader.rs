// Icon asset loader - Fetches and decodes marker icons in the background
use image::imageops::FilterType;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::ports::{IconImage, ImageFetcher};
use crate::domain::layer::{IconRef, IconSpec};
use crate::error::IconError;

/// A decoded icon waiting to be registered with the map engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedIcon {
    pub name: IconRef,
    pub image: IconImage,
}

#[derive(Clone)]
pub struct IconAssetLoader {
    fetcher: Arc<dyn ImageFetcher>,
    loaded: mpsc::Sender<LoadedIcon>,
}

impl IconAssetLoader {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, loaded: mpsc::Sender<LoadedIcon>) -> Self {
        Self { fetcher, loaded }
    }

    /// Start loading an icon. On success the decoded image is sent to the
    /// session, which registers it under `spec.name`. A failed load is only
    /// logged and the name stays unregistered.
    pub fn load(&self, spec: IconSpec) -> JoinHandle<()> {
        let fetcher = self.fetcher.clone();
        let loaded = self.loaded.clone();

        tokio::spawn(async move {
            match fetch_icon(fetcher.as_ref(), &spec).await {
                Ok(image) => {
                    tracing::debug!(
                        "Loaded icon {} from {} ({}x{})",
                        spec.name,
                        spec.url,
                        image.width,
                        image.height
                    );
                    let icon = LoadedIcon {
                        name: spec.name,
                        image,
                    };
                    if loaded.send(icon).await.is_err() {
                        tracing::debug!("Session is gone, dropping loaded icon");
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to load icon {} from {}: {}", spec.name, spec.url, e);
                }
            }
        })
    }
}

/// Fetch and decode one icon, resized to its display size
pub async fn fetch_icon(fetcher: &dyn ImageFetcher, spec: &IconSpec) -> Result<IconImage, IconError> {
    let bytes = fetcher.fetch(&spec.url).await?;
    decode_icon(&bytes, spec.width, spec.height)
}

pub fn decode_icon(bytes: &[u8], width: u32, height: u32) -> Result<IconImage, IconError> {
    let mut rgba = image::load_from_memory(bytes)?.to_rgba8();

    if width > 0 && height > 0 && rgba.dimensions() != (width, height) {
        rgba = image::imageops::resize(&rgba, width, height, FilterType::Triangle);
    }

    let (width, height) = rgba.dimensions();
    Ok(IconImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}
