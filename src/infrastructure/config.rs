use serde::Deserialize;
use std::time::Duration;

use crate::application::live_channel::ReconnectPolicy;
use crate::domain::chart::ChartLayout;
use crate::domain::layer::{IconRef, IconSpec, ReportMode};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub server: ServerSettings,
    pub channel: ChannelSettings,
    pub chart: ChartSettings,
    pub assets: AssetSettings,
    pub layers: Vec<LayerSettings>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            channel: ChannelSettings::default(),
            chart: ChartSettings::default(),
            assets: AssetSettings::default(),
            layers: default_layers(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub listen: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChannelSettings {
    pub host: String,
    pub path: String,
    pub secure: bool,
    pub reconnect_delay_secs: f64,
    /// Enables exponential backoff when set above 1.0
    pub backoff_factor: Option<f64>,
    pub max_delay_secs: Option<f64>,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            host: "localhost:8080".to_string(),
            path: "/ws".to_string(),
            secure: false,
            reconnect_delay_secs: 5.0,
            backoff_factor: None,
            max_delay_secs: None,
        }
    }
}

impl ChannelSettings {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let initial = Duration::from_secs_f64(self.reconnect_delay_secs.max(0.0));
        match self.backoff_factor {
            Some(factor) if factor > 1.0 => ReconnectPolicy::Exponential {
                initial,
                factor,
                max: self
                    .max_delay_secs
                    .map(|secs| Duration::from_secs_f64(secs.max(0.0)))
                    .unwrap_or(Duration::from_secs(60))
                    .max(initial),
            },
            _ => ReconnectPolicy::Fixed(initial),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartSettings {
    pub subtitle: String,
    pub axes: Vec<String>,
    pub live_series: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        let layout = ChartLayout::default();
        Self {
            subtitle: layout.subtitle,
            axes: layout.axes,
            live_series: layout.live_series,
        }
    }
}

impl ChartSettings {
    pub fn layout(&self) -> ChartLayout {
        ChartLayout {
            subtitle: self.subtitle.clone(),
            axes: self.axes.clone(),
            live_series: self.live_series.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AssetSettings {
    /// Prefix for relative icon URLs; relative URLs are read from disk when unset
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LayerSettings {
    pub name: String,
    pub icon: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl LayerSettings {
    pub fn icon_ref(&self) -> IconRef {
        IconRef::new(self.icon.as_str())
    }

    pub fn icon_spec(&self, assets: &AssetSettings) -> IconSpec {
        IconSpec {
            name: self.icon_ref(),
            url: resolve_asset_url(assets.base_url.as_deref(), &self.url),
            width: self.width,
            height: self.height,
        }
    }
}

/// One layer per report mode with the stock marker icons
pub fn default_layers() -> Vec<LayerSettings> {
    ReportMode::ALL
        .iter()
        .map(|mode| {
            let (width, height) = mode.icon_size();
            LayerSettings {
                name: mode.layer_name(),
                icon: mode.icon().to_string(),
                url: format!("static/assets/{}_marker.png", mode.slug()),
                width,
                height,
            }
        })
        .collect()
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    build_dashboard_config(
        config::File::with_name("config/dashboard").required(false),
        environment_overrides(),
    )
}

/// `DASHBOARD__CHANNEL__HOST=...` overrides `[channel] host`
fn environment_overrides() -> config::Environment {
    config::Environment::with_prefix("DASHBOARD")
        .prefix_separator("__")
        .separator("__")
}

fn build_dashboard_config<F>(file: F, env: config::Environment) -> anyhow::Result<DashboardConfig>
where
    F: config::Source + Send + Sync + 'static,
{
    let settings = config::Config::builder()
        .add_source(file)
        .add_source(env)
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Streaming endpoint on the dashboard host; reconnects reuse it
pub fn resolve_endpoint(channel: &ChannelSettings) -> String {
    let scheme = if channel.secure { "wss" } else { "ws" };
    let path = if channel.path.starts_with('/') {
        channel.path.clone()
    } else {
        format!("/{}", channel.path)
    };
    format!("{}://{}{}", scheme, channel.host.trim_end_matches('/'), path)
}

pub fn resolve_asset_url(base_url: Option<&str>, url: &str) -> String {
    if url.contains("://") {
        return url.to_string();
    }
    match base_url {
        Some(base) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            url.trim_start_matches('/')
        ),
        None => url.to_string(),
    }
}
