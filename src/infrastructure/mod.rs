// Infrastructure layer - External dependencies and adapters
pub mod asset_fetcher;
pub mod config;
pub mod echarts_renderer;
pub mod memory_map;
pub mod ws_connector;
