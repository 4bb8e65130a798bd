// Application layer - Use cases and ports
pub mod chart_sink;
pub mod dashboard_session;
pub mod icon_loader;
pub mod layer_registry;
pub mod live_channel;
pub mod ports;
pub mod popup_controller;
