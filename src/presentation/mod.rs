// Presentation layer - HTTP surface over the dashboard session
pub mod app_state;
pub mod handlers;
