// Domain layer - Core business entities
pub mod chart;
pub mod geo;
pub mod layer;
pub mod telemetry;
