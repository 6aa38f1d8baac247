// Application layer - Use cases over the chart domain
pub mod aggregator;
pub mod chart_service;
pub mod export;
pub mod reconciler;
pub mod render_backend;
pub mod series_source;
