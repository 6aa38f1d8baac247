// Domain layer - Chart data model and the rules that operate on it
pub mod chart;
pub mod data_item;
pub mod error;
pub mod formatter;
pub mod resolution;
pub mod series;
