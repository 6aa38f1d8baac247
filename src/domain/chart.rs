// Chart configuration domain model
use super::formatter::Formatter;
use super::resolution::{Resolution, SECONDS_PER_DAY};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 300;
pub const DEFAULT_MAX_POINTS: usize = 10_000_000;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(60_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderType {
    Area,
    Stack,
    Bar,
    Line,
    LinePlot,
    Scatterplot,
}

impl RenderType {
    /// Parse a render tag. `bar-unstacked` is a bar chart with unstacked series,
    /// returned as `(Bar, true)`.
    pub fn parse(tag: &str) -> Option<(RenderType, bool)> {
        let render_type = match tag.to_ascii_lowercase().as_str() {
            "area" => RenderType::Area,
            "stack" => RenderType::Stack,
            "bar" => RenderType::Bar,
            "bar-unstacked" => return Some((RenderType::Bar, true)),
            "line" => RenderType::Line,
            "lineplot" => RenderType::LinePlot,
            "scatterplot" => RenderType::Scatterplot,
            _ => return None,
        };
        Some((render_type, false))
    }
}

/// Chart documentation: one text block, or text per series name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Docs {
    Text(String),
    PerSeries(HashMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub timestamp: i64,
    pub message: String,
}

/// Immutable per-chart configuration
#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub min_y: f64,
    pub is_polling: bool,
    pub resolution: Resolution,
    pub formatter: Formatter,
    pub render_type: RenderType,
    pub unstacked: bool,
    pub docs: Option<Docs>,
    pub annotations: Vec<Annotation>,
    pub show_refresh_times: bool,
    /// Offset between padding points, in seconds
    pub step: i64,
    pub default_y: f64,
    pub max_points: usize,
    pub poll_interval: Duration,
}

impl ChartConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            min_y: 0.0,
            is_polling: false,
            resolution: Resolution::Daily,
            formatter: Formatter::Timeseries1,
            render_type: RenderType::Area,
            unstacked: false,
            docs: None,
            annotations: Vec::new(),
            show_refresh_times: false,
            step: SECONDS_PER_DAY,
            default_y: 0.0,
            max_points: DEFAULT_MAX_POINTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
