// Rendering adapter - Hands reconciled series to a rendering backend
use crate::domain::chart::{Annotation, ChartConfig, RenderType};
use crate::domain::resolution::Resolution;
use crate::domain::series::Series;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Per-pass inputs that are not part of the immutable chart config
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub resolution: Resolution,
    pub refresh: Option<RefreshTimes>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshTimes {
    pub refreshed_at: DateTime<Utc>,
    /// Unset for charts that are only refreshed on demand
    pub next_refresh: Option<DateTime<Utc>>,
}

impl RefreshTimes {
    pub fn starting_now(interval: Option<Duration>) -> Self {
        let refreshed_at = Utc::now();
        let next_refresh = interval
            .and_then(|i| chrono::Duration::from_std(i).ok())
            .and_then(|d| refreshed_at.checked_add_signed(d));
        Self {
            refreshed_at,
            next_refresh,
        }
    }
}

/// Backend that turns prepared series into a rendered chart.
///
/// Implementations receive series that are sorted and share the same bounds.
pub trait RenderBackend: Send + Sync {
    fn render(&self, series: &[Series], config: &ChartConfig, context: RenderContext) -> RenderedChart;
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedPoint {
    pub x: i64,
    pub y: f64,
    pub hover: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedSeries {
    pub name: String,
    pub color: String,
    pub points: Vec<RenderedPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AxisLabel {
    pub x: i64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedChart {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub render_type: RenderType,
    pub unstacked: bool,
    pub min_y: f64,
    pub resolution: Resolution,
    pub formatter: &'static str,
    pub series: Vec<RenderedSeries>,
    pub x_labels: Vec<AxisLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
    pub annotations: Vec<Annotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_refresh: Option<String>,
}
