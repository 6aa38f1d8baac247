// Snapshot renderer - Builds a serializable chart document for browser clients
use crate::application::render_backend::{
    AxisLabel, RenderBackend, RenderContext, RenderedChart, RenderedPoint, RenderedSeries,
};
use crate::domain::chart::{Annotation, ChartConfig, Docs};
use crate::domain::series::{Bounds, Series};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct SnapshotRenderer;

impl RenderBackend for SnapshotRenderer {
    fn render(&self, series: &[Series], config: &ChartConfig, context: RenderContext) -> RenderedChart {
        let formatter = config.formatter;

        let rendered_series: Vec<RenderedSeries> = series
            .iter()
            .map(|s| RenderedSeries {
                name: s.name.clone(),
                color: s.color.clone(),
                points: s
                    .data
                    .iter()
                    .map(|p| RenderedPoint {
                        x: p.x,
                        y: p.y,
                        hover: formatter.hover(s, p.x, p.y),
                    })
                    .collect(),
                docs: formatter
                    .docs_for(config.docs.as_ref(), &s.name)
                    .map(str::to_string),
            })
            .collect();

        let xs: BTreeSet<i64> = series.iter().flat_map(|s| s.data.iter().map(|p| p.x)).collect();
        let bounds = match (xs.first(), xs.last()) {
            (Some(&min_x), Some(&max_x)) => Some(Bounds { min_x, max_x }),
            _ => None,
        };
        let x_labels = xs
            .iter()
            .map(|&x| AxisLabel {
                x,
                label: formatter.x_label(x),
            })
            .collect();

        RenderedChart {
            id: config.id.clone(),
            width: config.width,
            height: config.height,
            render_type: config.render_type,
            unstacked: config.unstacked,
            min_y: config.min_y,
            resolution: context.resolution,
            formatter: formatter.name(),
            series: rendered_series,
            x_labels,
            docs: chart_docs(config),
            annotations: build_annotations(&config.id, &config.annotations, bounds),
            refreshed_at: context.refresh.map(|r| r.refreshed_at.to_rfc2822()),
            next_refresh: context
                .refresh
                .and_then(|r| r.next_refresh)
                .map(|t| t.to_rfc2822()),
        }
    }
}

fn chart_docs(config: &ChartConfig) -> Option<String> {
    match &config.docs {
        Some(Docs::Text(text)) => Some(text.clone()),
        // Per-series docs travel with each series
        Some(Docs::PerSeries(_)) => None,
        None => {
            tracing::debug!("No docs for chart {}, skipping docs section", config.id);
            None
        }
    }
}

/// Keep the annotations that can be placed on the rendered range.
/// Each one is checked on its own; a bad entry is logged and skipped.
fn build_annotations(chart_id: &str, annotations: &[Annotation], bounds: Option<Bounds>) -> Vec<Annotation> {
    let Some(bounds) = bounds else {
        if !annotations.is_empty() {
            tracing::debug!("Chart {} has no data, skipping {} annotations", chart_id, annotations.len());
        }
        return Vec::new();
    };

    annotations
        .iter()
        .filter(|a| {
            if a.message.trim().is_empty() {
                tracing::warn!("Failed to add annotation at {} on chart {}: empty message", a.timestamp, chart_id);
                return false;
            }
            if !bounds.contains(a.timestamp) {
                tracing::warn!(
                    "Failed to add annotation '{}' on chart {}: {} is outside {}..{}",
                    a.message,
                    chart_id,
                    a.timestamp,
                    bounds.min_x,
                    bounds.max_x
                );
                return false;
            }
            true
        })
        .cloned()
        .collect()
}
