// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc, time::Duration};
use anyhow::Context;
use axum::{routing::{get, post}, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chart_feed::application::chart_service::PollingChart;
use chart_feed::application::series_source::SeriesSource;
use chart_feed::infrastructure::config::{load_config, AppConfig};
use chart_feed::infrastructure::http_source::HttpSeriesSource;
use chart_feed::infrastructure::snapshot_renderer::SnapshotRenderer;
use chart_feed::infrastructure::static_source::StaticSeriesSource;
use chart_feed::presentation::app_state::AppState;
use chart_feed::presentation::handlers::{
    export_csv, get_chart, health_check, list_charts, refresh_chart, register_item, set_resolution,
    toggle_item,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_config()?;

    // Create charts (application layer) over their sources (infrastructure layer)
    let charts = build_charts(&config)?;

    // Render every chart once before serving, then keep polling charts fresh
    let initial = futures::future::join_all(charts.iter().map(|c| c.refresh())).await;
    for (chart, result) in charts.iter().zip(initial) {
        if let Err(e) = result {
            tracing::warn!("Initial render of chart {} failed: {}", chart.id(), e);
        }
    }
    for chart in &charts {
        tokio::spawn(chart.clone().poll());
    }

    let state = Arc::new(AppState { charts });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/charts", get(list_charts))
        .route("/charts/:id", get(get_chart))
        .route("/charts/:id/csv", get(export_csv))
        .route("/charts/:id/refresh", post(refresh_chart))
        .route("/charts/:id/items", post(register_item))
        .route("/charts/:id/items/:name/toggle", post(toggle_item))
        .route("/charts/:id/resolution/:resolution", post(set_resolution))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.server.bind))?;
    tracing::info!("Starting chart-feed service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

fn build_charts(config: &AppConfig) -> anyhow::Result<Vec<Arc<PollingChart>>> {
    let client = match &config.source {
        Some(source) => Some(
            reqwest::Client::builder()
                .connect_timeout(Duration::from_millis(source.connect_timeout_ms))
                .build()
                .context("Failed to build HTTP client")?,
        ),
        None => None,
    };
    let renderer = Arc::new(SnapshotRenderer);

    let mut charts = Vec::with_capacity(config.charts.len());
    for settings in &config.charts {
        let chart_config = settings.to_chart_config()?;

        let source: Arc<dyn SeriesSource> = match (&settings.data_path, &config.source, &client) {
            (Some(path), Some(source), Some(client)) => Arc::new(HttpSeriesSource::new(
                client.clone(),
                source.base_url.clone(),
                path.clone(),
            )),
            (Some(_), _, _) => {
                anyhow::bail!("Chart {} has a data_path but no [source] is configured", settings.id)
            }
            (None, _, _) => {
                if chart_config.is_polling {
                    tracing::warn!("Chart {} polls inline series; every poll renders the same data", settings.id);
                }
                Arc::new(StaticSeriesSource::new(settings.series.clone()))
            }
        };

        let chart = PollingChart::new(chart_config, source, renderer.clone());
        for item in &settings.items {
            chart.register_data_item(&item.id, &item.name, &item.color);
            if item.active {
                chart.activate_on_start(&item.name)?;
            }
        }

        charts.push(Arc::new(chart));
    }

    tracing::info!("Configured {} charts", charts.len());
    Ok(charts)
}
