// HTTP request handlers
use crate::application::chart_service::{ChartState, RefreshError, RefreshOutcome};
use crate::application::export::CsvDelimiter;
use crate::domain::error::ChartError;
use crate::domain::resolution::Resolution;
use crate::infrastructure::http_response::{accepts_brotli, csv_response, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct CsvQuery {
    pub delimiter: Option<CsvDelimiter>,
}

#[derive(Deserialize)]
pub struct RegisterItemRequest {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Serialize)]
pub struct ChartSummary {
    pub id: String,
    #[serde(flatten)]
    pub state: ChartState,
    pub resolution: Resolution,
    pub polling: bool,
}

fn not_found(id: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("Unknown chart '{}'", id)).into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List all charts with their current state
pub async fn list_charts(State(state): State<Arc<AppState>>) -> Json<Vec<ChartSummary>> {
    let summaries = state
        .charts
        .iter()
        .map(|c| ChartSummary {
            id: c.id().to_string(),
            state: c.state(),
            resolution: c.resolution(),
            polling: c.config().is_polling,
        })
        .collect();

    Json(summaries)
}

/// Last rendered document for a chart
pub async fn get_chart(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(chart) = state.chart(&id) else {
        return not_found(&id);
    };

    let Some(rendered) = chart.rendered() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Chart has not been rendered yet").into_response();
    };

    match json_response(rendered.as_ref(), accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Export a chart's current series as CSV
pub async fn export_csv(
    Path(id): Path<String>,
    Query(query): Query<CsvQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(chart) = state.chart(&id) else {
        return not_found(&id);
    };

    let csv = chart.to_csv(query.delimiter.unwrap_or_default());
    match csv_response(csv).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Trigger a refresh out of band from the chart's timer
pub async fn refresh_chart(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let Some(chart) = state.chart(&id) else {
        return not_found(&id);
    };

    match chart.refresh().await {
        Ok(RefreshOutcome::Rendered(_)) => Json(serde_json::json!({ "outcome": "rendered" })).into_response(),
        Ok(RefreshOutcome::Coalesced) => {
            (StatusCode::ACCEPTED, Json(serde_json::json!({ "outcome": "coalesced" }))).into_response()
        }
        Err(e @ RefreshError::Fetch(_)) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
        Err(e @ RefreshError::Chart(_)) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
        Err(e @ RefreshError::Interrupted(_)) => {
            tracing::error!("Chart {}: {}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Register a new (inactive) data item on a chart
pub async fn register_item(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterItemRequest>,
) -> Response {
    let Some(chart) = state.chart(&id) else {
        return not_found(&id);
    };

    chart.register_data_item(&request.id, &request.name, &request.color);
    (StatusCode::CREATED, Json(chart.data_items())).into_response()
}

/// Toggle a data item and refetch the chart
pub async fn toggle_item(
    Path((id, name)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(chart) = state.chart(&id) else {
        return not_found(&id);
    };

    match chart.toggle_data_item(&name).await {
        Ok(active) => Json(serde_json::json!({ "name": name, "active": active })).into_response(),
        Err(e @ ChartError::UnknownDataItem(_)) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
        Err(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
    }
}

/// Switch a chart's time resolution
pub async fn set_resolution(
    Path((id, resolution)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(chart) = state.chart(&id) else {
        return not_found(&id);
    };

    let resolution: Resolution = match resolution.parse() {
        Ok(r) => r,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("{}", e)).into_response(),
    };

    let changed = chart.set_resolution(resolution).await;
    Json(serde_json::json!({ "resolution": resolution, "changed": changed })).into_response()
}
