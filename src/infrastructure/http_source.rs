// HTTP series source - Polls a chart data endpoint
use crate::application::series_source::SeriesSource;
use crate::domain::series::Series;
use crate::infrastructure::config::build_data_url;
use anyhow::{Context, Result};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct HttpSeriesSource {
    client: reqwest::Client,
    base_url: String,
    path: String,
}

impl HttpSeriesSource {
    pub fn new(client: reqwest::Client, base_url: String, path: String) -> Self {
        Self {
            client,
            base_url,
            path,
        }
    }
}

#[async_trait]
impl SeriesSource for HttpSeriesSource {
    async fn fetch_series(&self, query: &str) -> Result<Vec<Series>> {
        let url = build_data_url(&self.base_url, &self.path, query);
        tracing::debug!("Fetching series from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to series endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Series request failed with status {}: {}", status, body);
        }

        let series = response
            .json::<Vec<Series>>()
            .await
            .context("Failed to parse series response")?;

        tracing::debug!("Fetched {} series from {}", series.len(), url);
        Ok(series)
    }
}
