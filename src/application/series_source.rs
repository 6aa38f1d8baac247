// Source trait for chart series data
use crate::domain::series::Series;
use async_trait::async_trait;

#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Fetch the raw series for a chart. `query` is the data item query string
    /// (`ids=..&names=..&colors=..`), empty when the chart has no data items.
    async fn fetch_series(&self, query: &str) -> anyhow::Result<Vec<Series>>;
}
