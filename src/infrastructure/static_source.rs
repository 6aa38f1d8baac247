// Static series source - Serves series given inline in the chart config
use crate::application::series_source::SeriesSource;
use crate::domain::series::Series;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct StaticSeriesSource {
    series: Vec<Series>,
}

impl StaticSeriesSource {
    pub fn new(series: Vec<Series>) -> Self {
        Self { series }
    }
}

#[async_trait]
impl SeriesSource for StaticSeriesSource {
    async fn fetch_series(&self, _query: &str) -> anyhow::Result<Vec<Series>> {
        Ok(self.series.clone())
    }
}
