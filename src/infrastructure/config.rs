use crate::domain::chart::{Annotation, ChartConfig, Docs, RenderType};
use crate::domain::formatter::Formatter;
use crate::domain::resolution::Resolution;
use crate::domain::series::Series;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub source: Option<SourceSettings>,
    #[serde(default)]
    pub charts: Vec<ChartSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    pub base_url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataItemSettings {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartSettings {
    pub id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub min_y: Option<f64>,
    #[serde(default)]
    pub is_polling: bool,
    pub resolution: Option<Resolution>,
    pub formatter: Option<String>,
    pub render_type: Option<String>,
    pub docs: Option<Docs>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub show_refresh_times: bool,
    pub step: Option<i64>,
    pub default_y: Option<f64>,
    pub max_points: Option<usize>,
    pub poll_interval_ms: Option<u64>,
    /// Path on the polled source, required for polling charts
    pub data_path: Option<String>,
    #[serde(default)]
    pub items: Vec<DataItemSettings>,
    /// Inline series for charts that are not polled
    #[serde(default)]
    pub series: Vec<Series>,
}

impl ChartSettings {
    pub fn to_chart_config(&self) -> anyhow::Result<ChartConfig> {
        let mut config = ChartConfig::new(self.id.clone());

        if let Some(tag) = &self.render_type {
            let (render_type, unstacked) = RenderType::parse(tag)
                .ok_or_else(|| anyhow::anyhow!("Chart {}: unknown render type '{}'", self.id, tag))?;
            config.render_type = render_type;
            config.unstacked = unstacked;
        }

        if let Some(step) = self.step {
            anyhow::ensure!(step > 0, "Chart {}: step must be positive, got {}", self.id, step);
            config.step = step;
        }

        config.width = self.width.unwrap_or(config.width);
        config.height = self.height.unwrap_or(config.height);
        config.min_y = self.min_y.unwrap_or(config.min_y);
        config.is_polling = self.is_polling;
        config.resolution = self.resolution.unwrap_or(config.resolution);
        config.formatter = self
            .formatter
            .as_deref()
            .map(Formatter::from_name)
            .unwrap_or_default();
        config.docs = self.docs.clone();
        config.annotations = self.annotations.clone();
        config.show_refresh_times = self.show_refresh_times;
        config.default_y = self.default_y.unwrap_or(config.default_y);
        config.max_points = self.max_points.unwrap_or(config.max_points);
        if let Some(ms) = self.poll_interval_ms {
            anyhow::ensure!(ms > 0, "Chart {}: poll_interval_ms must be positive", self.id);
            config.poll_interval = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

/// Load `config/charts.*`, overridden by `CHART_FEED__*` environment variables
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/charts"))
        .add_source(config::Environment::with_prefix("CHART_FEED").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Join the source base URL, a chart's data path, and its item query
pub fn build_data_url(base_url: &str, path: &str, query: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if query.is_empty() {
        format!("{}/{}", base, path)
    } else {
        format!("{}/{}?{}", base, path, query)
    }
}
