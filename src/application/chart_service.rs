// Polling chart - Drives fetch, aggregate, reconcile and render for one chart
use crate::application::aggregator::recompute_by_time;
use crate::application::export::{to_csv, CsvDelimiter};
use crate::application::reconciler::reconcile;
use crate::application::render_backend::{RefreshTimes, RenderBackend, RenderContext, RenderedChart};
use crate::application::series_source::SeriesSource;
use crate::domain::chart::ChartConfig;
use crate::domain::data_item::{DataItem, DataItemRegistry};
use crate::domain::error::ChartError;
use crate::domain::resolution::Resolution;
use crate::domain::series::Series;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Overflow,
    Fetch,
    InvalidStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum ChartState {
    Idle,
    Fetching,
    Aggregating,
    Reconciling,
    Rendered,
    Failed(FailureKind),
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("Fetching series failed: {0:#}")]
    Fetch(anyhow::Error),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("Refresh task ended before finishing: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Rendered(Arc<RenderedChart>),
    /// A refresh was already running; it will run once more when done
    Coalesced,
}

struct ChartInner {
    state: ChartState,
    in_flight: bool,
    pending: bool,
    resolution: Resolution,
    registry: DataItemRegistry,
    series: Vec<Series>,
    rendered: Option<Arc<RenderedChart>>,
}

pub struct PollingChart {
    config: ChartConfig,
    source: Arc<dyn SeriesSource>,
    renderer: Arc<dyn RenderBackend>,
    inner: Mutex<ChartInner>,
}

/// Releases the chart if a refresh pass ends without finishing its loop
struct InFlight<'a> {
    chart: &'a PollingChart,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let mut inner = self.chart.lock();
            inner.in_flight = false;
            inner.pending = false;
            if matches!(
                inner.state,
                ChartState::Fetching | ChartState::Aggregating | ChartState::Reconciling
            ) {
                inner.state = ChartState::Idle;
            }
        }
    }
}

impl PollingChart {
    pub fn new(config: ChartConfig, source: Arc<dyn SeriesSource>, renderer: Arc<dyn RenderBackend>) -> Self {
        let inner = ChartInner {
            state: ChartState::Idle,
            in_flight: false,
            pending: false,
            resolution: config.resolution,
            registry: DataItemRegistry::new(),
            series: Vec::new(),
            rendered: None,
        };

        Self {
            config,
            source,
            renderer,
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChartInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ChartState) {
        self.lock().state = state;
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn state(&self) -> ChartState {
        self.lock().state
    }

    pub fn resolution(&self) -> Resolution {
        self.lock().resolution
    }

    /// Last successful render, kept across failed cycles
    pub fn rendered(&self) -> Option<Arc<RenderedChart>> {
        self.lock().rendered.clone()
    }

    pub fn series(&self) -> Vec<Series> {
        self.lock().series.clone()
    }

    pub fn to_csv(&self, delimiter: CsvDelimiter) -> String {
        to_csv(&self.lock().series, delimiter)
    }

    pub fn data_items(&self) -> Vec<DataItem> {
        self.lock().registry.items().to_vec()
    }

    /// Register a metric. New items are inactive and do not trigger a refresh.
    pub fn register_data_item(&self, id: &str, name: &str, color: &str) {
        self.lock().registry.register(id, name, color);
        tracing::debug!("Chart {}: registered data item '{}'", self.config.id, name);
    }

    /// Mark a registered metric active without refetching, for start-up
    pub fn activate_on_start(&self, name: &str) -> Result<(), ChartError> {
        let mut inner = self.lock();
        if !inner.registry.is_active(name)? {
            inner.registry.toggle(name)?;
        }
        Ok(())
    }

    /// Flip a metric on or off and refetch. Returns the new active state.
    pub async fn toggle_data_item(self: &Arc<Self>, name: &str) -> Result<bool, ChartError> {
        let active = self.lock().registry.toggle(name)?;
        tracing::info!(
            "Chart {}: {} series '{}'",
            self.config.id,
            if active { "adding" } else { "removing" },
            name
        );

        if let Err(e) = self.refresh().await {
            tracing::warn!("Chart {}: refresh after toggling '{}' failed: {}", self.config.id, name, e);
        }
        Ok(active)
    }

    /// Change the time resolution, refetching only when it actually changed
    pub async fn set_resolution(self: &Arc<Self>, resolution: Resolution) -> bool {
        {
            let mut inner = self.lock();
            if inner.resolution == resolution {
                return false;
            }
            inner.resolution = resolution;
        }

        tracing::info!("Chart {}: resolution set to {}", self.config.id, resolution);
        if let Err(e) = self.refresh().await {
            tracing::warn!("Chart {}: refresh after resolution change failed: {}", self.config.id, e);
        }
        true
    }

    /// Run one fetch-aggregate-reconcile-render pass.
    ///
    /// If a pass is already in flight this returns `Coalesced` immediately and
    /// the running pass repeats once when it finishes. Any number of triggers
    /// during one pass collapse into that single repeat.
    ///
    /// The pass runs on its own task, so a caller that stops waiting does not
    /// cancel it or the repeat queued behind it.
    pub async fn refresh(self: &Arc<Self>) -> Result<RefreshOutcome, RefreshError> {
        {
            let mut inner = self.lock();
            if inner.in_flight {
                inner.pending = true;
                tracing::debug!("Chart {}: refresh already in flight, queued", self.config.id);
                return Ok(RefreshOutcome::Coalesced);
            }
            inner.in_flight = true;
        }

        let chart = Arc::clone(self);
        let pass = tokio::spawn(async move { chart.run_until_settled().await });
        pass.await?.map(RefreshOutcome::Rendered)
    }

    async fn run_until_settled(&self) -> Result<Arc<RenderedChart>, RefreshError> {
        let mut guard = InFlight {
            chart: self,
            finished: false,
        };

        loop {
            let result = self.run_cycle().await;

            let repeat = {
                let mut inner = self.lock();
                let repeat = std::mem::take(&mut inner.pending);
                if !repeat {
                    inner.in_flight = false;
                }
                repeat
            };
            if !repeat {
                guard.finished = true;
                return result;
            }
            tracing::debug!("Chart {}: running queued refresh", self.config.id);
        }
    }

    async fn run_cycle(&self) -> Result<Arc<RenderedChart>, RefreshError> {
        let (query, resolution, active) = {
            let mut inner = self.lock();
            inner.state = ChartState::Fetching;
            let active: Option<HashSet<String>> = inner
                .registry
                .has_active()
                .then(|| inner.registry.active().map(|i| i.name.clone()).collect());
            let query = if inner.registry.items().is_empty() {
                String::new()
            } else {
                inner.registry.query_string()
            };
            (query, inner.resolution, active)
        };

        let fetched = match self.source.fetch_series(&query).await {
            Ok(series) => series,
            Err(e) => {
                tracing::error!("Chart {}: fetching series failed: {:#}", self.config.id, e);
                self.set_state(ChartState::Failed(FailureKind::Fetch));
                return Err(RefreshError::Fetch(e));
            }
        };

        self.set_state(ChartState::Aggregating);
        let mut series: Vec<Series> = fetched
            .into_iter()
            .filter(|s| active.as_ref().is_none_or(|names| names.contains(&s.name)))
            .map(|mut s| {
                s.data = recompute_by_time(std::mem::take(&mut s.data), resolution);
                s
            })
            .collect();

        self.set_state(ChartState::Reconciling);
        if let Err(e) = reconcile(&mut series, (&self.config).into()) {
            let kind = match &e {
                ChartError::InvalidStep(_) | ChartError::StepOutOfRange { .. } => FailureKind::InvalidStep,
                _ => FailureKind::Overflow,
            };
            tracing::error!("Chart {}: {}; keeping last render", self.config.id, e);
            self.set_state(ChartState::Failed(kind));
            return Err(e.into());
        }

        let context = RenderContext {
            resolution,
            refresh: self.config.show_refresh_times.then(|| {
                RefreshTimes::starting_now(self.config.is_polling.then_some(self.config.poll_interval))
            }),
        };
        let rendered = Arc::new(self.renderer.render(&series, &self.config, context));

        tracing::debug!(
            "Chart {}: rendered {} series at {} resolution",
            self.config.id,
            series.len(),
            resolution
        );

        let mut inner = self.lock();
        inner.series = series;
        inner.rendered = Some(rendered.clone());
        inner.state = ChartState::Rendered;
        Ok(rendered)
    }

    /// Poll on the chart's interval, starting one interval from now.
    /// Returns immediately for charts that are not polled.
    pub async fn poll(self: Arc<Self>) {
        if !self.config.is_polling {
            tracing::debug!("Chart {} is not polled", self.config.id);
            return;
        }

        let period = self.config.poll_interval;
        tracing::info!(
            "Starting poller for chart {} (interval: {}ms)",
            self.config.id,
            period.as_millis()
        );

        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = self.refresh().await {
                tracing::warn!("Chart {}: poll failed, retrying next interval: {}", self.config.id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::DataPoint;
    use crate::infrastructure::snapshot_renderer::SnapshotRenderer;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};

    const DAY: i64 = 86400;

    /// Source that replays queued responses, and can hold each fetch until
    /// the test releases it.
    struct ScriptedSource {
        responses: Mutex<VecDeque<anyhow::Result<Vec<Series>>>>,
        fallback: Vec<Series>,
        queries: Mutex<Vec<String>>,
        calls: AtomicUsize,
        entered: Notify,
        release: Semaphore,
    }

    impl ScriptedSource {
        fn new(fallback: Vec<Series>) -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                fallback,
                queries: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                entered: Notify::new(),
                release: Semaphore::new(Semaphore::MAX_PERMITS),
            }
        }

        fn gated(fallback: Vec<Series>) -> Self {
            Self {
                release: Semaphore::new(0),
                ..Self::new(fallback)
            }
        }

        fn push(&self, response: anyhow::Result<Vec<Series>>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SeriesSource for ScriptedSource {
        async fn fetch_series(&self, query: &str) -> anyhow::Result<Vec<Series>> {
            self.queries.lock().unwrap().push(query.to_string());
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.acquire().await?.forget();

            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }

    fn raw_series() -> Vec<Series> {
        vec![
            Series::new(
                "edits",
                "red",
                vec![DataPoint::new(DAY + 10, 1.0), DataPoint::new(DAY + 20, 2.0)],
            ),
            Series::new("reverts", "blue", vec![DataPoint::new(3 * DAY + 5, 4.0)]),
        ]
    }

    fn chart(source: Arc<ScriptedSource>, config: ChartConfig) -> Arc<PollingChart> {
        Arc::new(PollingChart::new(config, source, Arc::new(SnapshotRenderer)))
    }

    /// Wait until `calls` fetches have happened and the pass has finished
    async fn settle(chart: &PollingChart, source: &ScriptedSource, calls: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while source.calls() < calls || chart.lock().in_flight {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("chart did not settle");
    }

    #[tokio::test]
    async fn test_refresh_aggregates_and_reconciles() {
        let source = Arc::new(ScriptedSource::new(raw_series()));
        let chart = chart(source.clone(), ChartConfig::new("1"));
        assert_eq!(chart.state(), ChartState::Idle);

        let outcome = chart.refresh().await.unwrap();

        assert!(matches!(outcome, RefreshOutcome::Rendered(_)));
        assert_eq!(chart.state(), ChartState::Rendered);
        assert_eq!(source.queries(), vec![String::new()]);

        let series = chart.series();
        assert_eq!(
            series[0].data,
            vec![
                DataPoint::new(DAY, 3.0),
                DataPoint::new(2 * DAY, 0.0),
                DataPoint::new(3 * DAY, 0.0),
            ]
        );
        assert_eq!(
            series[1].data,
            vec![
                DataPoint::new(DAY, 0.0),
                DataPoint::new(2 * DAY, 0.0),
                DataPoint::new(3 * DAY, 4.0),
            ]
        );

        let csv = chart.to_csv(CsvDelimiter::Comma);
        assert!(csv.starts_with("name,x,y\nedits,86400,3\n"));
    }

    #[tokio::test]
    async fn test_overflow_keeps_last_render() {
        let source = Arc::new(ScriptedSource::new(raw_series()));
        let mut config = ChartConfig::new("1");
        config.resolution = Resolution::None;
        config.step = 1;
        config.max_points = 1_000;
        let chart = chart(source.clone(), config);

        source.push(Ok(vec![Series::new("edits", "red", vec![DataPoint::new(0, 1.0)])]));
        let first = match chart.refresh().await.unwrap() {
            RefreshOutcome::Rendered(rendered) => rendered,
            RefreshOutcome::Coalesced => panic!("nothing else was running"),
        };

        let err = chart.refresh().await.unwrap_err();

        assert!(matches!(err, RefreshError::Chart(ChartError::Overflow { .. })));
        assert_eq!(chart.state(), ChartState::Failed(FailureKind::Overflow));
        let kept = chart.rendered().unwrap();
        assert!(Arc::ptr_eq(&first, &kept));
        assert_eq!(chart.series()[0].data, vec![DataPoint::new(0, 1.0)]);
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_stop_next_poll() {
        let source = Arc::new(ScriptedSource::new(raw_series()));
        source.push(Err(anyhow::anyhow!("connection refused")));
        let chart = chart(source.clone(), ChartConfig::new("1"));

        let err = chart.refresh().await.unwrap_err();
        assert!(matches!(err, RefreshError::Fetch(_)));
        assert_eq!(chart.state(), ChartState::Failed(FailureKind::Fetch));
        assert!(chart.rendered().is_none());

        chart.refresh().await.unwrap();
        assert_eq!(chart.state(), ChartState::Rendered);
    }

    #[tokio::test]
    async fn test_refresh_while_fetching_is_coalesced() {
        let source = Arc::new(ScriptedSource::gated(raw_series()));
        let chart = chart(source.clone(), ChartConfig::new("1"));

        let running = tokio::spawn({
            let chart = chart.clone();
            async move { chart.refresh().await }
        });
        source.entered.notified().await;
        assert_eq!(chart.state(), ChartState::Fetching);

        assert!(matches!(chart.refresh().await, Ok(RefreshOutcome::Coalesced)));
        assert!(matches!(chart.refresh().await, Ok(RefreshOutcome::Coalesced)));
        assert_eq!(source.calls(), 1);

        source.release.add_permits(2);
        let outcome = running.await.unwrap().unwrap();

        assert!(matches!(outcome, RefreshOutcome::Rendered(_)));
        assert_eq!(source.calls(), 2);
        assert_eq!(chart.state(), ChartState::Rendered);

        source.release.add_permits(1);
        assert!(matches!(chart.refresh().await, Ok(RefreshOutcome::Rendered(_))));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_cancel_pass() {
        let source = Arc::new(ScriptedSource::gated(raw_series()));
        let chart = chart(source.clone(), ChartConfig::new("1"));

        let running = tokio::spawn({
            let chart = chart.clone();
            async move { chart.refresh().await }
        });
        source.entered.notified().await;
        running.abort();
        let _ = running.await;

        source.release.add_permits(1);
        settle(&chart, &source, 1).await;
        assert_eq!(chart.state(), ChartState::Rendered);
        assert!(chart.rendered().is_some());

        source.release.add_permits(1);
        assert!(matches!(chart.refresh().await, Ok(RefreshOutcome::Rendered(_))));
    }

    #[tokio::test]
    async fn test_toggle_queued_behind_dropped_caller_still_refetches() {
        let source = Arc::new(ScriptedSource::gated(raw_series()));
        let chart = chart(source.clone(), ChartConfig::new("1"));
        chart.register_data_item("11", "edits", "red");

        let running = tokio::spawn({
            let chart = chart.clone();
            async move { chart.refresh().await }
        });
        source.entered.notified().await;

        assert_eq!(chart.toggle_data_item("edits").await, Ok(true));
        running.abort();
        let _ = running.await;

        source.release.add_permits(2);
        settle(&chart, &source, 2).await;

        assert_eq!(chart.state(), ChartState::Rendered);
        assert_eq!(
            source.queries(),
            vec![
                "ids=&names=&colors=".to_string(),
                "ids=11&names=edits&colors=red".to_string(),
            ]
        );
        let rendered = chart.rendered().unwrap();
        assert_eq!(rendered.series.len(), 1);
        assert_eq!(rendered.series[0].name, "edits");
    }

    #[tokio::test]
    async fn test_toggle_filters_series_and_rebuilds_query() {
        let source = Arc::new(ScriptedSource::new(raw_series()));
        let chart = chart(source.clone(), ChartConfig::new("1"));
        chart.register_data_item("11", "edits", "red");
        chart.register_data_item("12", "reverts", "blue");

        assert_eq!(chart.toggle_data_item("edits").await, Ok(true));

        assert_eq!(source.queries(), vec!["ids=11&names=edits&colors=red".to_string()]);
        let rendered = chart.rendered().unwrap();
        assert_eq!(rendered.series.len(), 1);
        assert_eq!(rendered.series[0].name, "edits");
        assert!(chart.data_items()[0].active);

        assert_eq!(
            chart.toggle_data_item("missing").await,
            Err(ChartError::UnknownDataItem("missing".to_string()))
        );
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_resolution_change_refreshes_once() {
        let source = Arc::new(ScriptedSource::new(raw_series()));
        let chart = chart(source.clone(), ChartConfig::new("1"));

        assert!(!chart.set_resolution(Resolution::Daily).await);
        assert_eq!(source.calls(), 0);

        assert!(chart.set_resolution(Resolution::Hourly).await);
        assert_eq!(source.calls(), 1);
        assert_eq!(chart.resolution(), Resolution::Hourly);
        assert_eq!(chart.rendered().unwrap().resolution, Resolution::Hourly);
    }

    #[tokio::test]
    async fn test_non_polling_chart_does_not_poll() {
        let source = Arc::new(ScriptedSource::new(raw_series()));
        let chart = chart(source.clone(), ChartConfig::new("1"));

        chart.clone().poll().await;

        assert_eq!(source.calls(), 0);
        assert_eq!(chart.state(), ChartState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_refetches_every_interval() {
        let source = Arc::new(ScriptedSource::new(raw_series()));
        source.push(Err(anyhow::anyhow!("connection refused")));
        let mut config = ChartConfig::new("1");
        config.is_polling = true;
        config.poll_interval = Duration::from_secs(60);
        let chart = chart(source.clone(), config);

        let poller = tokio::spawn(chart.clone().poll());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(chart.state(), ChartState::Failed(FailureKind::Fetch));
        assert!(chart.rendered().is_none());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(chart.state(), ChartState::Rendered);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), 3);
        assert_eq!(chart.state(), ChartState::Rendered);

        poller.abort();
    }

    #[tokio::test]
    async fn test_next_refresh_only_for_polled_charts() {
        let source = Arc::new(ScriptedSource::new(raw_series()));
        let mut config = ChartConfig::new("1");
        config.show_refresh_times = true;
        let on_demand = chart(source.clone(), config.clone());
        config.is_polling = true;
        let polled = chart(source, config);

        on_demand.refresh().await.unwrap();
        polled.refresh().await.unwrap();

        let rendered = on_demand.rendered().unwrap();
        assert!(rendered.refreshed_at.is_some());
        assert!(rendered.next_refresh.is_none());
        assert!(polled.rendered().unwrap().next_refresh.is_some());
    }

    #[test]
    fn test_activate_on_start() {
        let source = Arc::new(ScriptedSource::new(raw_series()));
        let chart = chart(source.clone(), ChartConfig::new("1"));
        chart.register_data_item("11", "edits", "red");

        chart.activate_on_start("edits").unwrap();
        chart.activate_on_start("edits").unwrap();

        assert!(chart.data_items()[0].active);
        assert_eq!(source.calls(), 0);
        assert!(chart.activate_on_start("missing").is_err());
    }
}
