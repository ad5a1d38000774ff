//! Candlestick chart refresh driven by ranking row selections.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::endpoints::BackendEndpoints;
use crate::fetch::JsonFetcher;
use crate::payload::ChartPayload;
use crate::ranking_table::{RankingTableView, SelectionEvent};
use crate::surface::{ChartSurface, Notifier, CANDLE_CHART_CONTAINER_ID};

pub const CANDLE_CHART_FAILED_MESSAGE: &str = "Failed to build the candlestick chart.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Rendered { ticker: String },
    MissingTicker,
    InvalidPayload,
    Failed,
    /// A newer refresh started while this one was in flight.
    Superseded,
}

pub struct CandleChartRefresher {
    fetcher: Arc<dyn JsonFetcher>,
    chart: Arc<dyn ChartSurface>,
    notifier: Arc<dyn Notifier>,
    endpoints: BackendEndpoints,
    container_id: String,
    drop_stale_responses: bool,
    latest_request: AtomicU64,
}

impl CandleChartRefresher {
    pub fn new(
        fetcher: Arc<dyn JsonFetcher>,
        chart: Arc<dyn ChartSurface>,
        notifier: Arc<dyn Notifier>,
        endpoints: BackendEndpoints,
    ) -> Self {
        Self {
            fetcher,
            chart,
            notifier,
            endpoints,
            container_id: CANDLE_CHART_CONTAINER_ID.to_string(),
            drop_stale_responses: true,
            latest_request: AtomicU64::new(0),
        }
    }

    pub fn with_container_id(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = container_id.into();
        self
    }

    /// With `false`, overlapping refreshes race and the last response to
    /// arrive owns the chart.
    pub fn with_stale_response_guard(mut self, enabled: bool) -> Self {
        self.drop_stale_responses = enabled;
        self
    }

    /// Registers this refresher as a selection handler on `view`.
    pub fn attach(self: &Arc<Self>, view: &RankingTableView) {
        let refresher = Arc::clone(self);
        view.on_row_selected(move |selection| {
            refresher.handle_selection(selection);
        });
    }

    pub fn handle_selection(&self, selection: &SelectionEvent) -> RefreshOutcome {
        let Some(ticker) = selection.ticker() else {
            let columns: Vec<&str> = selection
                .values()
                .iter()
                .map(|(key, _)| key.as_str())
                .collect();
            warn!(
                component = "candle_chart",
                event = "candle.ticker_missing",
                columns = ?columns
            );
            return RefreshOutcome::MissingTicker;
        };

        info!(component = "candle_chart", event = "candle.refresh", ticker);
        self.refresh(ticker)
    }

    pub fn refresh(&self, ticker: &str) -> RefreshOutcome {
        let sequence = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        let url = self.endpoints.candle_chart_url(ticker);

        let value = match self.fetcher.fetch_json(&url) {
            Ok(value) => value,
            Err(err) => {
                error!(
                    component = "candle_chart",
                    event = "candle.fetch.error",
                    ticker,
                    url = %url,
                    kind = err.kind(),
                    error = %err
                );
                self.notifier.notify_failure(CANDLE_CHART_FAILED_MESSAGE);
                return RefreshOutcome::Failed;
            }
        };

        let payload = match ChartPayload::from_value(value) {
            Ok(payload) => payload,
            Err(err) => {
                error!(
                    component = "candle_chart",
                    event = "candle.payload.invalid",
                    ticker,
                    url = %url,
                    error = %err
                );
                return RefreshOutcome::InvalidPayload;
            }
        };

        if self.drop_stale_responses && self.latest_request.load(Ordering::SeqCst) != sequence {
            debug!(
                component = "candle_chart",
                event = "candle.response.superseded",
                ticker,
                sequence
            );
            return RefreshOutcome::Superseded;
        }

        self.chart.new_plot(&self.container_id, payload.plot_spec());
        RefreshOutcome::Rendered {
            ticker: ticker.to_string(),
        }
    }
}
