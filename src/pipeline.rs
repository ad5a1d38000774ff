//! Pipeline run: fetch the combined chart/ranking result for a reference
//! date, draw the chart and populate the ranking table.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::endpoints::{reference_date_from_input, BackendEndpoints};
use crate::fetch::{FetchError, JsonFetcher};
use crate::payload::{ChartPayload, PayloadError};
use crate::ranking_table::RankingTable;
use crate::surface::{ChartSurface, Notifier, PIPELINE_CHART_CONTAINER_ID};

pub const PIPELINE_FAILED_MESSAGE: &str = "Failed to run the pipeline.";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("pipeline response from {url} is invalid: {source}")]
    InvalidPayload {
        url: String,
        #[source]
        source: PayloadError,
    },
}

/// Where the ranking table got its records from on a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingPopulation {
    Embedded,
    Fetched,
    /// No table capability was wired in.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Rendered { ranking: RankingPopulation },
    Failed,
}

pub struct PipelineController {
    fetcher: Arc<dyn JsonFetcher>,
    chart: Arc<dyn ChartSurface>,
    notifier: Arc<dyn Notifier>,
    endpoints: BackendEndpoints,
    chart_container_id: String,
    ranking_table: Option<Arc<dyn RankingTable>>,
}

impl PipelineController {
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
            chart_container_id: PIPELINE_CHART_CONTAINER_ID.to_string(),
            ranking_table: None,
        }
    }

    pub fn with_ranking_table(mut self, table: Arc<dyn RankingTable>) -> Self {
        self.ranking_table = Some(table);
        self
    }

    pub fn with_chart_container_id(mut self, container_id: impl Into<String>) -> Self {
        self.chart_container_id = container_id.into();
        self
    }

    /// `reference_date_input` is the raw user input; empty means "most recent".
    pub fn run(&self, reference_date_input: &str) -> PipelineOutcome {
        let reference_date = reference_date_from_input(reference_date_input);

        let payload = match self.fetch_payload(reference_date) {
            Ok(payload) => payload,
            Err(err) => {
                error!(
                    component = "pipeline",
                    event = "pipeline.run.error",
                    reference_date = reference_date.unwrap_or_default(),
                    error = %err
                );
                self.notifier.notify_failure(PIPELINE_FAILED_MESSAGE);
                return PipelineOutcome::Failed;
            }
        };

        self.chart
            .new_plot(&self.chart_container_id, payload.plot_spec());

        let ranking = match (&self.ranking_table, payload.ranking.as_ref()) {
            (None, _) => RankingPopulation::Skipped,
            (Some(table), Some(embedded)) => {
                table.render_records(Some(embedded));
                RankingPopulation::Embedded
            }
            (Some(table), None) => {
                table.fetch_and_render(reference_date);
                RankingPopulation::Fetched
            }
        };

        info!(
            component = "pipeline",
            event = "pipeline.run.rendered",
            reference_date = reference_date.unwrap_or_default(),
            ranking = ?ranking
        );
        PipelineOutcome::Rendered { ranking }
    }

    fn fetch_payload(&self, reference_date: Option<&str>) -> Result<ChartPayload, PipelineError> {
        let url = self.endpoints.pipeline_url(reference_date);
        let value = self.fetcher.fetch_json(&url)?;
        ChartPayload::from_value(value)
            .map_err(|source| PipelineError::InvalidPayload { url, source })
    }
}
