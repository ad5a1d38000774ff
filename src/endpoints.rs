//! Backend endpoint configuration and request URL construction.

use reqwest::Url;
use thiserror::Error;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const RANKING_PATH: &str = "/api/ranking";
pub const PIPELINE_PATH: &str = "/api/charts/fr-price-series";
pub const CANDLE_CHART_PATH: &str = "/api/candlechart";

pub const REFERENCE_DATE_PARAM: &str = "reference_date";
pub const TICKER_PARAM: &str = "ticker";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid backend base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },
    #[error("backend base URL '{0}' cannot carry a path")]
    CannotBeABase(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoints {
    base_url: Url,
    pub ranking_path: String,
    pub pipeline_path: String,
    pub candle_chart_path: String,
}

impl BackendEndpoints {
    pub fn new(base_url: &str) -> Result<Self, EndpointError> {
        let parsed = Url::parse(base_url.trim()).map_err(|err| EndpointError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: err.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(EndpointError::CannotBeABase(base_url.to_string()));
        }

        Ok(Self {
            base_url: parsed,
            ranking_path: RANKING_PATH.to_string(),
            pipeline_path: PIPELINE_PATH.to_string(),
            candle_chart_path: CANDLE_CHART_PATH.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn ranking_url(&self, reference_date: Option<&str>) -> String {
        self.build(&self.ranking_path, &reference_date_param(reference_date))
    }

    pub fn pipeline_url(&self, reference_date: Option<&str>) -> String {
        self.build(&self.pipeline_path, &reference_date_param(reference_date))
    }

    pub fn candle_chart_url(&self, ticker: &str) -> String {
        self.build(&self.candle_chart_path, &[(TICKER_PARAM, ticker)])
    }

    fn build(&self, path: &str, params: &[(&str, &str)]) -> String {
        let mut url = self.base_url.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{prefix}{path}"));
        url.set_query(None);

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }

        url.to_string()
    }
}

impl Default for BackendEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL).expect("default backend URL should parse")
    }
}

/// Empty input means "most recent" and is never sent to the backend.
pub fn reference_date_from_input(input: &str) -> Option<&str> {
    if input.is_empty() {
        None
    } else {
        Some(input)
    }
}

fn reference_date_param(reference_date: Option<&str>) -> Vec<(&'static str, &str)> {
    match reference_date.and_then(reference_date_from_input) {
        Some(date) => vec![(REFERENCE_DATE_PARAM, date)],
        None => Vec::new(),
    }
}
