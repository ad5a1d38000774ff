//! Chart response envelope shared by the pipeline and candlestick endpoints.

use serde_json::Value;
use thiserror::Error;

use crate::surface::{PlotOptions, PlotSpec};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("chart payload is not a JSON object")]
    NotAnObject,
    #[error("chart payload is missing required field '{0}'")]
    MissingField(&'static str),
}

/// `data` and `layout` are opaque to the dashboard and handed to the chart
/// surface untouched. `ranking` is only present on pipeline responses.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPayload {
    pub data: Value,
    pub layout: Value,
    pub ranking: Option<Value>,
}

impl ChartPayload {
    /// A null `data` or `layout` counts as missing; a null `ranking` counts
    /// as absent.
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        let Value::Object(mut fields) = value else {
            return Err(PayloadError::NotAnObject);
        };

        let data = take_required(&mut fields, "data")?;
        let layout = take_required(&mut fields, "layout")?;
        let ranking = fields.remove("ranking").filter(|value| !value.is_null());

        Ok(Self {
            data,
            layout,
            ranking,
        })
    }

    pub fn plot_spec(&self) -> PlotSpec {
        PlotSpec {
            data: self.data.clone(),
            layout: self.layout.clone(),
            options: PlotOptions::default(),
        }
    }
}

fn take_required(
    fields: &mut serde_json::Map<String, Value>,
    name: &'static str,
) -> Result<Value, PayloadError> {
    match fields.remove(name) {
        Some(Value::Null) | None => Err(PayloadError::MissingField(name)),
        Some(value) => Ok(value),
    }
}
