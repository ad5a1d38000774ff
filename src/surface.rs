//! Rendering seams: the grid, the chart and the user notification channel.
//!
//! The dashboard components never touch a concrete page. They drive these
//! traits, and [`crate::HeadlessPage`] is the in-process implementation used
//! by the HTTP host and by tests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TABLE_CONTAINER_ID: &str = "table";
pub const PIPELINE_CHART_CONTAINER_ID: &str = "chart";
pub const CANDLE_CHART_CONTAINER_ID: &str = "candlechart";

/// Name under which row selections are reported in logs.
pub const ROW_SELECTED_EVENT: &str = "fr:rowSelected";

pub const GRID_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridColumn {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPagination {
    pub enabled: bool,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridOptions {
    pub sort: bool,
    pub pagination: GridPagination,
    pub fixed_header: bool,
    pub resizable: bool,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            sort: true,
            pagination: GridPagination {
                enabled: true,
                limit: GRID_PAGE_SIZE,
            },
            fixed_header: true,
            resizable: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSort {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub columns: Vec<GridColumn>,
    /// Rows in display order.
    pub rows: Vec<Vec<String>>,
    pub options: GridOptions,
    /// Active column sort, if any. `rows` are already ordered by it.
    #[serde(default)]
    pub sort: Option<GridSort>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotOptions {
    pub responsive: bool,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self { responsive: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSpec {
    pub data: Value,
    pub layout: Value,
    pub options: PlotOptions,
}

pub trait GridSurface: Send + Sync {
    fn has_container(&self, container_id: &str) -> bool;
    fn clear(&self, container_id: &str);
    fn show_message(&self, container_id: &str, message: &str);
    /// Replaces all prior content of the container.
    fn render_grid(&self, container_id: &str, grid: GridSpec);
    /// `None` removes the selected marker from every row.
    fn mark_selected_row(&self, container_id: &str, row: Option<usize>);
}

pub trait ChartSurface: Send + Sync {
    /// Replaces all prior content of the container.
    fn new_plot(&self, container_id: &str, plot: PlotSpec);
}

pub trait Notifier: Send + Sync {
    fn notify_failure(&self, message: &str);
}
