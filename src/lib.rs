//! FR ranking dashboard.
//!
//! Fetches the relative-strength pipeline chart and ranking from the backend,
//! renders the ranking as a paginated table and refreshes a candlestick
//! chart for whichever ranking row the user selects.

mod candle_chart;
mod cell_format;
mod config;
mod dashboard;
mod endpoints;
mod fetch;
mod headless_page;
mod observability;
mod payload;
mod pipeline;
mod ranking_table;
mod surface;

pub use candle_chart::{CandleChartRefresher, RefreshOutcome, CANDLE_CHART_FAILED_MESSAGE};
pub use cell_format::{format_cell_value, format_number};
pub use config::{dashboard_config_from_env, DashboardConfig, DEFAULT_DASHBOARD_ADDR};
pub use dashboard::{
    dashboard_router, DashboardApp, PageQuery, ReferenceDateQuery, SelectQuery, SortQuery,
};
pub use endpoints::{
    reference_date_from_input, BackendEndpoints, EndpointError, CANDLE_CHART_PATH,
    DEFAULT_BACKEND_URL, PIPELINE_PATH, RANKING_PATH,
};
pub use fetch::{parse_json_body, FetchError, JsonFetcher, ReqwestJsonFetcher};
pub use headless_page::{
    render_page_html, ContainerContent, ContainerSnapshot, HeadlessPage, PageSnapshot,
};
pub use observability::{
    dashboard_log_filter, init_logging, log_app_bind, log_app_start, log_backend_selected,
    logging_config_from_env, LogFormat, LoggingConfig, LoggingInitError, DEFAULT_LOG_FILTER,
};
pub use payload::{ChartPayload, PayloadError};
pub use pipeline::{
    PipelineController, PipelineError, PipelineOutcome, RankingPopulation,
    PIPELINE_FAILED_MESSAGE,
};
pub use ranking_table::{
    build_grid, compare_cells, infer_columns, project_row, ClickTarget, RankingTable, RankingTableView,
    RowSelectedHandler, SelectionEvent, LOAD_FAILED_MESSAGE, NO_DATA_MESSAGE,
};
pub use surface::{
    ChartSurface, GridColumn, GridOptions, GridPagination, GridSort, GridSpec, GridSurface,
    Notifier, PlotOptions, PlotSpec, SortDirection, CANDLE_CHART_CONTAINER_ID, GRID_PAGE_SIZE,
    PIPELINE_CHART_CONTAINER_ID, ROW_SELECTED_EVENT, TABLE_CONTAINER_ID,
};
