//! In-process page standing in for the browser document: one content slot
//! per container id, a queue of failure notifications, and HTML output.

use std::sync::RwLock;

use chrono::Utc;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::surface::{
    ChartSurface, GridColumn, GridSpec, GridSurface, Notifier, PlotSpec, SortDirection,
    CANDLE_CHART_CONTAINER_ID, PIPELINE_CHART_CONTAINER_ID, TABLE_CONTAINER_ID,
};

const PLOTLY_SCRIPT_URL: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum ContainerContent {
    Empty,
    Message(String),
    Grid {
        grid: GridSpec,
        selected_row: Option<usize>,
    },
    Chart(PlotSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub id: String,
    pub content: ContainerContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub containers: Vec<ContainerSnapshot>,
    pub notifications: Vec<String>,
}

impl PageSnapshot {
    pub fn container(&self, id: &str) -> Option<&ContainerContent> {
        self.containers
            .iter()
            .find(|container| container.id == id)
            .map(|container| &container.content)
    }
}

#[derive(Debug, Default)]
struct PageState {
    containers: Vec<ContainerSnapshot>,
    notifications: Vec<String>,
}

#[derive(Debug, Default)]
pub struct HeadlessPage {
    inner: RwLock<PageState>,
}

impl HeadlessPage {
    pub fn new<I, S>(container_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let containers = container_ids
            .into_iter()
            .map(|id| ContainerSnapshot {
                id: id.into(),
                content: ContainerContent::Empty,
            })
            .collect();

        Self {
            inner: RwLock::new(PageState {
                containers,
                notifications: Vec::new(),
            }),
        }
    }

    /// Pipeline chart, ranking table and candlestick chart, in page order.
    pub fn with_standard_containers() -> Self {
        Self::new([
            PIPELINE_CHART_CONTAINER_ID,
            TABLE_CONTAINER_ID,
            CANDLE_CHART_CONTAINER_ID,
        ])
    }

    pub fn content(&self, container_id: &str) -> Option<ContainerContent> {
        self.read()
            .containers
            .iter()
            .find(|container| container.id == container_id)
            .map(|container| container.content.clone())
    }

    pub fn snapshot(&self) -> PageSnapshot {
        let state = self.read();
        PageSnapshot {
            containers: state.containers.clone(),
            notifications: state.notifications.clone(),
        }
    }

    /// Drains pending notifications; each is shown to the user once.
    pub fn take_notifications(&self) -> Vec<String> {
        std::mem::take(&mut self.write().notifications)
    }

    fn update(&self, container_id: &str, f: impl FnOnce(&mut ContainerContent)) {
        let mut state = self.write();
        match state
            .containers
            .iter_mut()
            .find(|container| container.id == container_id)
        {
            Some(container) => f(&mut container.content),
            None => debug!(
                component = "headless_page",
                event = "page.container_missing",
                container_id
            ),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, PageState> {
        self.inner
            .read()
            .expect("page state lock should not be poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, PageState> {
        self.inner
            .write()
            .expect("page state lock should not be poisoned")
    }
}

impl GridSurface for HeadlessPage {
    fn has_container(&self, container_id: &str) -> bool {
        self.read()
            .containers
            .iter()
            .any(|container| container.id == container_id)
    }

    fn clear(&self, container_id: &str) {
        self.update(container_id, |content| *content = ContainerContent::Empty);
    }

    fn show_message(&self, container_id: &str, message: &str) {
        self.update(container_id, |content| {
            *content = ContainerContent::Message(message.to_string())
        });
    }

    fn render_grid(&self, container_id: &str, grid: GridSpec) {
        self.update(container_id, |content| {
            *content = ContainerContent::Grid {
                grid,
                selected_row: None,
            }
        });
    }

    fn mark_selected_row(&self, container_id: &str, row: Option<usize>) {
        self.update(container_id, |content| {
            if let ContainerContent::Grid { selected_row, .. } = content {
                *selected_row = row;
            }
        });
    }
}

impl ChartSurface for HeadlessPage {
    fn new_plot(&self, container_id: &str, plot: PlotSpec) {
        self.update(container_id, |content| *content = ContainerContent::Chart(plot));
    }
}

impl Notifier for HeadlessPage {
    fn notify_failure(&self, message: &str) {
        info!(
            component = "headless_page",
            event = "page.notify",
            notification = message
        );
        self.write().notifications.push(message.to_string());
    }
}

/// Renders the page. `grid_page` is 1-based and clamped to the grid's pages.
pub fn render_page_html(
    snapshot: &PageSnapshot,
    notifications: &[String],
    grid_page: usize,
) -> String {
    let now_utc = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();

    let mut out = String::new();
    out.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str("<title>FR Ranking Dashboard</title>\n");
    out.push_str(&format!("<script src=\"{PLOTLY_SCRIPT_URL}\"></script>\n"));
    out.push_str("<style>:root{--bg:#f3f5f7;--card:#fff;--ink:#182026;--muted:#5f6a73;--line:#d7dce1;--head:#14343f;--sel:#fff1b8}*{box-sizing:border-box}body{margin:0;color:var(--ink);font-family:\"Segoe UI\",sans-serif;background:var(--bg)}.shell{max-width:1400px;margin:0 auto;padding:20px 16px}.hero{background:linear-gradient(135deg,#102f3a 0%,#24576b 100%);color:#f7fbfc;border-radius:14px;padding:16px 20px}.hero h1{margin:0 0 8px;font-size:1.5rem}.hero form{display:flex;gap:10px;flex-wrap:wrap;align-items:center}.alert{margin-top:14px;padding:10px 14px;border-radius:10px;background:#fde2e1;border:1px solid #f3a6a2;color:#7a1c17}.card{margin-top:16px;background:var(--card);border:1px solid #cbd4db;border-radius:14px;overflow:hidden}.table-wrap{overflow:auto;max-height:70vh}table{width:100%;border-collapse:collapse}thead th{position:sticky;top:0;background:var(--head);color:#f2f7f9;font-size:.8rem;padding:9px 10px;text-align:left}tbody td{font-size:.85rem;padding:8px 10px;border-bottom:1px solid var(--line);white-space:nowrap}tbody td a{color:inherit;text-decoration:none;display:block}tr.selected{background:var(--sel)}.pager{display:flex;gap:12px;padding:8px 12px;font-size:.82rem;color:var(--muted)}.empty{padding:14px;color:var(--muted)}.plot{min-height:420px}</style>\n");
    out.push_str("</head><body><main class=\"shell\">\n");
    out.push_str("<section class=\"hero\"><h1>FR Ranking Dashboard</h1>");
    out.push_str("<form action=\"/dashboard/run\" method=\"get\">");
    out.push_str("<label for=\"referenceDate\">Reference date</label>");
    out.push_str("<input type=\"date\" id=\"referenceDate\" name=\"reference_date\">");
    out.push_str("<button type=\"submit\">Run pipeline</button>");
    out.push_str(&format!("<span>Generated: {}</span>", escape_html(&now_utc)));
    out.push_str("</form></section>\n");

    for message in notifications {
        out.push_str("<div class=\"alert\" role=\"alert\">");
        out.push_str(&escape_html(message));
        out.push_str("</div>\n");
    }

    for container in &snapshot.containers {
        let id = escape_html(&container.id);
        out.push_str("<section class=\"card\">");
        match &container.content {
            ContainerContent::Empty => {
                out.push_str(&format!("<div id=\"{id}\"></div>"));
            }
            ContainerContent::Message(message) => {
                out.push_str(&format!("<div id=\"{id}\"><p class=\"empty\">"));
                out.push_str(&escape_html(message));
                out.push_str("</p></div>");
            }
            ContainerContent::Grid { grid, selected_row } => {
                out.push_str(&format!("<div id=\"{id}\">"));
                push_grid(&mut out, grid, *selected_row, grid_page);
                out.push_str("</div>");
            }
            ContainerContent::Chart(plot) => {
                out.push_str(&format!("<div id=\"{id}\" class=\"plot\"></div>"));
                out.push_str(&format!(
                    "<script>Plotly.newPlot(\"{id}\", {}, {}, {});</script>",
                    script_json(&plot.data),
                    script_json(&plot.layout),
                    script_json(&plot.options),
                ));
            }
        }
        out.push_str("</section>\n");
    }

    out.push_str("</main></body></html>\n");
    out
}

fn push_grid(out: &mut String, grid: &GridSpec, selected_row: Option<usize>, grid_page: usize) {
    let total = grid.rows.len();
    let limit = if grid.options.pagination.enabled {
        grid.options.pagination.limit.max(1)
    } else {
        total.max(1)
    };
    let pages = total.div_ceil(limit).max(1);
    let page = grid_page.clamp(1, pages);
    let start = (page - 1) * limit;
    let end = (start + limit).min(total);

    out.push_str("<div class=\"table-wrap\"><table class=\"gridjs-table\"><thead><tr class=\"gridjs-tr gridjs-head\">");
    for column in &grid.columns {
        push_header_cell(out, grid, column, page);
    }
    out.push_str("</tr></thead><tbody>\n");

    for (idx, row) in grid.rows.iter().enumerate().take(end).skip(start) {
        let class = if selected_row == Some(idx) {
            "gridjs-tr selected"
        } else {
            "gridjs-tr"
        };
        out.push_str(&format!("<tr class=\"{class}\" data-row=\"{idx}\">"));
        for cell in row {
            out.push_str(&format!(
                "<td class=\"gridjs-td\"><a href=\"/dashboard/select?row={idx}&amp;page={page}\">{}</a></td>",
                escape_html(cell)
            ));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody></table></div>");

    out.push_str(&format!(
        "<nav class=\"pager\"><span>Page {page} of {pages} ({total} rows)</span>"
    ));
    if page > 1 {
        out.push_str(&format!("<a href=\"/dashboard?page={}\">Previous</a>", page - 1));
    }
    if page < pages {
        out.push_str(&format!("<a href=\"/dashboard?page={}\">Next</a>", page + 1));
    }
    out.push_str("</nav>");
}

/// Sortable headers link to the sort route, which toggles the direction.
/// Other headers report a plain header click.
fn push_header_cell(out: &mut String, grid: &GridSpec, column: &GridColumn, page: usize) {
    let direction = grid
        .sort
        .as_ref()
        .filter(|sort| sort.column == column.id)
        .map(|sort| sort.direction);
    let (aria, marker) = match direction {
        Some(SortDirection::Ascending) => (" aria-sort=\"ascending\"", " \u{25b2}"),
        Some(SortDirection::Descending) => (" aria-sort=\"descending\"", " \u{25bc}"),
        None => ("", ""),
    };
    let href = if grid.options.sort {
        sort_href(&column.id)
    } else {
        format!("/dashboard/select?page={page}")
    };
    out.push_str(&format!(
        "<th data-column-id=\"{}\"{aria}><a href=\"{}\">{}{marker}</a></th>",
        escape_html(&column.id),
        escape_html(&href),
        escape_html(&column.name)
    ));
}

fn sort_href(column_id: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost/dashboard/sort") else {
        return "/dashboard/sort".to_string();
    };
    url.query_pairs_mut().append_pair("column", column_id);
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

fn script_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
