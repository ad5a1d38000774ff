//! Ranking table: column inference, row projection, rendering and the
//! row-selection protocol.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cell_format::format_cell_value;
use crate::endpoints::BackendEndpoints;
use crate::fetch::JsonFetcher;
use crate::surface::{
    GridColumn, GridOptions, GridSort, GridSpec, GridSurface, SortDirection, ROW_SELECTED_EVENT,
    TABLE_CONTAINER_ID,
};

pub const NO_DATA_MESSAGE: &str = "No data available.";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load ranking data.";

const TICKER_KEY: &str = "ticker";

/// Column key to displayed cell text of one clicked row, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEvent {
    values: Vec<(String, String)>,
}

impl SelectionEvent {
    pub fn new(values: Vec<(String, String)>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(column, _)| column == key)
            .map(|(_, value)| value.as_str())
    }

    /// Looks the ticker up with the same case-insensitive match used to
    /// put the ticker column first. An exact `ticker` key wins over other
    /// casings. Empty values count as missing.
    pub fn ticker(&self) -> Option<&str> {
        self.get(TICKER_KEY)
            .or_else(|| {
                self.values
                    .iter()
                    .find(|(column, _)| column.eq_ignore_ascii_case(TICKER_KEY))
                    .map(|(_, value)| value.as_str())
            })
            .filter(|value| !value.is_empty())
    }
}

/// What a click landed on inside the table container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    Outside,
    Header,
    Row { position: usize, cells: Vec<String> },
}

pub type RowSelectedHandler = Box<dyn Fn(&SelectionEvent) + Send + Sync>;

/// Table capability handed to the pipeline controller.
pub trait RankingTable: Send + Sync {
    fn render_records(&self, records: Option<&Value>);
    fn fetch_and_render(&self, reference_date: Option<&str>);
}

/// Field names of the first record, with a case-insensitive `ticker` moved
/// to the front. A non-object record has no columns.
pub fn infer_columns(first: &Value) -> Vec<String> {
    let Some(fields) = first.as_object() else {
        return Vec::new();
    };

    let mut keys: Vec<String> = fields.keys().cloned().collect();
    if let Some(idx) = keys
        .iter()
        .position(|key| key.eq_ignore_ascii_case(TICKER_KEY))
    {
        if idx > 0 {
            let ticker = keys.remove(idx);
            keys.insert(0, ticker);
        }
    }
    keys
}

/// Missing fields project to an empty cell.
pub fn project_row(record: &Value, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|key| record.get(key).map(format_cell_value).unwrap_or_default())
        .collect()
}

pub fn build_grid(records: &[Value]) -> Option<GridSpec> {
    let first = records.first()?;
    let keys = infer_columns(first);
    if keys.is_empty() {
        return None;
    }

    let rows = records
        .iter()
        .map(|record| project_row(record, &keys))
        .collect();
    let columns = keys
        .into_iter()
        .map(|key| GridColumn {
            id: key.clone(),
            name: key,
        })
        .collect();

    Some(GridSpec {
        columns,
        rows,
        options: GridOptions::default(),
        sort: None,
    })
}

/// Ordering used by column sorts: numeric cells first, compared by value,
/// then all other cells compared as text.
pub fn compare_cells(left: &str, right: &str) -> Ordering {
    match (numeric_cell(left), numeric_cell(right)) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => left.cmp(right),
    }
}

fn numeric_cell(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[derive(Debug, Default)]
struct TableState {
    /// Rendered grid with rows in record order.
    grid: Option<GridSpec>,
    /// Displayed position to index into `grid.rows`.
    display_order: Vec<usize>,
    sort: Option<GridSort>,
    /// Displayed position of the selected row.
    selected_row: Option<usize>,
}

impl TableState {
    fn columns(&self) -> &[GridColumn] {
        self.grid
            .as_ref()
            .map(|grid| grid.columns.as_slice())
            .unwrap_or_default()
    }

    fn displayed_row(&self, position: usize) -> Option<&Vec<String>> {
        let grid = self.grid.as_ref()?;
        let idx = *self.display_order.get(position)?;
        grid.rows.get(idx)
    }

    fn displayed_grid(&self) -> Option<GridSpec> {
        let grid = self.grid.as_ref()?;
        let rows = self
            .display_order
            .iter()
            .filter_map(|idx| grid.rows.get(*idx).cloned())
            .collect();
        Some(GridSpec {
            columns: grid.columns.clone(),
            rows,
            options: grid.options,
            sort: self.sort.clone(),
        })
    }
}

pub struct RankingTableView {
    surface: Arc<dyn GridSurface>,
    container_id: String,
    fetcher: Arc<dyn JsonFetcher>,
    endpoints: BackendEndpoints,
    state: Mutex<TableState>,
    handlers: RwLock<Vec<RowSelectedHandler>>,
}

impl RankingTableView {
    pub fn new(
        surface: Arc<dyn GridSurface>,
        fetcher: Arc<dyn JsonFetcher>,
        endpoints: BackendEndpoints,
    ) -> Self {
        Self {
            surface,
            container_id: TABLE_CONTAINER_ID.to_string(),
            fetcher,
            endpoints,
            state: Mutex::new(TableState::default()),
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn with_container_id(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = container_id.into();
        self
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Handlers run on the clicking thread, after the table state is
    /// released. A handler must not register further handlers.
    pub fn on_row_selected(&self, handler: impl Fn(&SelectionEvent) + Send + Sync + 'static) {
        self.handlers
            .write()
            .expect("row handler lock should not be poisoned")
            .push(Box::new(handler));
    }

    pub fn render(&self, records: Option<&Value>) {
        if !self.surface.has_container(&self.container_id) {
            warn!(
                component = "ranking_table",
                event = "table.container_missing",
                container_id = %self.container_id
            );
            return;
        }

        let mut state = self.lock_state();
        *state = TableState::default();
        self.surface.clear(&self.container_id);

        let grid = records
            .and_then(Value::as_array)
            .filter(|records| !records.is_empty())
            .and_then(|records| build_grid(records));

        let Some(grid) = grid else {
            warn!(
                component = "ranking_table",
                event = "table.no_data",
                container_id = %self.container_id
            );
            self.surface.show_message(&self.container_id, NO_DATA_MESSAGE);
            return;
        };

        info!(
            component = "ranking_table",
            event = "table.render",
            container_id = %self.container_id,
            rows = grid.rows.len(),
            columns = grid.columns.len()
        );
        state.display_order = (0..grid.rows.len()).collect();
        state.grid = Some(grid.clone());
        self.surface.render_grid(&self.container_id, grid);
    }

    /// Orders the displayed rows by `column`. Without a direction the sort
    /// toggles: ascending first, descending when the column is already
    /// sorted ascending. Sorting always starts from record order and drops
    /// the current selection. Returns `false` when nothing is rendered, the
    /// grid is not sortable or the column is unknown.
    pub fn sort_by(&self, column: &str, direction: Option<SortDirection>) -> bool {
        let mut state = self.lock_state();
        let Some(grid) = state.grid.as_ref() else {
            debug!(component = "ranking_table", event = "table.sort.no_grid");
            return false;
        };
        if !grid.options.sort {
            debug!(component = "ranking_table", event = "table.sort.disabled");
            return false;
        }
        let Some(column_idx) = grid.columns.iter().position(|c| c.id == column) else {
            warn!(
                component = "ranking_table",
                event = "table.sort.unknown_column",
                column
            );
            return false;
        };

        let direction = direction.unwrap_or_else(|| match &state.sort {
            Some(current) if current.column == column => current.direction.toggled(),
            _ => SortDirection::Ascending,
        });

        let cell = move |row: usize| {
            grid.rows[row]
                .get(column_idx)
                .map(String::as_str)
                .unwrap_or_default()
        };
        let mut order: Vec<usize> = (0..grid.rows.len()).collect();
        order.sort_by(|a, b| match direction {
            SortDirection::Ascending => compare_cells(cell(*a), cell(*b)),
            SortDirection::Descending => compare_cells(cell(*b), cell(*a)),
        });

        state.display_order = order;
        state.sort = Some(GridSort {
            column: column.to_string(),
            direction,
        });
        state.selected_row = None;

        info!(
            component = "ranking_table",
            event = "table.sort",
            column,
            direction = direction.as_str()
        );
        if let Some(displayed) = state.displayed_grid() {
            self.surface.render_grid(&self.container_id, displayed);
        }
        true
    }

    pub fn sort(&self) -> Option<GridSort> {
        self.lock_state().sort.clone()
    }

    pub fn fetch_and_render_ranking(&self, reference_date: Option<&str>) {
        let url = self.endpoints.ranking_url(reference_date);
        match self.fetcher.fetch_json(&url) {
            Ok(records) => self.render(Some(&records)),
            Err(err) => {
                error!(
                    component = "ranking_table",
                    event = "table.fetch.error",
                    url = %url,
                    kind = err.kind(),
                    error = %err
                );
                if self.surface.has_container(&self.container_id) {
                    self.surface
                        .show_message(&self.container_id, LOAD_FAILED_MESSAGE);
                }
            }
        }
    }

    /// Applies a click. Returns the emitted selection, if any. A row
    /// position outside the displayed rows is ignored.
    pub fn click(&self, target: ClickTarget) -> Option<SelectionEvent> {
        let (position, cells) = match target {
            ClickTarget::Outside => return None,
            ClickTarget::Header => {
                debug!(component = "ranking_table", event = "table.click.header");
                return None;
            }
            ClickTarget::Row { position, cells } => (position, cells),
        };

        let selection = {
            let mut state = self.lock_state();
            self.select_locked(&mut state, position, &cells)?
        };
        Some(self.emit(position, selection))
    }

    /// Clicks the row at displayed `position` using the cells of the current
    /// render. The row is read and selected under one lock, so a concurrent
    /// re-render cannot pair a position with another render's cells.
    pub fn click_row(&self, position: usize) -> Option<SelectionEvent> {
        let selection = {
            let mut state = self.lock_state();
            let Some(cells) = state.displayed_row(position).cloned() else {
                debug!(
                    component = "ranking_table",
                    event = "table.click.out_of_range",
                    position
                );
                return None;
            };
            self.select_locked(&mut state, position, &cells)?
        };
        Some(self.emit(position, selection))
    }

    fn select_locked(
        &self,
        state: &mut TableState,
        position: usize,
        cells: &[String],
    ) -> Option<SelectionEvent> {
        if state.columns().is_empty() || position >= state.display_order.len() {
            debug!(
                component = "ranking_table",
                event = "table.click.out_of_range",
                position
            );
            return None;
        }

        state.selected_row = Some(position);
        self.surface
            .mark_selected_row(&self.container_id, Some(position));

        let values = state
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let text = cells.get(idx).map(|cell| cell.trim()).unwrap_or_default();
                (column.id.clone(), text.to_string())
            })
            .collect();
        Some(SelectionEvent::new(values))
    }

    fn emit(&self, position: usize, selection: SelectionEvent) -> SelectionEvent {
        info!(
            component = "ranking_table",
            event = "table.row_selected",
            event_type = ROW_SELECTED_EVENT,
            position,
            ticker = selection.ticker().unwrap_or_default()
        );

        let handlers = self
            .handlers
            .read()
            .expect("row handler lock should not be poisoned");
        for handler in handlers.iter() {
            handler(&selection);
        }

        selection
    }

    pub fn displayed_row(&self, position: usize) -> Option<Vec<String>> {
        self.lock_state().displayed_row(position).cloned()
    }

    pub fn columns(&self) -> Vec<String> {
        self.lock_state()
            .columns()
            .iter()
            .map(|column| column.id.clone())
            .collect()
    }

    pub fn selected_row(&self) -> Option<usize> {
        self.lock_state().selected_row
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, TableState> {
        self.state
            .lock()
            .expect("table state lock should not be poisoned")
    }
}

impl RankingTable for RankingTableView {
    fn render_records(&self, records: Option<&Value>) {
        self.render(records);
    }

    fn fetch_and_render(&self, reference_date: Option<&str>) {
        self.fetch_and_render_ranking(reference_date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::headless_page::{ContainerContent, HeadlessPage};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoNetwork;

    impl JsonFetcher for NoNetwork {
        fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
            Err(FetchError::Network {
                url: url.to_string(),
                message: "offline".to_string(),
            })
        }
    }

    fn view(page: &Arc<HeadlessPage>) -> RankingTableView {
        RankingTableView::new(
            page.clone(),
            Arc::new(NoNetwork),
            BackendEndpoints::default(),
        )
    }

    #[test]
    fn ticker_column_moves_first_and_others_keep_order() {
        let columns = infer_columns(&json!({"Score": 1, "Price": 2, "Ticker": "A", "Vol": 3}));
        assert_eq!(columns, vec!["Ticker", "Score", "Price", "Vol"]);

        let columns = infer_columns(&json!({"ticker": "A", "b": 1}));
        assert_eq!(columns, vec!["ticker", "b"]);

        let columns = infer_columns(&json!({"a": 1, "b": 2}));
        assert_eq!(columns, vec!["a", "b"]);
    }

    #[test]
    fn later_records_missing_fields_project_empty_cells() {
        let grid = build_grid(&[
            json!({"ticker": "A", "price": 1.5, "note": "x"}),
            json!({"ticker": "B"}),
        ])
        .unwrap();

        assert_eq!(grid.rows[0], vec!["A", "1.50", "x"]);
        assert_eq!(grid.rows[1], vec!["B", "", ""]);
        assert_eq!(grid.options.pagination.limit, 20);
        assert!(grid.options.sort);
    }

    #[test]
    fn empty_or_non_array_input_shows_no_data_message() {
        let page = Arc::new(HeadlessPage::with_standard_containers());
        let table = view(&page);

        for input in [None, Some(json!([])), Some(json!({"ticker": "A"}))] {
            table.render(input.as_ref());
            assert_eq!(
                page.content(TABLE_CONTAINER_ID),
                Some(ContainerContent::Message(NO_DATA_MESSAGE.to_string()))
            );
            assert!(table.columns().is_empty());
        }
    }

    #[test]
    fn missing_container_is_a_no_op() {
        let page = Arc::new(HeadlessPage::new(["chart"]));
        let table = view(&page);
        table.render(Some(&json!([{"ticker": "A"}])));
        assert!(table.columns().is_empty());
        assert_eq!(page.content(TABLE_CONTAINER_ID), None);
    }

    #[test]
    fn header_and_outside_clicks_emit_nothing() {
        let page = Arc::new(HeadlessPage::with_standard_containers());
        let table = view(&page);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        table.on_row_selected(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        table.render(Some(&json!([{"ticker": "A"}])));
        assert_eq!(table.click(ClickTarget::Header), None);
        assert_eq!(table.click(ClickTarget::Outside), None);
        assert_eq!(table.click_row(7), None);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(table.selected_row(), None);
    }

    #[test]
    fn repeated_clicks_re_emit_and_keep_single_selection() {
        let page = Arc::new(HeadlessPage::with_standard_containers());
        let table = view(&page);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        table.on_row_selected(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        table.render(Some(&json!([{"ticker": "A"}, {"ticker": "B"}])));
        table.click_row(0);
        table.click_row(0);
        let event = table.click_row(1).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(table.selected_row(), Some(1));
        assert_eq!(event.get("ticker"), Some("B"));
        match page.content(TABLE_CONTAINER_ID) {
            Some(ContainerContent::Grid { selected_row, .. }) => assert_eq!(selected_row, Some(1)),
            other => panic!("expected grid, got {other:?}"),
        }
    }

    #[test]
    fn selection_uses_displayed_text_trimmed() {
        let page = Arc::new(HeadlessPage::with_standard_containers());
        let table = view(&page);
        table.render(Some(&json!([{"Price": 55.3, "Ticker": "VALE3"}])));

        let event = table
            .click(ClickTarget::Row {
                position: 0,
                cells: vec![" VALE3 ".to_string(), "55.30".to_string()],
            })
            .unwrap();

        assert_eq!(
            event.values(),
            &[
                ("Ticker".to_string(), "VALE3".to_string()),
                ("Price".to_string(), "55.30".to_string()),
            ]
        );
        assert_eq!(event.ticker(), Some("VALE3"));
    }

    #[test]
    fn re_render_clears_selection() {
        let page = Arc::new(HeadlessPage::with_standard_containers());
        let table = view(&page);
        table.render(Some(&json!([{"ticker": "A"}])));
        table.click_row(0);
        table.render(Some(&json!([{"ticker": "B"}])));
        assert_eq!(table.selected_row(), None);
    }

    #[test]
    fn fetch_failure_shows_load_failed_message() {
        let page = Arc::new(HeadlessPage::with_standard_containers());
        let table = view(&page);
        table.fetch_and_render_ranking(Some("2024-01-02"));
        assert_eq!(
            page.content(TABLE_CONTAINER_ID),
            Some(ContainerContent::Message(LOAD_FAILED_MESSAGE.to_string()))
        );
        assert!(page.take_notifications().is_empty());
    }

    #[test]
    fn ticker_lookup_ignores_key_case() {
        let event = SelectionEvent::new(vec![("TICKER".to_string(), "ITUB4".to_string())]);
        assert_eq!(event.ticker(), Some("ITUB4"));

        let event = SelectionEvent::new(vec![("ticker".to_string(), String::new())]);
        assert_eq!(event.ticker(), None);
    }

    #[test]
    fn out_of_range_row_click_keeps_selection() {
        let page = Arc::new(HeadlessPage::with_standard_containers());
        let table = view(&page);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        table.on_row_selected(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        table.render(Some(&json!([{"ticker": "A"}, {"ticker": "B"}])));
        table.click_row(1);
        let stale = table.click(ClickTarget::Row {
            position: 5,
            cells: vec!["GONE".to_string()],
        });

        assert_eq!(stale, None);
        assert_eq!(table.selected_row(), Some(1));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        match page.content(TABLE_CONTAINER_ID) {
            Some(ContainerContent::Grid { selected_row, .. }) => assert_eq!(selected_row, Some(1)),
            other => panic!("expected grid, got {other:?}"),
        }
    }

    #[test]
    fn numeric_cells_sort_by_value_before_text() {
        assert_eq!(compare_cells("9", "10"), std::cmp::Ordering::Less);
        assert_eq!(compare_cells("-1.50", "0.25"), std::cmp::Ordering::Less);
        assert_eq!(compare_cells("100", "ABC"), std::cmp::Ordering::Less);
        assert_eq!(compare_cells("", "7"), std::cmp::Ordering::Greater);
        assert_eq!(compare_cells("PETR4", "VALE3"), std::cmp::Ordering::Less);
    }

    #[test]
    fn sorted_table_selects_by_displayed_position() {
        let page = Arc::new(HeadlessPage::with_standard_containers());
        let table = view(&page);
        table.render(Some(&json!([
            {"ticker": "B", "score": 2},
            {"ticker": "A", "score": 10},
            {"ticker": "C", "score": 9},
        ])));

        assert!(table.sort_by("score", None));
        assert_eq!(table.displayed_row(0).unwrap()[0], "B");

        assert!(table.sort_by("score", None));
        assert_eq!(
            table.sort(),
            Some(GridSort {
                column: "score".to_string(),
                direction: SortDirection::Descending,
            })
        );

        let event = table.click_row(0).unwrap();
        assert_eq!(event.ticker(), Some("A"));
        assert_eq!(table.click_row(2).unwrap().ticker(), Some("B"));

        match page.content(TABLE_CONTAINER_ID) {
            Some(ContainerContent::Grid { grid, selected_row }) => {
                let tickers: Vec<&str> = grid.rows.iter().map(|row| row[0].as_str()).collect();
                assert_eq!(tickers, vec!["A", "C", "B"]);
                assert_eq!(selected_row, Some(2));
                assert_eq!(grid.sort.map(|sort| sort.direction), Some(SortDirection::Descending));
            }
            other => panic!("expected grid, got {other:?}"),
        }
    }

    #[test]
    fn sorting_clears_selection_and_rejects_unknown_columns() {
        let page = Arc::new(HeadlessPage::with_standard_containers());
        let table = view(&page);
        assert!(!table.sort_by("ticker", None));

        table.render(Some(&json!([{"ticker": "B"}, {"ticker": "A"}])));
        table.click_row(0);
        assert!(!table.sort_by("price", Some(SortDirection::Ascending)));
        assert_eq!(table.selected_row(), Some(0));

        assert!(table.sort_by("ticker", Some(SortDirection::Ascending)));
        assert_eq!(table.selected_row(), None);
        assert_eq!(table.displayed_row(0).unwrap(), vec!["A"]);

        table.render(Some(&json!([{"ticker": "Z"}, {"ticker": "Y"}])));
        assert_eq!(table.sort(), None);
        assert_eq!(table.displayed_row(0).unwrap(), vec!["Z"]);
    }
}
