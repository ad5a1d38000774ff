//! Dashboard wiring and HTTP routes.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::candle_chart::CandleChartRefresher;
use crate::endpoints::BackendEndpoints;
use crate::fetch::JsonFetcher;
use crate::headless_page::{render_page_html, HeadlessPage};
use crate::pipeline::PipelineController;
use crate::ranking_table::{ClickTarget, RankingTableView};
use crate::surface::SortDirection;

/// The components of one dashboard page, wired together.
#[derive(Clone)]
pub struct DashboardApp {
    pub page: Arc<HeadlessPage>,
    pub table: Arc<RankingTableView>,
    pub pipeline: Arc<PipelineController>,
    pub candle_chart: Arc<CandleChartRefresher>,
}

impl DashboardApp {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, endpoints: BackendEndpoints) -> Self {
        let page = Arc::new(HeadlessPage::with_standard_containers());

        let table = Arc::new(RankingTableView::new(
            page.clone(),
            fetcher.clone(),
            endpoints.clone(),
        ));

        let candle_chart = Arc::new(CandleChartRefresher::new(
            fetcher.clone(),
            page.clone(),
            page.clone(),
            endpoints.clone(),
        ));
        candle_chart.attach(&table);

        let pipeline = Arc::new(
            PipelineController::new(fetcher, page.clone(), page.clone(), endpoints)
                .with_ranking_table(table.clone()),
        );

        Self {
            page,
            table,
            pipeline,
            candle_chart,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReferenceDateQuery {
    pub reference_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SelectQuery {
    pub row: Option<usize>,
    pub page: Option<usize>,
}

/// Without `dir` the sort toggles on repeated requests for one column.
#[derive(Debug, Default, Deserialize)]
pub struct SortQuery {
    pub column: String,
    pub dir: Option<SortDirection>,
}

pub fn dashboard_router(app: DashboardApp) -> Router {
    Router::new()
        .route("/dashboard", get(get_dashboard_html))
        .route("/dashboard/state", get(get_dashboard_state))
        .route("/dashboard/run", get(run_pipeline))
        .route("/dashboard/ranking", get(fetch_ranking))
        .route("/dashboard/select", get(select_row))
        .route("/dashboard/sort", get(sort_table))
        .with_state(app)
}

async fn get_dashboard_html(
    State(app): State<DashboardApp>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    let snapshot = app.page.snapshot();
    let notifications = app.page.take_notifications();
    info!(
        component = "dashboard",
        event = "http.dashboard.request",
        notifications = notifications.len()
    );
    Html(render_page_html(
        &snapshot,
        &notifications,
        query.page.unwrap_or(1),
    ))
}

async fn get_dashboard_state(State(app): State<DashboardApp>) -> impl IntoResponse {
    info!(component = "dashboard", event = "http.state.request");
    Json(app.page.snapshot())
}

async fn run_pipeline(
    State(app): State<DashboardApp>,
    Query(query): Query<ReferenceDateQuery>,
) -> Result<Redirect, StatusCode> {
    let reference_date = query.reference_date.unwrap_or_default();
    info!(
        component = "dashboard",
        event = "http.run.request",
        reference_date = %reference_date
    );

    let pipeline = app.pipeline.clone();
    run_blocking("run", move || {
        pipeline.run(&reference_date);
    })
    .await?;
    Ok(Redirect::to("/dashboard"))
}

async fn fetch_ranking(
    State(app): State<DashboardApp>,
    Query(query): Query<ReferenceDateQuery>,
) -> Result<Redirect, StatusCode> {
    info!(component = "dashboard", event = "http.ranking.request");

    let table = app.table.clone();
    run_blocking("ranking", move || {
        table.fetch_and_render_ranking(query.reference_date.as_deref());
    })
    .await?;
    Ok(Redirect::to("/dashboard"))
}

async fn select_row(
    State(app): State<DashboardApp>,
    Query(query): Query<SelectQuery>,
) -> Result<Redirect, StatusCode> {
    info!(
        component = "dashboard",
        event = "http.select.request",
        row = ?query.row
    );

    let row = query.row;
    let table = app.table.clone();
    run_blocking("select", move || match row {
        Some(position) => {
            table.click_row(position);
        }
        None => {
            table.click(ClickTarget::Header);
        }
    })
    .await?;

    let page = query.page.unwrap_or(1);
    Ok(Redirect::to(&format!("/dashboard?page={page}")))
}

async fn sort_table(
    State(app): State<DashboardApp>,
    Query(query): Query<SortQuery>,
) -> Result<Redirect, StatusCode> {
    info!(
        component = "dashboard",
        event = "http.sort.request",
        column = %query.column,
        dir = ?query.dir
    );

    let table = app.table.clone();
    let sorted = run_blocking("sort", move || table.sort_by(&query.column, query.dir)).await?;

    if !sorted {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Redirect::to("/dashboard?page=1"))
}

/// Component calls use the blocking HTTP client, so they run off the
/// async workers.
async fn run_blocking<R: Send + 'static>(
    action: &'static str,
    f: impl FnOnce() -> R + Send + 'static,
) -> Result<R, StatusCode> {
    tokio::task::spawn_blocking(f).await.map_err(|err| {
        error!(
            component = "dashboard",
            event = "http.action.panicked",
            action,
            error = %err
        );
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
