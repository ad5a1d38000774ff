use std::sync::Arc;

use frdash::{
    dashboard_config_from_env, dashboard_router, init_logging, log_app_bind, log_app_start,
    log_backend_selected, logging_config_from_env, BackendEndpoints, DashboardApp,
    ReqwestJsonFetcher,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);

    let cfg = dashboard_config_from_env();
    let endpoints = BackendEndpoints::new(&cfg.backend_url)?;
    log_backend_selected(endpoints.base_url(), cfg.initial_reference_date.as_deref());

    // The blocking client owns its own runtime thread; build it off the async workers.
    let fetcher = tokio::task::spawn_blocking(ReqwestJsonFetcher::new).await?;
    let app = DashboardApp::new(Arc::new(fetcher), endpoints);

    if cfg.run_on_start {
        let pipeline = app.pipeline.clone();
        let reference_date = cfg.initial_reference_date.clone().unwrap_or_default();
        tokio::task::spawn_blocking(move || pipeline.run(&reference_date)).await?;
    }

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    let bound_addr = listener.local_addr()?;

    log_app_bind(bound_addr);
    axum::serve(listener, dashboard_router(app)).await?;

    Ok(())
}
