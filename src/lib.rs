pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod services;

use crate::config::AppConfig;
use crate::ledger::Ledger;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: AppConfig,
    pub ledger: Ledger,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl AppState {
    pub fn new(
        db: sqlx::PgPool,
        config: AppConfig,
        metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    ) -> Self {
        let ledger = Ledger::new(db.clone(), config.ledger_settings());
        Self {
            db,
            config,
            ledger,
            metrics_handle,
        }
    }
}
