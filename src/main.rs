use estate_ledger::api::router::create_router;
use estate_ledger::config::AppConfig;
use estate_ledger::services::order_expiry::run_order_expiry_sweep;
use estate_ledger::{db, metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database connected, migrations applied");

    let metrics_handle = metrics::init_metrics();
    let state = AppState::new(pool, config, metrics_handle);

    // --- Background: order expiry + rate-limit window pruning ---
    if state.config.order_expiry_sweep_secs > 0 {
        let orders = state.ledger.orders.clone();
        let sweep_pool = state.db.clone();
        let interval_secs = state.config.order_expiry_sweep_secs;
        tokio::spawn(async move {
            run_order_expiry_sweep(orders, sweep_pool, interval_secs).await;
        });
    } else {
        tracing::info!("Order expiry sweep disabled (ORDER_EXPIRY_SWEEP_SECS=0)");
    }

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
