use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;
use super::rate_limit::limit_mutations;

pub fn create_router(state: AppState) -> Router {
    // Public routes: no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected routes: require a Bearer session token. Layers run bottom-up,
    // so the caller is authenticated before the rate limit sees it.
    let protected = Router::new()
        // Properties & tokens
        .route("/properties", get(handlers::properties::list).post(handlers::properties::create))
        .route("/properties/:id", get(handlers::properties::detail))
        .route("/properties/:id/tokenize", post(handlers::properties::tokenize))
        .route("/property-tokens/:id", get(handlers::properties::token))
        // Investments
        .route("/investments", post(handlers::investments::record))
        .route("/investments/me", get(handlers::investments::mine))
        .route("/investments/me/holdings", get(handlers::investments::holdings))
        .route("/investments/:id/cancel", post(handlers::investments::cancel))
        // Order book
        .route("/order-book", get(handlers::order_book::book).post(handlers::order_book::place))
        .route("/order-book/me", get(handlers::order_book::mine))
        .route(
            "/order-book/:id",
            get(handlers::order_book::detail).patch(handlers::order_book::cancel),
        )
        .route("/transactions", get(handlers::transactions::list))
        // Dividends
        .route("/dividends", post(handlers::dividends::declare))
        .route("/dividends/me/payments", get(handlers::dividends::my_payments))
        .route("/dividends/:id", get(handlers::dividends::detail))
        .route("/dividends/:id/distribute", post(handlers::dividends::distribute))
        .route("/dividends/:id/cancel", post(handlers::dividends::cancel))
        .route("/dividends/:id/payments", get(handlers::dividends::payments))
        .layer(middleware::from_fn_with_state(state.clone(), limit_mutations))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
