use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod bridge;
pub mod error;
pub mod intake;
pub mod middleware;
pub mod render;
pub mod routes;
pub mod state;
pub mod telegram;
pub mod worker;

pub use bridge::{NotificationBridge, NotifyError, NotifyOutcome};
pub use intake::Intake;
pub use state::{AppContext, AppState, Settings};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    Router::new()
        .merge(routes::routes(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
