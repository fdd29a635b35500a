use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    extract::OriginalUri,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    BoxError, Router,
};
use tablegate_core::not_found;
use tablegate_core::problemdetails::Problem;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::require_api_key;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::handlers::*;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Gateway routes. Everything under `/api` requires the API key, including
/// paths that match no route, so unauthenticated callers cannot map the API.
pub fn configure_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let api = Router::new()
        .route("/meta/tables", get(list_tables))
        .route(
            "/meta/schema/{table}",
            get(table_schema).delete(invalidate_schema),
        )
        .route("/{table}", get(read_table))
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(state, require_api_key));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api)
}

/// Full application: routes, docs, JSON 404s and the hardening layers
pub fn build_application(state: Arc<AppState>, config: &GatewayConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .merge(configure_routes(state.clone()))
        .fallback(route_not_found)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_secs,
                )))
                .layer(GlobalConcurrencyLimitLayer::new(config.max_in_flight)),
        )
        .layer(cors)
}

async fn route_not_found(OriginalUri(uri): OriginalUri) -> Problem {
    not_found()
        .detail(format!("No route matches {}", uri.path()))
        .build()
}

async fn handle_timeout(OriginalUri(uri): OriginalUri, err: BoxError) -> Problem {
    if err.is::<Elapsed>() {
        warn!("Request to {} timed out", uri.path());
        GatewayError::Unavailable("The request did not complete in time".to_string()).into()
    } else {
        error!("Request to {} failed in middleware: {}", uri.path(), err);
        GatewayError::Internal(err.to_string()).into()
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!("Request handler panicked: {}", message);

    Problem::from(GatewayError::Internal(message.to_string())).into_response()
}
