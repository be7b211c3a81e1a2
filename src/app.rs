use std::net::SocketAddr;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, blog, catalog, groups, notifications, quiz, users};

/// Mount point of every API route. Links in mail and notifications use it too.
pub const API_PREFIX: &str = "/api/v1";

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(catalog::router())
        .merge(groups::router())
        .merge(quiz::router())
        .merge(notifications::router())
        .merge(users::router())
        .merge(blog::router())
        .route("/health", get(|| async { "ok" }))
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.max_content_length;
    Router::new()
        .nest(API_PREFIX, api_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
