use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use common::balance_api::BalanceFetcher;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::builder::RefreshError;
use crate::pagination::PageView;
use crate::roster::RosterError;
use crate::session::{LeaderboardSession, SessionStatus};

/// Shared application state available to all handlers.
pub struct AppState<F> {
    pub session: Arc<LeaderboardSession<F>>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

pub fn router<F>(state: Arc<AppState<F>>) -> Router
where
    F: BalanceFetcher + Send + Sync + 'static,
{
    Router::new()
        .route("/api/health", get(health::<F>))
        .route("/api/status", get(status::<F>))
        .route("/api/leaderboard", get(leaderboard::<F>))
        .route("/api/leaderboard/next", post(next_page::<F>))
        .route("/api/leaderboard/prev", post(prev_page::<F>))
        .route("/api/refresh", post(refresh::<F>))
        .route("/api/addresses", put(enter_addresses::<F>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: i64,
}

async fn health<F>(State(state): State<Arc<AppState<F>>>) -> impl IntoResponse
where
    F: BalanceFetcher + Send + Sync + 'static,
{
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds();

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: uptime,
    })
}

async fn status<F>(State(state): State<Arc<AppState<F>>>) -> Json<SessionStatus>
where
    F: BalanceFetcher + Send + Sync + 'static,
{
    Json(state.session.status().await)
}

#[derive(Deserialize)]
pub struct PageParams {
    page: Option<usize>,
}

async fn leaderboard<F>(
    State(state): State<Arc<AppState<F>>>,
    Query(params): Query<PageParams>,
) -> Json<PageView>
where
    F: BalanceFetcher + Send + Sync + 'static,
{
    let view = match params.page {
        Some(n) => state.session.go_to_page(n).await,
        None => state.session.current_page().await,
    };
    Json(view)
}

async fn next_page<F>(State(state): State<Arc<AppState<F>>>) -> Json<PageView>
where
    F: BalanceFetcher + Send + Sync + 'static,
{
    Json(state.session.next_page().await)
}

async fn prev_page<F>(State(state): State<Arc<AppState<F>>>) -> Json<PageView>
where
    F: BalanceFetcher + Send + Sync + 'static,
{
    Json(state.session.prev_page().await)
}

async fn refresh<F>(State(state): State<Arc<AppState<F>>>) -> Response
where
    F: BalanceFetcher + Send + Sync + 'static,
{
    match state.session.manual_refresh().await {
        Ok(view) => Json(view).into_response(),
        Err(e @ RefreshError::Fetch(_)) => error_response(StatusCode::BAD_GATEWAY, e),
        Err(e @ RefreshError::Busy) => error_response(StatusCode::CONFLICT, e),
        Err(e @ RefreshError::Superseded) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, e)
        }
    }
}

#[derive(Serialize)]
struct AddressesResponse {
    addresses: usize,
}

async fn enter_addresses<F>(State(state): State<Arc<AppState<F>>>, body: String) -> Response
where
    F: BalanceFetcher + Send + Sync + 'static,
{
    match state.session.enter_addresses(&body).await {
        Ok(count) => Json(AddressesResponse { addresses: count }).into_response(),
        Err(e @ RosterError::EmptyInput) => error_response(StatusCode::BAD_REQUEST, e),
        Err(e @ RosterError::Fixed) => error_response(StatusCode::CONFLICT, e),
    }
}
