//! Route handlers
//!
//! | method | path | action |
//! |--------|------|--------|
//! | POST | `/user/{user_id}/init-subscription` | open (or replace) the user's feed |
//! | POST | `/user/{user_id}/reconnect` | drop the feed and start over |
//! | DELETE | `/user/{user_id}/feed` | close the feed on purpose |
//! | GET | `/live-price/user/{user_id}/{security_id}` | one cached tick |
//! | GET | `/live-prices/user/{user_id}` | every cached tick |
//! | GET | `/connections` | connection snapshots |
//! | GET | `/health` | liveness |

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use livefeed::{ConnectionStatus, FeedError, FeedRegistry, SubscriptionSummary, Tick};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Body of subscription endpoints
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of read endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> DataResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

fn error_status(error: &FeedError) -> StatusCode {
    match error {
        FeedError::MissingCredentials(_)
        | FeedError::IncompleteCredentials { .. }
        | FeedError::NoInstruments(_) => StatusCode::BAD_REQUEST,
        FeedError::Lookup(_) => StatusCode::BAD_GATEWAY,
        FeedError::ShutDown => StatusCode::SERVICE_UNAVAILABLE,
        FeedError::Encode(_) | FeedError::Socket(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn subscription_reply(user_id: &str, result: livefeed::Result<SubscriptionSummary>) -> Response {
    match result {
        Ok(summary) => (
            StatusCode::OK,
            Json(SubscriptionResponse {
                success: true,
                subscribed_count: Some(summary.subscribed_count),
                error: None,
            }),
        )
            .into_response(),
        Err(e) => {
            warn!("Subscription request for user {} failed: {}", user_id, e);
            (
                error_status(&e),
                Json(SubscriptionResponse {
                    success: false,
                    subscribed_count: None,
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// POST /user/{user_id}/init-subscription
pub async fn init_subscription(
    State(registry): State<FeedRegistry>,
    Path(user_id): Path<String>,
) -> Response {
    let result = registry.init_user_subscription(&user_id).await;
    subscription_reply(&user_id, result)
}

/// POST /user/{user_id}/reconnect
pub async fn reconnect(
    State(registry): State<FeedRegistry>,
    Path(user_id): Path<String>,
) -> Response {
    let result = registry.reconnect_user_feed(&user_id).await;
    subscription_reply(&user_id, result)
}

/// DELETE /user/{user_id}/feed
pub async fn disconnect(
    State(registry): State<FeedRegistry>,
    Path(user_id): Path<String>,
) -> Response {
    if registry.disconnect_user(&user_id) {
        (StatusCode::OK, Json(DataResponse::ok(user_id))).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(DataResponse::<String>::error(format!("No feed for user {}", user_id))),
        )
            .into_response()
    }
}

/// GET /live-price/user/{user_id}/{security_id}
pub async fn live_price(
    State(registry): State<FeedRegistry>,
    Path((user_id, security_id)): Path<(String, String)>,
) -> Response {
    match registry.get_live_price(&user_id, &security_id) {
        Some(tick) => (StatusCode::OK, Json(DataResponse::ok(tick))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(DataResponse::<Tick>::error(format!(
                "No live price for {}",
                security_id
            ))),
        )
            .into_response(),
    }
}

/// GET /live-prices/user/{user_id}
pub async fn live_prices(
    State(registry): State<FeedRegistry>,
    Path(user_id): Path<String>,
) -> Json<DataResponse<Vec<Tick>>> {
    Json(DataResponse::ok(registry.get_bulk_live_prices(&user_id)))
}

/// GET /connections
pub async fn connections(
    State(registry): State<FeedRegistry>,
) -> Json<DataResponse<Vec<ConnectionStatus>>> {
    Json(DataResponse::ok(registry.list_connections()))
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Build the application router
pub fn router(registry: FeedRegistry) -> Router {
    Router::new()
        .route("/user/{user_id}/init-subscription", post(init_subscription))
        .route("/user/{user_id}/reconnect", post(reconnect))
        .route("/user/{user_id}/feed", delete(disconnect))
        .route("/live-price/user/{user_id}/{security_id}", get(live_price))
        .route("/live-prices/user/{user_id}", get(live_prices))
        .route("/connections", get(connections))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}
