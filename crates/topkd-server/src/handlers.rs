//! HTTP query surface over the live ranked set.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;
use topkd_aggregation::{GetTopKItemsParams, Queries};

const DEFAULT_LIMIT: i64 = 100;

/// Application state shared across all requests.
#[derive(Clone)]
pub struct AppState {
    pub queries: Arc<Queries>,
}

/// Error type that maps onto an HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request error: {:?}", self.error);
        (
            self.status,
            Json(json!({ "error": self.error.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct TopItemsQuery {
    limit: Option<i64>,
}

/// GET /v1/items/top - current top-K items, highest count first
async fn get_top_items(
    State(state): State<AppState>,
    Query(query): Query<TopItemsQuery>,
) -> Result<Response, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 0 {
        return Err(AppError {
            status: StatusCode::BAD_REQUEST,
            error: anyhow::anyhow!("limit must be non-negative"),
        });
    }

    let response = state.queries.get_top_k_items(GetTopKItemsParams { limit });
    Ok(Json(response).into_response())
}

/// GET /healthz - liveness probe
async fn healthz() -> &'static str {
    "ok"
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/items/top", get(get_top_items))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use topkd_core::{new_top_k_items, RankedItem};

    fn app_state() -> AppState {
        let items = new_top_k_items(10);
        items.update_if_greater(RankedItem::new("a", 5));
        items.update_if_greater(RankedItem::new("b", 9));
        AppState {
            queries: Arc::new(Queries::new(items)),
        }
    }

    #[tokio::test]
    async fn top_items_returns_ranked_json() {
        let response = get_top_items(
            State(app_state()),
            Query(TopItemsQuery { limit: Some(1) }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            decoded,
            json!({ "data": [{ "itemId": "b", "count": 9 }] })
        );
    }

    #[tokio::test]
    async fn top_items_rejects_negative_limit() {
        let result = get_top_items(
            State(app_state()),
            Query(TopItemsQuery { limit: Some(-1) }),
        )
        .await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
