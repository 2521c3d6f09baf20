//! The HTTP webhook surface (§6 "Webhook surface") and a liveness probe.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use switchyard_core::{PluginInstanceId, WebhookRequest};

use crate::router::{IngressRouter, RouteOutcome};

#[derive(Clone)]
struct IngressState {
    router: Arc<IngressRouter>,
}

/// Build the axum router exposing `POST /hooks/:pluginType/:pluginInstanceId`
/// and `GET /v1/status`, with request tracing (§4.A, §6).
#[must_use]
pub fn router(ingress: Arc<IngressRouter>) -> Router {
    Router::new()
        .route("/hooks/:plugin_type/:plugin_instance_id", post(handle_webhook))
        .route("/v1/status", get(handle_status))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(IngressState { router: ingress })
}

async fn handle_webhook(
    State(state): State<IngressState>,
    Path((plugin_type, plugin_instance_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let request = WebhookRequest {
        body: body.to_vec(),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        query,
    };

    let plugin_instance_id = PluginInstanceId::from_uuid(plugin_instance_id);
    match state
        .router
        .route_webhook(&plugin_type, plugin_instance_id, request)
        .await
    {
        Ok(outcome) => outcome_to_response(outcome),
        Err(err) => {
            tracing::error!(error = %err, plugin_type, %plugin_instance_id, "webhook routing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "internal"})),
            )
                .into_response()
        }
    }
}

fn outcome_to_response(outcome: RouteOutcome) -> Response {
    match outcome {
        RouteOutcome::Created { work_item_id } => (
            StatusCode::CREATED,
            Json(serde_json::json!({"created": true, "workItemId": work_item_id.to_string()})),
        )
            .into_response(),
        RouteOutcome::Duplicate { work_item_id } => (
            StatusCode::OK,
            Json(serde_json::json!({"duplicate": true, "workItemId": work_item_id.to_string()})),
        )
            .into_response(),
        RouteOutcome::Ignored { reason } => (
            StatusCode::OK,
            Json(serde_json::json!({"ignored": true, "reason": reason})),
        )
            .into_response(),
        RouteOutcome::Rejected { reason } => {
            let status = if reason == "parse_error" {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::BAD_REQUEST
            };
            (status, Json(serde_json::json!({"error": reason}))).into_response()
        }
        RouteOutcome::PluginResponse { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
            (status, body).into_response()
        }
    }
}

async fn handle_status() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}
