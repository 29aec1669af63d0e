use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::config::InstanceIdentity;
use crate::error::LabError;
use crate::heartbeat::client::HeartbeatClient;
use crate::heartbeat::status::{HeartbeatAttempt, HeartbeatHealth, HeartbeatTracker};

const STATUS_HISTORY: usize = 10;
const DEFAULT_HISTORY: usize = 20;

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Number of most recent attempts to return
    pub limit: Option<usize>,
}

/// Health of the registration heartbeat to the main server
#[utoipa::path(
    get,
    path = "/api/heartbeat-status",
    responses(
        (status = 200, description = "Heartbeat health and recent attempts", body = Object, example = json!({
            "success": true,
            "data": {
                "instance": {"instanceId": "LAB_01", "name": "Computer laboratory", "environment": "development"},
                "health": {"isActive": true, "isHealthy": true},
                "recentHistory": []
            }
        }))
    ),
    tag = "Heartbeat"
)]
pub async fn status(
    identity: web::Data<InstanceIdentity>,
    tracker: web::Data<HeartbeatTracker>,
) -> impl Responder {
    let health: HeartbeatHealth = tracker.health(Utc::now());
    let recent: Vec<HeartbeatAttempt> = tracker.history(STATUS_HISTORY);

    HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "instance": {
                "instanceId": identity.instance_id,
                "name": identity.name,
                "port": identity.port,
                "environment": identity.environment.to_string(),
                "mainServerUrl": identity.main_server_url,
            },
            "health": health,
            "recentHistory": recent,
        }
    }))
}

#[utoipa::path(
    get,
    path = "/api/heartbeat-status/history",
    params(HistoryQuery),
    responses((status = 200, description = "Most recent attempts, oldest first", body = [HeartbeatAttempt])),
    tag = "Heartbeat"
)]
pub async fn history(
    tracker: web::Data<HeartbeatTracker>,
    query: web::Query<HistoryQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY);
    let attempts = tracker.history(limit);

    HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "history": attempts,
            "total": tracker.history_len(),
            "limit": limit,
        }
    }))
}

/// Clears recorded attempts and counters
#[utoipa::path(
    post,
    path = "/api/heartbeat-status/reset",
    responses((status = 200, description = "Statistics cleared")),
    tag = "Heartbeat"
)]
pub async fn reset(tracker: web::Data<HeartbeatTracker>) -> impl Responder {
    tracker.reset();
    tracing::info!("Heartbeat statistics reset");

    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Heartbeat statistics reset."
    }))
}

/// Sends one heartbeat immediately
#[utoipa::path(
    post,
    path = "/api/heartbeat-status/manual",
    responses(
        (status = 200, description = "Heartbeat sent; `success` reports whether the main server accepted it"),
        (status = 503, description = "Heartbeat is disabled on this instance")
    ),
    tag = "Heartbeat"
)]
pub async fn manual(
    client: Option<web::Data<HeartbeatClient>>,
) -> Result<HttpResponse, LabError> {
    let client =
        client.ok_or_else(|| LabError::Unavailable("Heartbeat is disabled on this instance.".into()))?;

    let accepted = client.send().await;

    Ok(HttpResponse::Ok().json(json!({
        "success": accepted,
        "message": if accepted {
            "Heartbeat sent successfully."
        } else {
            "Heartbeat failed; see the history for details."
        }
    })))
}
