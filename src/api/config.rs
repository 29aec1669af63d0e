use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

use crate::auth::auth::AuthUser;
use crate::settings::{ConfigUpdate, SettingsStore};

/// Current opening hours and capacity
#[utoipa::path(
    get,
    path = "/api/config/get-config",
    responses(
        (status = 200, description = "Current lab settings", body = LabConfiguration)
    ),
    security(("bearer_auth" = [])),
    tag = "Configuration"
)]
pub async fn get_config(settings: web::Data<SettingsStore>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": *settings.snapshot()
    }))
}

/// Change opening hours or capacity (admin only)
#[utoipa::path(
    put,
    path = "/api/config/update-config",
    request_body = ConfigUpdate,
    responses(
        (status = 200, description = "Settings updated", body = Object, example = json!({
            "success": true,
            "message": "Configuration updated successfully.",
            "data": {"inicialHour": "08:30", "finalHour": "17:30", "maxCapacity": 12}
        })),
        (status = 400, description = "Invalid values", body = Object, example = json!({
            "message": "Validation failed",
            "errors": ["inicialHour must be earlier than finalHour"]
        })),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Settings could not be saved")
    ),
    security(("bearer_auth" = [])),
    tag = "Configuration"
)]
pub async fn update_config(
    user: AuthUser,
    settings: web::Data<SettingsStore>,
    payload: web::Json<ConfigUpdate>,
) -> actix_web::Result<impl Responder> {
    user.require_admin()?;

    let mut update = payload.into_inner();
    if update.updated_by.is_none() {
        update.updated_by = Some(user.username.clone());
    }

    let next = settings.update(&update).await?;
    tracing::info!(user_id = user.user_id, "Lab settings changed through the API");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Configuration updated successfully.",
        "data": *next
    })))
}
