use actix_web::{HttpResponse, web};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use futures::future::try_join_all;
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use crate::error::LabError;
use crate::lab::lifecycle::{self, CheckIn, CheckOut};
use crate::lab::ranking::top_users as rank_top_users;
use crate::lab::utilization;
use crate::lab::window::{business_days, working_window};
use crate::model::attendance::SessionStatus;
use crate::repository::AttendanceRepository;
use crate::scheduler::AutoCheckout;
use crate::settings::SettingsStore;
use crate::utils::time::{now_local, parse_date, parse_instant};

const TOP_USERS_LIMIT: usize = 5;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    #[schema(example = "ana@lab.test")]
    pub email: Option<String>,
    #[schema(example = "2024-03-04T09:15:00")]
    pub check_in: Option<String>,
    #[schema(example = "Study")]
    #[serde(alias = "Reason")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    #[schema(example = "ana@lab.test")]
    pub email: Option<String>,
    #[schema(example = "2024-03-04T11:40:00")]
    pub check_out: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DateQuery {
    /// Day to report on (YYYY-MM-DD), today when omitted
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MonthQuery {
    /// Month number 1-12, current month when omitted
    pub month: Option<String>,
    /// Four digit year, current year when omitted
    pub year: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn missing_fields(fields: &[(&str, Option<&str>)]) -> Result<(), LabError> {
    let missing: Vec<_> = fields
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| format!("{name} is required"))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LabError::Validation(missing))
    }
}

fn instant(field: &str, raw: &str) -> Result<NaiveDateTime, LabError> {
    parse_instant(raw)
        .ok_or_else(|| LabError::validation(format!("{field} must be an ISO-8601 timestamp")))
}

fn resolve_date(raw: Option<&str>, now: NaiveDateTime) -> Result<NaiveDate, LabError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(now.date()),
        Some(raw) => {
            parse_date(raw).ok_or_else(|| LabError::validation("date must use the YYYY-MM-DD format"))
        }
    }
}

/// Check a user into the lab
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Session opened", body = AttendanceInterval),
        (status = 400, description = "Missing or malformed fields"),
        (status = 404, description = "Unknown user or reason"),
        (status = 409, description = "User already has an open session"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_check_in", skip(repo, payload))]
pub async fn check_in(
    repo: web::Data<dyn AttendanceRepository>,
    payload: web::Json<CheckInRequest>,
) -> Result<HttpResponse, LabError> {
    let email = present(&payload.email);
    let check_in = present(&payload.check_in);
    let reason = present(&payload.reason);

    missing_fields(&[("email", email), ("checkIn", check_in), ("reason", reason)])?;

    let (Some(email), Some(check_in), Some(reason)) = (email, check_in, reason) else {
        return Err(LabError::validation("Missing required fields."));
    };

    let interval = lifecycle::check_in(
        repo.get_ref(),
        CheckIn {
            email: email.to_string(),
            reason: reason.to_string(),
            at: instant("checkIn", check_in)?,
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(interval))
}

/// Check a user out of the lab
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Session closed", body = Object, example = json!({
            "message": "Checked out successfully."
        })),
        (status = 400, description = "Missing or malformed fields"),
        (status = 404, description = "Unknown user or no open session"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_check_out", skip(repo, payload))]
pub async fn check_out(
    repo: web::Data<dyn AttendanceRepository>,
    payload: web::Json<CheckOutRequest>,
) -> Result<HttpResponse, LabError> {
    let email = present(&payload.email);
    let check_out = present(&payload.check_out);

    missing_fields(&[("email", email), ("checkOut", check_out)])?;

    let (Some(email), Some(check_out)) = (email, check_out) else {
        return Err(LabError::validation("Missing required fields."));
    };

    let interval = lifecycle::check_out(
        repo.get_ref(),
        CheckOut {
            email: email.to_string(),
            at: instant("checkOut", check_out)?,
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Checked out successfully.",
        "attendance": interval
    })))
}

async fn list(
    repo: &dyn AttendanceRepository,
    status: SessionStatus,
) -> Result<HttpResponse, LabError> {
    let records = repo.list_records(status).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/attendance/list-active-users",
    responses((status = 200, body = [AttendanceRecord])),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_active_users(
    repo: web::Data<dyn AttendanceRepository>,
) -> Result<HttpResponse, LabError> {
    list(repo.get_ref(), SessionStatus::Open).await
}

#[utoipa::path(
    get,
    path = "/api/attendance/list-inactive-users",
    responses((status = 200, body = [AttendanceRecord])),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_inactive_users(
    repo: web::Data<dyn AttendanceRepository>,
) -> Result<HttpResponse, LabError> {
    list(repo.get_ref(), SessionStatus::Closed).await
}

#[utoipa::path(
    get,
    path = "/api/attendance/list-all-users",
    responses((status = 200, body = [AttendanceRecord])),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_all_users(
    repo: web::Data<dyn AttendanceRepository>,
) -> Result<HttpResponse, LabError> {
    list(repo.get_ref(), SessionStatus::Any).await
}

/// Five users with the most time in closed sessions
#[utoipa::path(
    get,
    path = "/api/attendance/top-users",
    responses((status = 200, body = [TopUser])),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn top_users(
    repo: web::Data<dyn AttendanceRepository>,
) -> Result<HttpResponse, LabError> {
    let records = repo.list_records(SessionStatus::Closed).await?;
    Ok(HttpResponse::Ok().json(rank_top_users(&records, TOP_USERS_LIMIT)))
}

/// Utilization of one working day
#[utoipa::path(
    get,
    path = "/api/attendance/lab-utilization",
    params(DateQuery),
    responses(
        (status = 200, body = DailyUtilization),
        (status = 400, description = "Malformed date")
    ),
    security(("bearer_auth" = [])),
    tag = "Utilization"
)]
#[instrument(name = "lab_utilization", skip(repo, settings))]
pub async fn lab_utilization(
    repo: web::Data<dyn AttendanceRepository>,
    settings: web::Data<SettingsStore>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, LabError> {
    let now = now_local();
    let date = resolve_date(query.date.as_deref(), now)?;
    let config = settings.snapshot();

    let window = working_window(date, &config);
    let intervals = repo.find_by_check_in_range(window.start, window.end).await?;

    Ok(HttpResponse::Ok().json(utilization::daily(date, &config, &intervals, now)))
}

/// Utilization per clock hour of one working day
#[utoipa::path(
    get,
    path = "/api/attendance/hourly-utilization",
    params(DateQuery),
    responses(
        (status = 200, body = [HourlyUtilization]),
        (status = 400, description = "Malformed date")
    ),
    security(("bearer_auth" = [])),
    tag = "Utilization"
)]
#[instrument(name = "hourly_utilization", skip(repo, settings))]
pub async fn hourly_utilization(
    repo: web::Data<dyn AttendanceRepository>,
    settings: web::Data<SettingsStore>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, LabError> {
    let now = now_local();
    let date = resolve_date(query.date.as_deref(), now)?;
    let config = settings.snapshot();

    let window = working_window(date, &config);
    let intervals = repo.find_by_check_in_range(window.start, window.end).await?;

    Ok(HttpResponse::Ok().json(utilization::hourly(date, &config, &intervals, now)))
}

/// Utilization across the business days of a month
#[utoipa::path(
    get,
    path = "/api/attendance/monthly-utilization",
    params(MonthQuery),
    responses(
        (status = 200, body = MonthlyUtilization),
        (status = 400, description = "Malformed month or year")
    ),
    security(("bearer_auth" = [])),
    tag = "Utilization"
)]
#[instrument(name = "monthly_utilization", skip(repo, settings))]
pub async fn monthly_utilization(
    repo: web::Data<dyn AttendanceRepository>,
    settings: web::Data<SettingsStore>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, LabError> {
    let now = now_local();

    let month = match query.month.as_deref().map(str::trim) {
        None | Some("") => now.month(),
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| LabError::validation("month must be a number between 1 and 12"))?,
    };
    let year = match query.year.as_deref().map(str::trim) {
        None | Some("") => now.year(),
        Some(raw) => raw
            .parse::<i32>()
            .ok()
            .filter(|y| (1970..=9999).contains(y))
            .ok_or_else(|| LabError::validation("year must be a four digit number"))?,
    };

    let days = business_days(year, month)
        .ok_or_else(|| LabError::validation("month and year do not form a valid date"))?;
    let config = settings.snapshot();

    let fetches = days.into_iter().map(|day| {
        let window = working_window(day, &config);
        let repo = repo.clone();
        async move {
            repo.find_by_check_in_range(window.start, window.end)
                .await
                .map(|intervals| (day, intervals))
        }
    });
    let per_day = try_join_all(fetches).await?;

    Ok(HttpResponse::Ok().json(utilization::monthly(year, month, &config, &per_day, now)))
}

/// Close every session still open at today's closing time
#[utoipa::path(
    post,
    path = "/api/attendance/force-auto-checkout",
    responses(
        (status = 200, description = "Forced checkout executed", body = Object, example = json!({
            "message": "Force auto-checkout executed.",
            "closed": 3
        })),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn force_auto_checkout(
    checkout: web::Data<AutoCheckout>,
) -> Result<HttpResponse, LabError> {
    let closed = checkout.trigger().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Force auto-checkout executed.",
        "closed": closed
    })))
}
