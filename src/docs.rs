use crate::api::attendance::{CheckInRequest, CheckOutRequest};
use crate::heartbeat::status::{HeartbeatAttempt, HeartbeatHealth, HeartbeatStatistics};
use crate::lab::ranking::TopUser;
use crate::lab::utilization::{DailyUtilization, DayBreakdown, HourlyUtilization, MonthlyUtilization};
use crate::model::attendance::{AttendanceInterval, AttendanceRecord};
use crate::settings::{ConfigUpdate, LabConfiguration};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lab Attendance API",
        version = "0.1.0",
        description = r#"
## Lab attendance and utilization

Tracks who is inside a shared computer lab and reports how busy it is.

### Key features
- **Kiosk check-in / check-out** (public)
- **Attendance listings** of open, closed or all sessions
- **Utilization reports** per day, per hour and per month against the lab's capacity
- **Top users** by accumulated time
- **Automatic checkout** of forgotten sessions at closing time
- **Runtime configuration** of opening hours and capacity

### Security
Reports and configuration require a **JWT Bearer** access token.
Changing the configuration requires the admin role.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::list_active_users,
        crate::api::attendance::list_inactive_users,
        crate::api::attendance::list_all_users,
        crate::api::attendance::top_users,
        crate::api::attendance::lab_utilization,
        crate::api::attendance::hourly_utilization,
        crate::api::attendance::monthly_utilization,
        crate::api::attendance::force_auto_checkout,

        crate::api::config::get_config,
        crate::api::config::update_config,

        crate::api::heartbeat::status,
        crate::api::heartbeat::history,
        crate::api::heartbeat::reset,
        crate::api::heartbeat::manual
    ),
    components(
        schemas(
            CheckInRequest,
            CheckOutRequest,
            AttendanceInterval,
            AttendanceRecord,
            TopUser,
            DailyUtilization,
            HourlyUtilization,
            DayBreakdown,
            MonthlyUtilization,
            LabConfiguration,
            ConfigUpdate,
            HeartbeatAttempt,
            HeartbeatStatistics,
            HeartbeatHealth
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in, check-out and session listings"),
        (name = "Utilization", description = "Occupancy reports"),
        (name = "Configuration", description = "Opening hours and capacity"),
        (name = "Heartbeat", description = "Registration with the main server"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route_and_the_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/attendance/monthly-utilization"));
        assert!(doc.paths.paths.contains_key("/api/config/update-config"));
        assert!(doc.paths.paths.contains_key("/api/heartbeat-status"));

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("MonthlyUtilization"));
    }
}
