use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One user's check-in/check-out session. `check_out = None` while open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "PascalCase")]
#[schema(example = json!({
    "Id": 1,
    "UserId": 7,
    "ReasonId": 2,
    "CheckIn": "2024-03-04T09:15:00",
    "CheckOut": null
}))]
pub struct AttendanceInterval {
    pub id: u64,
    pub user_id: u64,
    pub reason_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub check_in: NaiveDateTime,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<NaiveDateTime>,
}

impl AttendanceInterval {
    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub user_id: u64,
    pub reason_id: u64,
    pub check_in: NaiveDateTime,
}

/// An interval flattened with its user and reason, as listed to operators.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct AttendanceRecord {
    pub id: u64,
    pub user_id: u64,
    pub reason_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub check_in: NaiveDateTime,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<NaiveDateTime>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub rut: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Open,
    Closed,
    Any,
}

#[cfg(test)]
impl SessionStatus {
    pub fn matches(&self, check_out: Option<NaiveDateTime>) -> bool {
        match self {
            SessionStatus::Open => check_out.is_none(),
            SessionStatus::Closed => check_out.is_some(),
            SessionStatus::Any => true,
        }
    }
}
