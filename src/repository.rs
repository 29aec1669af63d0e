use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::model::attendance::{AttendanceInterval, AttendanceRecord, NewAttendance, SessionStatus};
use crate::model::reason::Reason;
use crate::model::user::User;

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },
}

/// Named queries over users, reasons and attendance intervals.
#[async_trait]
pub trait AttendanceRepository: Send + Sync + 'static {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_reason_by_name(&self, name: &str) -> Result<Option<Reason>, RepositoryError>;

    async fn find_open_by_user(
        &self,
        user_id: u64,
    ) -> Result<Option<AttendanceInterval>, RepositoryError>;

    /// Intervals whose check-in lies in `[from, to]`, ordered by check-in.
    async fn find_by_check_in_range(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<AttendanceInterval>, RepositoryError>;

    /// Inserts an open interval unless the user already has one; `None` then.
    async fn create_open(
        &self,
        new: NewAttendance,
    ) -> Result<Option<AttendanceInterval>, RepositoryError>;

    /// Sets `check_out` on interval `id` if it is still open.
    async fn close(
        &self,
        id: u64,
        check_out: NaiveDateTime,
    ) -> Result<Option<AttendanceInterval>, RepositoryError>;

    /// Closes every open interval that checked in at or before `deadline`,
    /// stamping `check_out = deadline`. Returns the number closed.
    async fn close_open_before(&self, deadline: NaiveDateTime) -> Result<u64, RepositoryError>;

    async fn list_records(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError>;
}
