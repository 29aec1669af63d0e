use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::Mutex;

use super::{AttendanceRepository, RepositoryError};
use crate::model::attendance::{AttendanceInterval, AttendanceRecord, NewAttendance, SessionStatus};
use crate::model::reason::Reason;
use crate::model::user::User;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    reasons: Vec<Reason>,
    intervals: Vec<AttendanceInterval>,
}

/// In-process backend used by the handler and lifecycle tests.
#[derive(Default)]
pub struct MemoryAttendanceRepository {
    tables: Mutex<Tables>,
}

impl MemoryAttendanceRepository {
    pub async fn add_user(&self, email: &str, name: &str) -> u64 {
        let mut tables = self.tables.lock().await;
        let id = tables.users.len() as u64 + 1;
        tables.users.push(User {
            id,
            email: email.to_string(),
            name: Some(name.to_string()),
            last_name: None,
            rut: None,
        });
        id
    }

    pub async fn add_reason(&self, name: &str) -> u64 {
        let mut tables = self.tables.lock().await;
        let id = tables.reasons.len() as u64 + 1;
        tables.reasons.push(Reason {
            id,
            name: name.to_string(),
        });
        id
    }

    pub async fn insert_interval(
        &self,
        user_id: u64,
        check_in: NaiveDateTime,
        check_out: Option<NaiveDateTime>,
    ) -> u64 {
        let mut tables = self.tables.lock().await;
        let id = tables.intervals.len() as u64 + 1;
        tables.intervals.push(AttendanceInterval {
            id,
            user_id,
            reason_id: 1,
            check_in,
            check_out,
        });
        id
    }

    pub async fn intervals(&self) -> Vec<AttendanceInterval> {
        self.tables.lock().await.intervals.clone()
    }
}

#[async_trait]
impl AttendanceRepository for MemoryAttendanceRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_reason_by_name(&self, name: &str) -> Result<Option<Reason>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.reasons.iter().find(|r| r.name == name).cloned())
    }

    async fn find_open_by_user(
        &self,
        user_id: u64,
    ) -> Result<Option<AttendanceInterval>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .intervals
            .iter()
            .find(|i| i.user_id == user_id && i.is_open())
            .cloned())
    }

    async fn find_by_check_in_range(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<AttendanceInterval>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<_> = tables
            .intervals
            .iter()
            .filter(|i| i.check_in >= from && i.check_in <= to)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.check_in);
        Ok(rows)
    }

    async fn create_open(
        &self,
        new: NewAttendance,
    ) -> Result<Option<AttendanceInterval>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.intervals.iter().any(|i| i.user_id == new.user_id && i.is_open()) {
            return Ok(None);
        }

        let interval = AttendanceInterval {
            id: tables.intervals.len() as u64 + 1,
            user_id: new.user_id,
            reason_id: new.reason_id,
            check_in: new.check_in,
            check_out: None,
        };
        tables.intervals.push(interval.clone());
        Ok(Some(interval))
    }

    async fn close(
        &self,
        id: u64,
        check_out: NaiveDateTime,
    ) -> Result<Option<AttendanceInterval>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .intervals
            .iter_mut()
            .find(|i| i.id == id && i.is_open())
            .map(|i| {
                i.check_out = Some(check_out);
                i.clone()
            }))
    }

    async fn close_open_before(&self, deadline: NaiveDateTime) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let mut closed = 0;
        for interval in tables
            .intervals
            .iter_mut()
            .filter(|i| i.is_open() && i.check_in <= deadline)
        {
            interval.check_out = Some(deadline);
            closed += 1;
        }
        Ok(closed)
    }

    async fn list_records(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<_> = tables
            .intervals
            .iter()
            .filter(|i| status.matches(i.check_out))
            .map(|i| {
                let user = tables.users.iter().find(|u| u.id == i.user_id);
                let reason = tables.reasons.iter().find(|r| r.id == i.reason_id);
                AttendanceRecord {
                    id: i.id,
                    user_id: i.user_id,
                    reason_id: i.reason_id,
                    check_in: i.check_in,
                    check_out: i.check_out,
                    email: user.map(|u| u.email.clone()),
                    name: user.and_then(|u| u.name.clone()),
                    last_name: user.and_then(|u| u.last_name.clone()),
                    rut: user.and_then(|u| u.rut.clone()),
                    reason: reason.map(|r| r.name.clone()),
                }
            })
            .collect();
        rows.sort_by_key(|r| r.check_in);
        Ok(rows)
    }
}
