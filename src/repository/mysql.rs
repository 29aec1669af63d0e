use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::MySqlPool;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::{AttendanceRepository, RepositoryError};
use crate::model::attendance::{AttendanceInterval, AttendanceRecord, NewAttendance, SessionStatus};
use crate::model::reason::Reason;
use crate::model::user::User;

const INTERVAL_COLUMNS: &str = r#"
    Id AS id, UserId AS user_id, ReasonId AS reason_id,
    CheckIn AS check_in, CheckOut AS check_out
"#;

pub struct MySqlAttendanceRepository {
    pool: MySqlPool,
    timeout: Duration,
}

impl MySqlAttendanceRepository {
    pub fn new(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn timed<T, F>(&self, operation: &'static str, query: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, query).await {
            Ok(result) => result.map_err(RepositoryError::from),
            Err(_) => Err(RepositoryError::Timeout {
                operation,
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    async fn find_interval(&self, id: u64) -> Result<Option<AttendanceInterval>, RepositoryError> {
        let sql = format!("SELECT {INTERVAL_COLUMNS} FROM Attendances WHERE Id = ?");

        self.timed(
            "find_interval",
            sqlx::query_as::<_, AttendanceInterval>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl AttendanceRepository for MySqlAttendanceRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.timed(
            "find_user_by_email",
            sqlx::query_as::<_, User>(
                r#"
                SELECT Id AS id, Email AS email, Name AS name, LastName AS last_name, Rut AS rut
                FROM Users
                WHERE Email = ?
                "#,
            )
            .bind(email)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_reason_by_name(&self, name: &str) -> Result<Option<Reason>, RepositoryError> {
        self.timed(
            "find_reason_by_name",
            sqlx::query_as::<_, Reason>("SELECT Id AS id, Name AS name FROM Reasons WHERE Name = ?")
                .bind(name)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_open_by_user(
        &self,
        user_id: u64,
    ) -> Result<Option<AttendanceInterval>, RepositoryError> {
        let sql = format!(
            "SELECT {INTERVAL_COLUMNS} FROM Attendances WHERE UserId = ? AND CheckOut IS NULL LIMIT 1"
        );

        self.timed(
            "find_open_by_user",
            sqlx::query_as::<_, AttendanceInterval>(&sql)
                .bind(user_id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_by_check_in_range(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<AttendanceInterval>, RepositoryError> {
        let sql = format!(
            "SELECT {INTERVAL_COLUMNS} FROM Attendances WHERE CheckIn >= ? AND CheckIn <= ? ORDER BY CheckIn"
        );

        let rows = self
            .timed(
                "find_by_check_in_range",
                sqlx::query_as::<_, AttendanceInterval>(&sql)
                    .bind(from)
                    .bind(to)
                    .fetch_all(&self.pool),
            )
            .await?;

        debug!(%from, %to, count = rows.len(), "Fetched intervals by check-in range");
        Ok(rows)
    }

    async fn create_open(
        &self,
        new: NewAttendance,
    ) -> Result<Option<AttendanceInterval>, RepositoryError> {
        // the NOT EXISTS guard keeps concurrent check-ins from opening twice
        let result = self
            .timed(
                "create_open",
                sqlx::query(
                    r#"
                    INSERT INTO Attendances (UserId, ReasonId, CheckIn, CheckOut)
                    SELECT ?, ?, ?, NULL FROM DUAL
                    WHERE NOT EXISTS (
                        SELECT 1 FROM Attendances WHERE UserId = ? AND CheckOut IS NULL
                    )
                    "#,
                )
                .bind(new.user_id)
                .bind(new.reason_id)
                .bind(new.check_in)
                .bind(new.user_id)
                .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_interval(result.last_insert_id()).await
    }

    async fn close(
        &self,
        id: u64,
        check_out: NaiveDateTime,
    ) -> Result<Option<AttendanceInterval>, RepositoryError> {
        let result = self
            .timed(
                "close",
                sqlx::query("UPDATE Attendances SET CheckOut = ? WHERE Id = ? AND CheckOut IS NULL")
                    .bind(check_out)
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_interval(id).await
    }

    async fn close_open_before(&self, deadline: NaiveDateTime) -> Result<u64, RepositoryError> {
        let result = self
            .timed(
                "close_open_before",
                sqlx::query(
                    "UPDATE Attendances SET CheckOut = ? WHERE CheckOut IS NULL AND CheckIn <= ?",
                )
                .bind(deadline)
                .bind(deadline)
                .execute(&self.pool),
            )
            .await?;

        Ok(result.rows_affected())
    }

    async fn list_records(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let filter = match status {
            SessionStatus::Open => "WHERE a.CheckOut IS NULL",
            SessionStatus::Closed => "WHERE a.CheckOut IS NOT NULL",
            SessionStatus::Any => "",
        };

        let sql = format!(
            r#"
            SELECT a.Id AS id, a.UserId AS user_id, a.ReasonId AS reason_id,
                   a.CheckIn AS check_in, a.CheckOut AS check_out,
                   u.Email AS email, u.Name AS name, u.LastName AS last_name, u.Rut AS rut,
                   r.Name AS reason
            FROM Attendances a
            LEFT JOIN Users u ON u.Id = a.UserId
            LEFT JOIN Reasons r ON r.Id = a.ReasonId
            {filter}
            ORDER BY a.CheckIn
            "#
        );

        self.timed(
            "list_records",
            sqlx::query_as::<_, AttendanceRecord>(&sql).fetch_all(&self.pool),
        )
        .await
    }
}
