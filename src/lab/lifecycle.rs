//! Check-in / check-out transitions and the end-of-day forced checkout.
//!
//! A user is either Out (no open interval) or In (exactly one open interval).

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::error::LabError;
use crate::model::attendance::{AttendanceInterval, NewAttendance};
use crate::repository::AttendanceRepository;
use crate::settings::LabConfiguration;

#[derive(Debug, Clone)]
pub struct CheckIn {
    pub email: String,
    pub reason: String,
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct CheckOut {
    pub email: String,
    pub at: NaiveDateTime,
}

pub async fn check_in(
    repo: &dyn AttendanceRepository,
    request: CheckIn,
) -> Result<AttendanceInterval, LabError> {
    let user = repo
        .find_user_by_email(&request.email)
        .await?
        .ok_or_else(|| LabError::NotFound("User not found.".into()))?;

    if let Some(open) = repo.find_open_by_user(user.id).await? {
        warn!(user_id = user.id, interval_id = open.id, "Check-in rejected: session already open");
        return Err(already_open());
    }

    let reason = repo
        .find_reason_by_name(&request.reason)
        .await?
        .ok_or_else(|| LabError::NotFound("Reason not found.".into()))?;

    let interval = repo
        .create_open(NewAttendance {
            user_id: user.id,
            reason_id: reason.id,
            check_in: request.at,
        })
        .await?
        .ok_or_else(already_open)?;

    info!(user_id = user.id, interval_id = interval.id, check_in = %interval.check_in, "Checked in");
    Ok(interval)
}

fn already_open() -> LabError {
    LabError::Conflict("User already has an open check-in. Please check out first.".into())
}

pub async fn check_out(
    repo: &dyn AttendanceRepository,
    request: CheckOut,
) -> Result<AttendanceInterval, LabError> {
    let user = repo
        .find_user_by_email(&request.email)
        .await?
        .ok_or_else(|| LabError::NotFound("User not found.".into()))?;

    let open = repo
        .find_open_by_user(user.id)
        .await?
        .ok_or_else(no_open_session)?;

    if request.at < open.check_in {
        return Err(LabError::validation("checkOut cannot be earlier than the check-in time."));
    }

    // closed concurrently between the lookup and the update
    let closed = repo
        .close(open.id, request.at)
        .await?
        .ok_or_else(no_open_session)?;

    info!(user_id = user.id, interval_id = closed.id, check_out = %request.at, "Checked out");
    Ok(closed)
}

fn no_open_session() -> LabError {
    LabError::NotFound("No open check-in found for this user.".into())
}

/// Today's closing instant for `now`.
pub fn checkout_deadline(config: &LabConfiguration, now: NaiveDateTime) -> NaiveDateTime {
    config.final_hour.on(now.date())
}

/// Closes every session still open at today's closing time.
///
/// Running it again closes nothing new: the update only touches intervals
/// that are open and checked in at or before the deadline.
pub async fn force_checkout(
    repo: &dyn AttendanceRepository,
    config: &LabConfiguration,
    now: NaiveDateTime,
) -> Result<u64, LabError> {
    let deadline = checkout_deadline(config, now);
    let closed = repo.close_open_before(deadline).await?;

    info!(%deadline, closed, "Forced checkout applied");
    Ok(closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryAttendanceRepository;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    async fn seeded() -> MemoryAttendanceRepository {
        let repo = MemoryAttendanceRepository::default();
        repo.add_user("ana@lab.test", "Ana").await;
        repo.add_user("luis@lab.test", "Luis").await;
        repo.add_reason("Study").await;
        repo
    }

    fn check_in_req(email: &str, at: NaiveDateTime) -> CheckIn {
        CheckIn {
            email: email.into(),
            reason: "Study".into(),
            at,
        }
    }

    #[actix_web::test]
    async fn check_in_then_out() {
        let repo = seeded().await;

        let opened = check_in(&repo, check_in_req("ana@lab.test", at(9, 0))).await.unwrap();
        assert!(opened.is_open());

        let closed = check_out(
            &repo,
            CheckOut {
                email: "ana@lab.test".into(),
                at: at(11, 0),
            },
        )
        .await
        .unwrap();

        assert_eq!(closed.id, opened.id);
        assert_eq!(closed.check_out, Some(at(11, 0)));
    }

    #[actix_web::test]
    async fn second_check_in_conflicts_and_keeps_the_open_session() {
        let repo = seeded().await;
        let first = check_in(&repo, check_in_req("ana@lab.test", at(9, 0))).await.unwrap();

        let err = check_in(&repo, check_in_req("ana@lab.test", at(10, 0))).await.unwrap_err();
        assert!(matches!(err, LabError::Conflict(_)));

        let intervals = repo.intervals().await;
        assert_eq!(intervals, vec![first]);
    }

    #[actix_web::test]
    async fn unknown_user_or_reason_is_not_found() {
        let repo = seeded().await;

        let err = check_in(&repo, check_in_req("nobody@lab.test", at(9, 0))).await.unwrap_err();
        assert!(matches!(err, LabError::NotFound(_)));

        let err = check_in(
            &repo,
            CheckIn {
                reason: "Napping".into(),
                ..check_in_req("ana@lab.test", at(9, 0))
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LabError::NotFound(_)));
        assert!(repo.intervals().await.is_empty());
    }

    #[actix_web::test]
    async fn check_out_without_check_in_changes_nothing() {
        let repo = seeded().await;

        let err = check_out(
            &repo,
            CheckOut {
                email: "luis@lab.test".into(),
                at: at(12, 0),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LabError::NotFound(_)));
        assert!(repo.intervals().await.is_empty());
    }

    #[actix_web::test]
    async fn check_out_before_check_in_is_rejected() {
        let repo = seeded().await;
        check_in(&repo, check_in_req("ana@lab.test", at(9, 0))).await.unwrap();

        let err = check_out(
            &repo,
            CheckOut {
                email: "ana@lab.test".into(),
                at: at(8, 0),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LabError::Validation(_)));
        assert!(repo.intervals().await[0].is_open());
    }

    #[actix_web::test]
    async fn forced_checkout_is_idempotent() {
        let repo = seeded().await;
        repo.insert_interval(1, at(9, 0), None).await;
        repo.insert_interval(2, at(10, 0), Some(at(12, 0))).await;
        // checked in after closing time, left alone
        repo.insert_interval(2, at(18, 0), None).await;

        let config = LabConfiguration::default(); // closes 17:30
        let now = at(17, 30);

        assert_eq!(force_checkout(&repo, &config, now).await.unwrap(), 1);
        let once = repo.intervals().await;

        assert_eq!(force_checkout(&repo, &config, now).await.unwrap(), 0);
        let twice = repo.intervals().await;

        assert_eq!(once, twice);
        assert_eq!(once[0].check_out, Some(at(17, 30)));
        assert_eq!(once[1].check_out, Some(at(12, 0)));
        assert!(once[2].is_open());
    }
}
