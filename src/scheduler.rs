use chrono::{Duration as ChronoDuration, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::error::LabError;
use crate::lab::lifecycle::{checkout_deadline, force_checkout};
use crate::repository::AttendanceRepository;
use crate::settings::{LabConfiguration, SettingsStore};
use crate::utils::time::now_local;

/// Time until the next closing instant strictly after `now`.
pub fn until_next_deadline(config: &LabConfiguration, now: NaiveDateTime) -> Duration {
    let mut deadline = checkout_deadline(config, now);
    if deadline <= now {
        deadline += ChronoDuration::days(1);
    }
    (deadline - now).to_std().unwrap_or(Duration::ZERO)
}

/// Daily forced checkout at closing time, plus an on-demand trigger.
pub struct AutoCheckout {
    repo: Arc<dyn AttendanceRepository>,
    settings: Arc<SettingsStore>,
}

impl AutoCheckout {
    pub fn new(repo: Arc<dyn AttendanceRepository>, settings: Arc<SettingsStore>) -> Self {
        Self { repo, settings }
    }

    /// Runs the forced checkout now against the current settings.
    pub async fn trigger(&self) -> Result<u64, LabError> {
        let config = self.settings.snapshot();
        force_checkout(self.repo.as_ref(), &config, now_local()).await
    }

    /// Each cycle reads the settings afresh, so a changed `finalHour`
    /// applies from the next deadline on.
    pub fn spawn(self: Arc<Self>) {
        actix_web::rt::spawn(async move {
            loop {
                let config = self.settings.snapshot();
                let wait = until_next_deadline(&config, now_local());
                info!(final_hour = %config.final_hour, wait_secs = wait.as_secs(), "Auto-checkout scheduled");

                tokio::time::sleep(wait).await;

                match self.trigger().await {
                    Ok(closed) => info!(closed, "Scheduled auto-checkout finished"),
                    Err(e) => error!(error = %e, "Scheduled auto-checkout failed"),
                }
            }
        });
    }
}
