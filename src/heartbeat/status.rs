use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use utoipa::ToSchema;

const MAX_HISTORY: usize = 50;
const RECENT_WINDOW: usize = 10;
const HEALTHY_WITHIN_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatAttempt {
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub response_time: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatStatistics {
    pub total_attempts: u64,
    pub successful_attempts: u64,
    pub failed_attempts: u64,
    pub success_rate: f64,
    pub recent_success_rate: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatHealth {
    pub is_active: bool,
    pub is_healthy: bool,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub minutes_since_last_heartbeat: Option<i64>,
    pub statistics: HeartbeatStatistics,
}

#[derive(Default)]
struct TrackerState {
    history: VecDeque<HeartbeatAttempt>,
    total: u64,
    successful: u64,
    last_success: Option<DateTime<Utc>>,
    active: bool,
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Bounded in-memory record of heartbeat attempts.
#[derive(Default)]
pub struct HeartbeatTracker {
    state: Mutex<TrackerState>,
}

impl HeartbeatTracker {
    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, success: bool, response_time: Option<u64>, error: Option<String>) {
        self.record_at(Utc::now(), success, response_time, error);
    }

    fn record_at(
        &self,
        timestamp: DateTime<Utc>,
        success: bool,
        response_time: Option<u64>,
        error: Option<String>,
    ) {
        let mut state = self.lock();

        state.history.push_back(HeartbeatAttempt {
            timestamp,
            success,
            response_time,
            error,
        });
        if state.history.len() > MAX_HISTORY {
            state.history.pop_front();
        }

        state.total += 1;
        if success {
            state.successful += 1;
            state.last_success = Some(timestamp);
        }

        debug!(success, total = state.total, "Heartbeat attempt recorded");
    }

    pub fn set_active(&self, active: bool) {
        self.lock().active = active;
    }

    /// Most recent `limit` attempts, oldest first.
    pub fn history(&self, limit: usize) -> Vec<HeartbeatAttempt> {
        let state = self.lock();
        let skip = state.history.len().saturating_sub(limit);
        state.history.iter().skip(skip).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        let active = state.active;
        *state = TrackerState {
            active,
            ..TrackerState::default()
        };
    }

    /// Healthy means active, a success within the last five minutes, and
    /// more than half of the last ten attempts succeeded.
    pub fn health(&self, now: DateTime<Utc>) -> HeartbeatHealth {
        let state = self.lock();

        let success_rate = if state.total > 0 {
            state.successful as f64 / state.total as f64 * 100.0
        } else {
            0.0
        };

        let skip = state.history.len().saturating_sub(RECENT_WINDOW);
        let recent: Vec<_> = state.history.iter().skip(skip).collect();
        let recent_success_rate = if recent.is_empty() {
            0.0
        } else {
            recent.iter().filter(|a| a.success).count() as f64 / recent.len() as f64 * 100.0
        };

        let minutes_since = state.last_success.map(|t| (now - t).num_minutes());
        let is_healthy = state.active
            && minutes_since.is_some_and(|m| m < HEALTHY_WITHIN_MINUTES)
            && recent_success_rate > 50.0;

        HeartbeatHealth {
            is_active: state.active,
            is_healthy,
            last_heartbeat: state.last_success,
            minutes_since_last_heartbeat: minutes_since,
            statistics: HeartbeatStatistics {
                total_attempts: state.total,
                successful_attempts: state.successful,
                failed_attempts: state.total - state.successful,
                success_rate: round_2dp(success_rate),
                recent_success_rate: round_2dp(recent_success_rate),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn history_is_bounded() {
        let tracker = HeartbeatTracker::default();
        for _ in 0..(MAX_HISTORY + 7) {
            tracker.record(true, Some(12), None);
        }

        assert_eq!(tracker.history_len(), MAX_HISTORY);
        assert_eq!(tracker.history(20).len(), 20);
        assert_eq!(tracker.health(Utc::now()).statistics.total_attempts, 57);
    }

    #[test]
    fn healthy_requires_recent_success_and_activity() {
        let tracker = HeartbeatTracker::default();
        let now = Utc::now();

        tracker.record_at(now - Duration::minutes(1), true, Some(20), None);
        assert!(!tracker.health(now).is_healthy, "inactive tracker is never healthy");

        tracker.set_active(true);
        assert!(tracker.health(now).is_healthy);

        assert!(!tracker.health(now + Duration::minutes(10)).is_healthy);
    }

    #[test]
    fn mostly_failing_recent_attempts_are_unhealthy() {
        let tracker = HeartbeatTracker::default();
        tracker.set_active(true);
        tracker.record(true, Some(20), None);
        for _ in 0..9 {
            tracker.record(false, Some(10_000), Some("timeout".into()));
        }

        let health = tracker.health(Utc::now());
        assert!(!health.is_healthy);
        assert_eq!(health.statistics.failed_attempts, 9);
        assert_eq!(health.statistics.recent_success_rate, 10.0);
    }

    #[test]
    fn reset_clears_counters_but_keeps_activity() {
        let tracker = HeartbeatTracker::default();
        tracker.set_active(true);
        tracker.record(false, None, Some("refused".into()));

        tracker.reset();

        let health = tracker.health(Utc::now());
        assert!(health.is_active);
        assert_eq!(health.statistics.total_attempts, 0);
        assert_eq!(tracker.history_len(), 0);
    }
}
