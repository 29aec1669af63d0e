use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    pub user_id: u64,
    pub email: Option<String>,
    pub name: Option<String>,
    pub last_name: Option<String>,
    /// Milliseconds across all closed sessions.
    pub total_time: i64,
    pub session_count: u32,
    pub total_time_hours: f64,
    pub average_session_hours: f64,
}

fn hours_2dp(millis: f64) -> f64 {
    (millis / 3_600_000.0 * 100.0).round() / 100.0
}

/// Users ranked by total time spent in closed sessions, longest first.
pub fn top_users(records: &[AttendanceRecord], limit: usize) -> Vec<TopUser> {
    let mut index: HashMap<u64, usize> = HashMap::new();
    let mut users: Vec<TopUser> = Vec::new();

    for record in records {
        let Some(check_out) = record.check_out else {
            continue;
        };
        let duration = (check_out - record.check_in).num_milliseconds();

        let slot = *index.entry(record.user_id).or_insert_with(|| {
            users.push(TopUser {
                user_id: record.user_id,
                email: record.email.clone(),
                name: record.name.clone(),
                last_name: record.last_name.clone(),
                total_time: 0,
                session_count: 0,
                total_time_hours: 0.0,
                average_session_hours: 0.0,
            });
            users.len() - 1
        });

        let user = &mut users[slot];
        user.total_time += duration;
        user.session_count += 1;
    }

    // stable: equal totals keep first-seen order
    users.sort_by(|a, b| b.total_time.cmp(&a.total_time));
    users.truncate(limit);

    for user in &mut users {
        user.total_time_hours = hours_2dp(user.total_time as f64);
        user.average_session_hours = hours_2dp(user.total_time as f64 / f64::from(user.session_count));
    }

    users
}
