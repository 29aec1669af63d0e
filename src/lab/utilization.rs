use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::lab::occupancy::OccupancySampler;
use crate::lab::window::{hour_start, working_hours, working_window};
use crate::model::attendance::AttendanceInterval;
use crate::settings::LabConfiguration;

/// `round(100 * utilized / possible)`, or 0 when nothing was possible.
pub fn percentage(utilized: i64, possible: i64) -> u32 {
    if possible <= 0 {
        return 0;
    }
    (100.0 * utilized as f64 / possible as f64).round() as u32
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "utilizationPercentage": 10,
    "totalUtilizedMinutes": 540,
    "utilizationHours": 9,
    "utilizationMinutesRemainder": 0,
    "maxPossibleMinutes": 5400,
    "currentOccupancy": 0,
    "maxCapacity": 10,
    "date": "2024-03-04"
}))]
pub struct DailyUtilization {
    pub utilization_percentage: u32,
    pub total_utilized_minutes: i64,
    pub utilization_hours: i64,
    pub utilization_minutes_remainder: i64,
    pub max_possible_minutes: i64,
    pub current_occupancy: usize,
    pub max_capacity: u32,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
}

pub fn daily(
    date: NaiveDate,
    config: &LabConfiguration,
    intervals: &[AttendanceInterval],
    now: NaiveDateTime,
) -> DailyUtilization {
    let window = working_window(date, config);
    let summary = OccupancySampler::new(intervals, &window, now, config.max_capacity)
        .summarize(window.start, window.end);

    let max_possible = i64::from(config.max_capacity) * window.minutes();
    let utilized = summary.utilized_minutes;

    DailyUtilization {
        utilization_percentage: percentage(utilized, max_possible),
        total_utilized_minutes: utilized,
        utilization_hours: utilized / 60,
        utilization_minutes_remainder: utilized % 60,
        max_possible_minutes: max_possible,
        current_occupancy: intervals.iter().filter(|i| i.is_open()).count(),
        max_capacity: config.max_capacity,
        date,
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HourlyUtilization {
    #[schema(example = "09:00")]
    pub hour: String,
    #[schema(example = 35)]
    pub utilization: u32,
    /// Peak simultaneous users within the hour, unclamped.
    #[schema(example = 4)]
    pub active_users: u32,
    #[schema(example = 210)]
    pub total_minutes: i64,
}

/// One row per clock hour of the working day, omitting hours not yet begun.
///
/// Each row samples its whole clock hour, so the partial first and last
/// hours of a window like 08:30-17:30 include minutes outside the window.
pub fn hourly(
    date: NaiveDate,
    config: &LabConfiguration,
    intervals: &[AttendanceInterval],
    now: NaiveDateTime,
) -> Vec<HourlyUtilization> {
    let window = working_window(date, config);
    let sampler = OccupancySampler::new(intervals, &window, now, config.max_capacity);
    let max_possible = i64::from(config.max_capacity) * 60;

    working_hours(config)
        .into_iter()
        .filter_map(|hour| hour_start(date, hour).map(|start| (hour, start)))
        .filter(|(_, start)| *start <= now)
        .map(|(hour, start)| {
            let summary = sampler.summarize(start, start + Duration::hours(1));
            HourlyUtilization {
                hour: format!("{hour:02}:00"),
                utilization: percentage(summary.utilized_minutes, max_possible),
                active_users: summary.peak_occupancy,
                total_minutes: summary.utilized_minutes,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayBreakdown {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub utilization_percentage: u32,
    pub utilized_minutes: i64,
    /// Sessions that started within the day's window.
    pub active_users: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyUtilization {
    pub month: u32,
    pub year: i32,
    pub monthly_utilization_percentage: u32,
    pub average_daily_utilization_percentage: u32,
    pub total_utilized_minutes: i64,
    pub total_utilized_hours: i64,
    pub total_utilized_minutes_remainder: i64,
    pub business_days_count: usize,
    pub total_possible_minutes: i64,
    pub daily_breakdown: Vec<DayBreakdown>,
    pub peak_day: Option<DayBreakdown>,
    pub low_day: Option<DayBreakdown>,
}

/// Folds per-day reports for every business day of a month.
///
/// `days` holds each business day with the intervals that checked in during
/// its window, in date order. Days after `now` stay in the count and
/// contribute zero minutes.
pub fn monthly(
    year: i32,
    month: u32,
    config: &LabConfiguration,
    days: &[(NaiveDate, Vec<AttendanceInterval>)],
    now: NaiveDateTime,
) -> MonthlyUtilization {
    let breakdown: Vec<DayBreakdown> = days
        .iter()
        .map(|(date, intervals)| {
            let report = daily(*date, config, intervals, now);
            DayBreakdown {
                date: *date,
                utilization_percentage: report.utilization_percentage,
                utilized_minutes: report.total_utilized_minutes,
                active_users: intervals.len(),
            }
        })
        .collect();

    let window_minutes = days
        .first()
        .map(|(date, _)| working_window(*date, config).minutes())
        .unwrap_or(0);

    let total_utilized: i64 = breakdown.iter().map(|d| d.utilized_minutes).sum();
    let total_possible = breakdown.len() as i64 * i64::from(config.max_capacity) * window_minutes;

    let average_daily = if breakdown.is_empty() {
        0
    } else {
        let sum: u64 = breakdown.iter().map(|d| u64::from(d.utilization_percentage)).sum();
        (sum as f64 / breakdown.len() as f64).round() as u32
    };

    MonthlyUtilization {
        month,
        year,
        monthly_utilization_percentage: percentage(total_utilized, total_possible),
        average_daily_utilization_percentage: average_daily,
        total_utilized_minutes: total_utilized,
        total_utilized_hours: total_utilized / 60,
        total_utilized_minutes_remainder: total_utilized % 60,
        business_days_count: breakdown.len(),
        total_possible_minutes: total_possible,
        peak_day: extreme_day(&breakdown, |candidate, best| candidate > best),
        low_day: extreme_day(&breakdown, |candidate, best| candidate < best),
        daily_breakdown: breakdown,
    }
}

// Strict comparison keeps the earliest day on ties.
fn extreme_day(days: &[DayBreakdown], replaces: impl Fn(u32, u32) -> bool) -> Option<DayBreakdown> {
    let mut iter = days.iter();
    let first = iter.next()?;

    let best = iter.fold(first, |best, day| {
        if replaces(day.utilization_percentage, best.utilization_percentage) {
            day
        } else {
            best
        }
    });
    Some(best.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lab::window::business_days;
    use chrono::Datelike;

    fn config(max_capacity: u32) -> LabConfiguration {
        LabConfiguration {
            inicial_hour: "08:30".parse().unwrap(),
            final_hour: "17:30".parse().unwrap(),
            max_capacity,
            ..LabConfiguration::default()
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, m, 0).unwrap()
    }

    fn interval(id: u64, from: NaiveDateTime, to: Option<NaiveDateTime>) -> AttendanceInterval {
        AttendanceInterval {
            id,
            user_id: id,
            reason_id: 1,
            check_in: from,
            check_out: to,
        }
    }

    fn far_future() -> NaiveDateTime {
        at(31, 23, 59)
    }

    #[test]
    fn percentage_guards_zero_denominator() {
        assert_eq!(percentage(30, 0), 0);
        assert_eq!(percentage(30, -5), 0);
        assert_eq!(percentage(1, 8), 13); // 12.5 rounds up
        assert_eq!(percentage(540, 5400), 10);
    }

    #[test]
    fn one_user_all_day_is_ten_percent_of_ten_seats() {
        let intervals = vec![interval(1, at(4, 8, 30), Some(at(4, 17, 30)))];
        let report = daily(day(4), &config(10), &intervals, far_future());

        assert_eq!(report.total_utilized_minutes, 540);
        assert_eq!(report.max_possible_minutes, 5400);
        assert_eq!(report.utilization_percentage, 10);
        assert_eq!(report.utilization_hours, 9);
        assert_eq!(report.utilization_minutes_remainder, 0);
        assert_eq!(report.current_occupancy, 0);
    }

    #[test]
    fn overlap_beyond_capacity_counts_once_per_seat() {
        let intervals = vec![
            interval(1, at(4, 9, 0), Some(at(4, 9, 30))),
            interval(2, at(4, 9, 0), Some(at(4, 9, 30))),
        ];
        let report = daily(day(4), &config(1), &intervals, far_future());

        assert_eq!(report.total_utilized_minutes, 30);
        assert!(report.utilization_percentage <= 100);
    }

    #[test]
    fn daily_percentage_stays_within_bounds_when_saturated() {
        let intervals: Vec<_> = (1..=5)
            .map(|id| interval(id, at(4, 8, 30), Some(at(4, 17, 30))))
            .collect();
        let report = daily(day(4), &config(3), &intervals, far_future());

        assert_eq!(report.utilization_percentage, 100);
        assert_eq!(report.total_utilized_minutes, 3 * 540);
    }

    #[test]
    fn zero_capacity_reports_zero_percent() {
        let intervals = vec![interval(1, at(4, 9, 0), Some(at(4, 10, 0)))];
        let report = daily(day(4), &config(0), &intervals, far_future());

        assert_eq!(report.utilization_percentage, 0);
        assert_eq!(report.total_utilized_minutes, 0);
    }

    #[test]
    fn today_counts_open_sessions_up_to_now() {
        let intervals = vec![
            interval(1, at(4, 9, 0), None),
            interval(2, at(4, 9, 0), Some(at(4, 9, 30))),
        ];
        let report = daily(day(4), &config(10), &intervals, at(4, 10, 0));

        assert_eq!(report.total_utilized_minutes, 60 + 30);
        assert_eq!(report.current_occupancy, 1);
        assert_eq!(report.max_possible_minutes, 5400);
    }

    #[test]
    fn hourly_rows_cover_every_clock_hour_of_the_window() {
        let intervals = vec![
            interval(1, at(4, 9, 0), Some(at(4, 10, 0))),
            interval(2, at(4, 9, 30), Some(at(4, 9, 45))),
        ];
        let rows = hourly(day(4), &config(10), &intervals, far_future());

        let labels: Vec<_> = rows.iter().map(|r| r.hour.as_str()).collect();
        assert_eq!(labels.first(), Some(&"08:00"));
        assert_eq!(labels.last(), Some(&"17:00"));
        assert_eq!(rows.len(), 10);

        let nine = &rows[1];
        assert_eq!(nine.total_minutes, 75);
        assert_eq!(nine.active_users, 2);
        assert_eq!(nine.utilization, percentage(75, 600));
        assert_eq!(rows[0].total_minutes, 0);
    }

    #[test]
    fn hourly_skips_hours_that_have_not_started() {
        let rows = hourly(day(4), &config(10), &[], at(4, 11, 20));
        let labels: Vec<_> = rows.iter().map(|r| r.hour.clone()).collect();

        assert_eq!(labels, vec!["08:00", "09:00", "10:00", "11:00"]);
    }

    #[test]
    fn monthly_folds_business_days_and_picks_extremes() {
        let cfg = config(1);
        let days: Vec<_> = business_days(2024, 3)
            .unwrap()
            .into_iter()
            .map(|d| {
                let intervals = match d.day() {
                    // 4th and 6th tie for peak, 1st is the first of many empty days
                    4 | 6 => vec![interval(1, d.and_hms_opt(8, 30, 0).unwrap(), d.and_hms_opt(17, 30, 0))],
                    5 => vec![interval(2, d.and_hms_opt(9, 0, 0).unwrap(), d.and_hms_opt(10, 0, 0))],
                    _ => vec![],
                };
                (d, intervals)
            })
            .collect();

        let report = monthly(2024, 3, &cfg, &days, far_future());

        assert_eq!(report.business_days_count, 21);
        assert_eq!(report.total_possible_minutes, 21 * 540);
        assert_eq!(report.total_utilized_minutes, 540 + 540 + 60);
        assert_eq!(report.monthly_utilization_percentage, percentage(1140, 21 * 540));
        // (100 + 11 + 100) / 21 = 10.05
        assert_eq!(report.average_daily_utilization_percentage, 10);

        let peak = report.peak_day.unwrap();
        assert_eq!(peak.date, day(4));
        assert_eq!(peak.utilization_percentage, 100);

        let low = report.low_day.unwrap();
        assert_eq!(low.date, day(1));
        assert_eq!(low.utilization_percentage, 0);

        for d in &report.daily_breakdown {
            assert!(peak.utilization_percentage >= d.utilization_percentage);
            assert!(low.utilization_percentage <= d.utilization_percentage);
        }
    }

    #[test]
    fn monthly_future_days_count_but_contribute_nothing() {
        let cfg = config(1);
        let days: Vec<_> = business_days(2024, 3)
            .unwrap()
            .into_iter()
            .map(|d| {
                let intervals = if d == day(4) {
                    vec![interval(1, at(4, 8, 30), None)]
                } else {
                    vec![]
                };
                (d, intervals)
            })
            .collect();

        // "today" is the 4th at noon
        let report = monthly(2024, 3, &cfg, &days, at(4, 12, 0));

        assert_eq!(report.business_days_count, 21);
        assert_eq!(report.total_utilized_minutes, 210);
        assert_eq!(report.total_possible_minutes, 21 * 540);
    }

    #[test]
    fn empty_month_has_no_extremes() {
        let report = monthly(2024, 3, &config(10), &[], far_future());

        assert_eq!(report.business_days_count, 0);
        assert_eq!(report.monthly_utilization_percentage, 0);
        assert_eq!(report.average_daily_utilization_percentage, 0);
        assert!(report.peak_day.is_none());
        assert!(report.low_day.is_none());
    }
}
