use chrono::{Duration, NaiveDateTime};

use crate::lab::window::WorkingWindow;
use crate::model::attendance::AttendanceInterval;

/// Occupant count for one sampled minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtilizationSample {
    pub at: NaiveDateTime,
    /// Users present, unclamped.
    pub occupants: u32,
    /// Users present, clamped to the lab capacity.
    pub counted: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OccupancySummary {
    pub sampled_minutes: i64,
    pub utilized_minutes: i64,
    pub peak_occupancy: u32,
}

/// Walks whole minutes of a day and counts who was in the lab.
///
/// Minutes strictly after `now` are never sampled, and an interval that is
/// still open occupies the lab only until `min(now, window.end)`. For a past
/// day that means every minute is sampled and open sessions run to closing
/// time; a future day yields no samples at all.
pub struct OccupancySampler<'a> {
    intervals: &'a [AttendanceInterval],
    now: NaiveDateTime,
    open_until: NaiveDateTime,
    max_capacity: u32,
}

impl<'a> OccupancySampler<'a> {
    pub fn new(
        intervals: &'a [AttendanceInterval],
        window: &WorkingWindow,
        now: NaiveDateTime,
        max_capacity: u32,
    ) -> Self {
        Self {
            intervals,
            now,
            open_until: now.min(window.end),
            max_capacity,
        }
    }

    fn effective_check_out(&self, interval: &AttendanceInterval) -> NaiveDateTime {
        interval.check_out.unwrap_or(self.open_until)
    }

    /// Users whose interval covers `instant`: `check_in <= instant < check_out`.
    pub fn occupancy_at(&self, instant: NaiveDateTime) -> u32 {
        self.intervals
            .iter()
            .filter(|i| i.check_in <= instant && instant < self.effective_check_out(i))
            .count() as u32
    }

    /// Per-minute samples for `[from, to)`, stopping at `now`.
    pub fn samples(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> impl Iterator<Item = UtilizationSample> + '_ {
        let now = self.now;

        std::iter::successors(Some(from), |m| Some(*m + Duration::minutes(1)))
            .take_while(move |m| *m < to && *m <= now)
            .map(move |at| {
                let occupants = self.occupancy_at(at);
                UtilizationSample {
                    at,
                    occupants,
                    counted: occupants.min(self.max_capacity),
                }
            })
    }

    pub fn summarize(&self, from: NaiveDateTime, to: NaiveDateTime) -> OccupancySummary {
        self.samples(from, to)
            .fold(OccupancySummary::default(), |mut acc, sample| {
                acc.sampled_minutes += 1;
                acc.utilized_minutes += i64::from(sample.counted);
                acc.peak_occupancy = acc.peak_occupancy.max(sample.occupants);
                acc
            })
    }
}
