use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Current local wall-clock time; every report is computed against it.
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parses a client timestamp into local wall-clock time.
///
/// RFC 3339 values carrying an offset are converted to the server's zone;
/// naive values are taken as already local.
pub fn parse_instant(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_naive_and_offset_timestamps() {
        let naive = parse_instant("2024-03-04T09:15:00").unwrap();
        assert_eq!(naive.to_string(), "2024-03-04 09:15:00");

        assert!(parse_instant("2024-03-04 09:15:00.250").is_some());
        assert!(parse_instant("2024-03-04T09:15").is_some());
        assert!(parse_instant("2024-03-04T12:15:00Z").is_some());
        assert!(parse_instant("yesterday").is_none());
    }

    #[test]
    fn parses_calendar_dates() {
        assert_eq!(parse_date("2024-03-04"), NaiveDate::from_ymd_opt(2024, 3, 4));
        assert!(parse_date("2024-02-30").is_none());
        assert!(parse_date("04/03/2024").is_none());
    }
}
