//! Daily opening window

use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::config::WorkingHours;

/// Whether `now` falls inside the window.
///
/// Disabled enforcement is always open. `start == end` means open all day;
/// `start > end` wraps past midnight.
pub fn is_open(hours: &WorkingHours, now: NaiveTime) -> bool {
    if !hours.enabled {
        return true;
    }
    let (start, end) = (hours.start, hours.end);
    if start == end {
        true
    } else if start < end {
        now >= start && now < end
    } else {
        now >= start || now < end
    }
}

/// The next time the window opens strictly after `now`
pub fn next_opening(hours: &WorkingHours, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(hours.start);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// `None` while open, else the time the kiosk reopens
pub fn closed_until(hours: &WorkingHours, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if is_open(hours, now.time()) {
        None
    } else {
        Some(next_opening(hours, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hours(start: (u32, u32), end: (u32, u32)) -> WorkingHours {
        WorkingHours {
            enabled: true,
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        }
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_day_window() {
        let h = hours((9, 0), (21, 0));
        assert!(!is_open(&h, at(1, 8, 59).time()));
        assert!(is_open(&h, at(1, 9, 0).time()));
        assert!(is_open(&h, at(1, 20, 59).time()));
        assert!(!is_open(&h, at(1, 21, 0).time()));
    }

    #[test]
    fn test_overnight_window() {
        let h = hours((22, 0), (6, 0));
        assert!(is_open(&h, at(1, 23, 30).time()));
        assert!(is_open(&h, at(1, 5, 59).time()));
        assert!(!is_open(&h, at(1, 12, 0).time()));
    }

    #[test]
    fn test_disabled_and_equal_bounds_are_open() {
        let mut h = hours((9, 0), (21, 0));
        h.enabled = false;
        assert!(is_open(&h, at(1, 3, 0).time()));
        assert!(is_open(&hours((9, 0), (9, 0)), at(1, 3, 0).time()));
    }

    #[test]
    fn test_closed_late_evening_reopens_next_morning() {
        let h = hours((9, 0), (21, 0));
        assert_eq!(closed_until(&h, at(1, 23, 0)), Some(at(2, 9, 0)));
        assert_eq!(closed_until(&h, at(1, 7, 0)), Some(at(1, 9, 0)));
        assert_eq!(closed_until(&h, at(1, 12, 0)), None);
    }
}
