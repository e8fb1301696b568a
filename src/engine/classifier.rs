//! Maps one employee-day to an [`AttendanceStatus`].

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus},
    holiday::Holiday,
    settings::AttendanceConfig,
};

/// Classifies a single day. First matching rule wins:
///
/// 1. a holiday applies to the date → `holiday`
/// 2. no record on a Saturday/Sunday and weekends are not work days → `weekend`
/// 3. no record → `absent`
/// 4. record without check-in → `absent`
/// 5. check-in after `standard + threshold` → `late`, otherwise `present`
///
/// `holiday` must already be resolved for the employee's branch (see
/// [`HolidayCalendar::lookup`](super::calendar::HolidayCalendar::lookup)).
pub fn classify(
    date: NaiveDate,
    record: Option<&AttendanceRecord>,
    holiday: Option<&Holiday>,
    config: &AttendanceConfig,
) -> AttendanceStatus {
    if holiday.is_some() {
        return AttendanceStatus::Holiday;
    }

    let Some(record) = record else {
        if is_weekend(date) && !config.include_weekends {
            return AttendanceStatus::Weekend;
        }
        return AttendanceStatus::Absent;
    };

    match record.check_in_time {
        None => AttendanceStatus::Absent,
        Some(check_in) if check_in.minutes() > config.on_time_until() => AttendanceStatus::Late,
        Some(_) => AttendanceStatus::Present,
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Per-status day counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusTally {
    pub present: u32,
    pub late: u32,
    pub absent: u32,
    pub weekend: u32,
    pub holiday: u32,
}

impl StatusTally {
    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Weekend => self.weekend += 1,
            AttendanceStatus::Holiday => self.holiday += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.present + self.late + self.absent + self.weekend + self.holiday
    }

    pub fn attended(&self) -> u32 {
        self.present + self.late
    }

    /// Days that count toward the attendance percentage.
    pub fn working(&self) -> u32 {
        self.present + self.late + self.absent
    }
}

impl FromIterator<AttendanceStatus> for StatusTally {
    fn from_iter<I: IntoIterator<Item = AttendanceStatus>>(iter: I) -> Self {
        let mut tally = StatusTally::default();
        for status in iter {
            tally.add(status);
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::WallClock;
    use strum::IntoEnumIterator;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn checked_in(date: NaiveDate, hour: u32, minute: u32) -> AttendanceRecord {
        let mut record = AttendanceRecord::new(1, 10, date, AttendanceStatus::Present);
        record.check_in_time = WallClock::new(hour, minute);
        record
    }

    fn holiday(date: NaiveDate) -> Holiday {
        Holiday {
            id: 1,
            tenant_id: 1,
            branch_id: None,
            date,
            name: "Victory Day".into(),
            description: None,
        }
    }

    #[test]
    fn check_in_at_threshold_is_present_one_minute_later_is_late() {
        let config = AttendanceConfig::default();
        let monday = day(2024, 11, 4);

        let on_edge = checked_in(monday, 9, 15);
        assert_eq!(classify(monday, Some(&on_edge), None, &config), AttendanceStatus::Present);

        let past_edge = checked_in(monday, 9, 16);
        assert_eq!(classify(monday, Some(&past_edge), None, &config), AttendanceStatus::Late);

        let early = checked_in(monday, 7, 45);
        assert_eq!(classify(monday, Some(&early), None, &config), AttendanceStatus::Present);
    }

    #[test]
    fn custom_threshold_moves_the_boundary() {
        let config = AttendanceConfig {
            include_weekends: false,
            standard_check_in_time: WallClock::new(8, 30).unwrap(),
            late_threshold_minutes: 0,
        };
        let monday = day(2024, 11, 4);
        assert_eq!(
            classify(monday, Some(&checked_in(monday, 8, 30)), None, &config),
            AttendanceStatus::Present
        );
        assert_eq!(
            classify(monday, Some(&checked_in(monday, 8, 31)), None, &config),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn holiday_beats_weekend_and_records() {
        let config = AttendanceConfig::default();
        let saturday = day(2024, 12, 14);
        let h = holiday(saturday);

        assert_eq!(classify(saturday, None, Some(&h), &config), AttendanceStatus::Holiday);
        let worked = checked_in(saturday, 10, 0);
        assert_eq!(
            classify(saturday, Some(&worked), Some(&h), &config),
            AttendanceStatus::Holiday
        );
    }

    #[test]
    fn weekend_without_record_depends_on_work_week() {
        let sunday = day(2024, 11, 3);
        let five_day = AttendanceConfig::default();
        let seven_day = AttendanceConfig {
            include_weekends: true,
            ..AttendanceConfig::default()
        };

        assert_eq!(classify(sunday, None, None, &five_day), AttendanceStatus::Weekend);
        assert_eq!(classify(sunday, None, None, &seven_day), AttendanceStatus::Absent);
    }

    #[test]
    fn weekend_with_check_in_is_classified_by_time() {
        let saturday = day(2024, 11, 2);
        let config = AttendanceConfig::default();
        assert_eq!(
            classify(saturday, Some(&checked_in(saturday, 9, 0)), None, &config),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn missing_record_or_check_in_is_absent() {
        let tuesday = day(2024, 11, 5);
        let config = AttendanceConfig::default();
        assert_eq!(classify(tuesday, None, None, &config), AttendanceStatus::Absent);

        let no_check_in = AttendanceRecord::new(1, 10, tuesday, AttendanceStatus::Absent);
        assert_eq!(
            classify(tuesday, Some(&no_check_in), None, &config),
            AttendanceStatus::Absent
        );
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let config = AttendanceConfig::default();
        let date = day(2024, 11, 20);
        let record = checked_in(date, 9, 30);
        let first = classify(date, Some(&record), None, &config);
        for _ in 0..10 {
            assert_eq!(classify(date, Some(&record), None, &config), first);
        }
    }

    #[test]
    fn tally_counts_every_status() {
        let tally: StatusTally = AttendanceStatus::iter().chain([AttendanceStatus::Late]).collect();
        assert_eq!(tally.total(), 6);
        assert_eq!(tally.late, 2);
        assert_eq!(tally.attended(), 3);
        assert_eq!(tally.working(), 4);
    }
}
