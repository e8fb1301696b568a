use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::model::holiday::Holiday;

#[derive(Debug, Clone, Default)]
struct HolidaysOnDate {
    tenant_wide: Option<Holiday>,
    by_branch: BTreeMap<u64, Holiday>,
}

/// Holiday lookup set for one tenant over a date range, loaded once per engine call.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    by_date: HashMap<NaiveDate, HolidaysOnDate>,
}

impl HolidayCalendar {
    pub fn new(holidays: impl IntoIterator<Item = Holiday>) -> Self {
        let mut by_date: HashMap<NaiveDate, HolidaysOnDate> = HashMap::new();
        for holiday in holidays {
            let slot = by_date.entry(holiday.date).or_default();
            match holiday.branch_id {
                Some(branch_id) => {
                    slot.by_branch.insert(branch_id, holiday);
                }
                None => slot.tenant_wide = Some(holiday),
            }
        }
        Self { by_date }
    }

    /// The holiday that applies to an employee of `branch_id` on `date`.
    /// A branch-scoped holiday takes precedence over a tenant-wide one.
    pub fn lookup(&self, date: NaiveDate, branch_id: Option<u64>) -> Option<&Holiday> {
        let slot = self.by_date.get(&date)?;
        branch_id
            .and_then(|b| slot.by_branch.get(&b))
            .or(slot.tenant_wide.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holiday(id: u64, branch_id: Option<u64>, date: NaiveDate, name: &str) -> Holiday {
        Holiday {
            id,
            tenant_id: 1,
            branch_id,
            date,
            name: name.into(),
            description: None,
        }
    }

    #[test]
    fn branch_holiday_takes_precedence() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 26).unwrap();
        let calendar = HolidayCalendar::new([
            holiday(1, None, date, "Independence Day"),
            holiday(2, Some(7), date, "Branch Anniversary"),
        ]);

        assert_eq!(calendar.lookup(date, Some(7)).unwrap().id, 2);
        assert_eq!(calendar.lookup(date, Some(8)).unwrap().id, 1);
        assert_eq!(calendar.lookup(date, None).unwrap().id, 1);
    }

    #[test]
    fn branch_holiday_does_not_imply_tenant_wide() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let calendar = HolidayCalendar::new([holiday(3, Some(7), date, "Local Fair")]);

        assert!(calendar.lookup(date, Some(7)).is_some());
        assert!(calendar.lookup(date, Some(9)).is_none());
        assert!(calendar.lookup(date, None).is_none());
        assert!(calendar.lookup(date.succ_opt().unwrap(), Some(7)).is_none());
    }
}
