use std::collections::HashMap;

use chrono::NaiveDate;

use super::{calendar::HolidayCalendar, classifier::classify};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus},
    employee::Employee,
    holiday::Holiday,
    settings::TenantSettings,
};

/// Everything one classification pass reads, captured together so a response
/// never mixes rule versions.
#[derive(Debug, Clone, Default)]
pub struct AttendanceSnapshot {
    settings: TenantSettings,
    calendar: HolidayCalendar,
    records: HashMap<(u64, NaiveDate), AttendanceRecord>,
}

impl AttendanceSnapshot {
    pub fn new(
        settings: TenantSettings,
        holidays: Vec<Holiday>,
        records: Vec<AttendanceRecord>,
    ) -> Self {
        let records = records
            .into_iter()
            .map(|r| ((r.employee_id, r.date), r))
            .collect();
        Self {
            settings,
            calendar: HolidayCalendar::new(holidays),
            records,
        }
    }

    pub fn settings(&self) -> &TenantSettings {
        &self.settings
    }

    pub fn calendar(&self) -> &HolidayCalendar {
        &self.calendar
    }

    pub fn record(&self, employee_id: u64, date: NaiveDate) -> Option<&AttendanceRecord> {
        self.records.get(&(employee_id, date))
    }

    /// Stored records of one employee, most recent first.
    pub fn records_of(&self, employee_id: u64) -> Vec<&AttendanceRecord> {
        let mut records: Vec<_> = self
            .records
            .values()
            .filter(|r| r.employee_id == employee_id)
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date));
        records
    }

    pub fn classify(&self, employee: &Employee, date: NaiveDate) -> AttendanceStatus {
        classify(
            date,
            self.record(employee.id, date),
            self.calendar.lookup(date, employee.branch_id),
            self.settings.for_branch(employee.branch_id),
        )
    }
}
