use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::{
    AttendanceEngine,
    cache::MonthlyKey,
    classifier::classify,
    clock::{WallClock, YearMonth},
};
use crate::{
    error::AppError,
    model::{
        attendance::{AttendanceRecord, AttendanceStatus},
        employee::Employee,
    },
};

pub const DEFAULT_HISTORY_DAYS: u32 = 30;
pub const MAX_HISTORY_DAYS: u32 = 366;

/// Optional details an employee can attach when checking out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckOutDetails {
    pub notes: Option<String>,
    pub productivity_rating: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[schema(example = "2024-11-20", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "09:30", value_type = Option<String>)]
    pub check_in_time: Option<WallClock>,
    #[schema(example = "17:30", value_type = Option<String>)]
    pub check_out_time: Option<WallClock>,
    pub status: AttendanceStatus,
    pub work_hours: Option<f64>,
    pub productivity_rating: Option<u8>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmployeeHistory {
    pub employee: Employee,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub entries: Vec<HistoryEntry>,
}

impl AttendanceEngine {
    /// Records the first check-in of the day. The stored status is the
    /// classification at write time.
    #[instrument(name = "attendance_check_in", skip(self, employee), fields(employee_id = employee.id))]
    pub async fn check_in(
        &self,
        employee: &Employee,
        date: NaiveDate,
        time: WallClock,
    ) -> Result<AttendanceRecord, AppError> {
        let snapshot = self
            .store
            .snapshot(employee.tenant_id, date, date, &[employee.id])
            .await?;
        if snapshot.record(employee.id, date).is_some() {
            return Err(AppError::validation("Already checked in today"));
        }

        let mut record =
            AttendanceRecord::new(employee.tenant_id, employee.id, date, AttendanceStatus::Present);
        record.check_in_time = Some(time);
        record.status = classify(
            date,
            Some(&record),
            snapshot.calendar().lookup(date, employee.branch_id),
            snapshot.settings().for_branch(employee.branch_id),
        );

        // Unique (tenant, employee, date) key settles concurrent check-ins.
        if !self.store.insert_record(&record).await? {
            return Err(AppError::validation("Already checked in today"));
        }
        self.invalidate_day(employee, date).await;

        info!(status = %record.status, check_in = %time, "Checked in");
        Ok(record)
    }

    /// Completes today's record with a check-out time and the worked hours.
    #[instrument(name = "attendance_check_out", skip(self, employee, details), fields(employee_id = employee.id))]
    pub async fn check_out(
        &self,
        employee: &Employee,
        date: NaiveDate,
        time: WallClock,
        details: CheckOutDetails,
    ) -> Result<AttendanceRecord, AppError> {
        if details.productivity_rating.is_some_and(|r| r > 100) {
            return Err(AppError::validation(
                "productivityRating must be between 0 and 100",
            ));
        }

        let no_active = || AppError::validation("No active check-in found for today");
        let mut record = self
            .store
            .find_record(employee.tenant_id, employee.id, date)
            .await?
            .filter(AttendanceRecord::is_checked_in)
            .ok_or_else(no_active)?;
        let check_in = record.check_in_time.ok_or_else(no_active)?;
        if time < check_in {
            return Err(AppError::validation(
                "Check-out time cannot be before check-in time",
            ));
        }

        record.check_out_time = Some(time);
        record.work_hours = Some(check_in.hours_until(time));
        if details.notes.is_some() {
            record.notes = details.notes;
        }
        if details.productivity_rating.is_some() {
            record.productivity_rating = details.productivity_rating;
        }

        if !self.store.complete_check_out(&record).await? {
            return Err(no_active());
        }
        self.invalidate_day(employee, date).await;

        info!(work_hours = ?record.work_hours, "Checked out");
        Ok(record)
    }

    /// Stored records of the last `days` days up to `today`, re-classified with
    /// the current rules.
    #[instrument(name = "attendance_employee_history", skip(self))]
    pub async fn employee_history(
        &self,
        tenant_id: u64,
        employee_id: u64,
        days: u32,
        today: NaiveDate,
    ) -> Result<EmployeeHistory, AppError> {
        let employee = self.tenant_employee(tenant_id, employee_id).await?;
        let days = days.clamp(1, MAX_HISTORY_DAYS);
        let from = today - Duration::days(days as i64 - 1);

        let snapshot = self
            .store
            .snapshot(tenant_id, from, today, &[employee.id])
            .await?;

        let entries = snapshot
            .records_of(employee.id)
            .into_iter()
            .map(|record| {
                let status = snapshot.classify(&employee, record.date);
                if status != record.status && !status.is_non_working() {
                    warn!(
                        date = %record.date,
                        stored = %record.status,
                        derived = %status,
                        "Stored status differs from current classification"
                    );
                }
                HistoryEntry {
                    date: record.date,
                    check_in_time: record.check_in_time,
                    check_out_time: record.check_out_time,
                    status,
                    work_hours: record.work_hours,
                    productivity_rating: record.productivity_rating,
                    notes: record.notes.clone(),
                }
            })
            .collect();

        Ok(EmployeeHistory {
            employee,
            from,
            to: today,
            entries,
        })
    }

    async fn invalidate_day(&self, employee: &Employee, date: NaiveDate) {
        self.cache
            .invalidate(&MonthlyKey::new(employee.tenant_id, employee.id, YearMonth::of(date)))
            .await;
    }
}
