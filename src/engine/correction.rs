use chrono::NaiveDate;
use tracing::{info, instrument};

use super::{AttendanceEngine, cache::MonthlyKey, clock::YearMonth};
use crate::{
    error::AppError,
    model::attendance::{AttendanceRecord, AttendanceStatus},
};

/// Hours credited when the administrator does not supply any.
pub const DEFAULT_MANUAL_WORK_HOURS: f64 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ManualMark {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub work_hours: Option<f64>,
}

impl AttendanceEngine {
    /// Turns an `absent` day into `present`.
    ///
    /// Checks, in order: the date is not after `today`, the employee belongs to
    /// the tenant, and the day currently classifies as `absent`. The stored
    /// record is indistinguishable downstream from a real check-in.
    #[instrument(
        name = "attendance_manual_mark",
        skip(self, mark),
        fields(employee_id = mark.employee_id, date = %mark.date)
    )]
    pub async fn manual_mark(
        &self,
        tenant_id: u64,
        admin_id: u64,
        mark: ManualMark,
        today: NaiveDate,
    ) -> Result<AttendanceRecord, AppError> {
        if mark.status != AttendanceStatus::Present {
            return Err(AppError::validation(
                "Only 'present' can be set by a manual mark",
            ));
        }
        let work_hours = mark.work_hours.unwrap_or(DEFAULT_MANUAL_WORK_HOURS);
        if !(work_hours > 0.0 && work_hours <= 24.0) {
            return Err(AppError::validation(
                "workHours must be greater than 0 and at most 24",
            ));
        }

        if mark.date > today {
            return Err(AppError::FutureDate(
                "Cannot mark attendance for a future date".to_string(),
            ));
        }

        // Membership before classification: another tenant's day status is never revealed.
        let employee = self.tenant_employee(tenant_id, mark.employee_id).await?;

        let snapshot = self
            .store
            .snapshot(tenant_id, mark.date, mark.date, &[employee.id])
            .await?;
        let current = snapshot.classify(&employee, mark.date);
        if current != AttendanceStatus::Absent {
            return Err(AppError::InvalidTransition(format!(
                "Only absent days can be marked present; {} is {}",
                mark.date, current
            )));
        }

        let config = snapshot.settings().for_branch(employee.branch_id);
        let check_in = config.standard_check_in_time;
        let mut record = snapshot
            .record(employee.id, mark.date)
            .cloned()
            .unwrap_or_else(|| {
                AttendanceRecord::new(tenant_id, employee.id, mark.date, AttendanceStatus::Present)
            });
        record.status = AttendanceStatus::Present;
        record.check_in_time = Some(check_in);
        record.check_out_time = Some(check_in.plus_hours(work_hours));
        record.work_hours = Some(work_hours);
        record.notes = Some(format!("manually marked by {admin_id}"));

        self.store.upsert_record(&record).await?;
        self.cache
            .invalidate(&MonthlyKey::new(tenant_id, employee.id, YearMonth::of(mark.date)))
            .await;

        info!(admin_id, work_hours, "Absent day manually marked present");
        Ok(record)
    }
}
