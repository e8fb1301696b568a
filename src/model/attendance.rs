use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::engine::clock::WallClock;

/// Outcome of classifying one employee-day.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Weekend,
    Holiday,
}

impl AttendanceStatus {
    /// Present and late days both count as attended.
    pub fn is_attended(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }

    /// Weekend and holiday days sit outside the attendance denominator.
    pub fn is_non_working(&self) -> bool {
        matches!(self, AttendanceStatus::Weekend | AttendanceStatus::Holiday)
    }
}

/// Durable per-employee, per-date attendance entry.
///
/// At most one exists per `(tenant_id, employee_id, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub tenant_id: u64,
    pub employee_id: u64,
    #[schema(example = "2024-11-04", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(example = "09:10", value_type = Option<String>)]
    pub check_in_time: Option<WallClock>,
    #[schema(example = "17:30", value_type = Option<String>)]
    pub check_out_time: Option<WallClock>,
    #[schema(example = 8.33)]
    pub work_hours: Option<f64>,
    #[schema(example = 85)]
    pub productivity_rating: Option<u8>,
    pub notes: Option<String>,
}

impl AttendanceRecord {
    pub fn new(tenant_id: u64, employee_id: u64, date: NaiveDate, status: AttendanceStatus) -> Self {
        Self {
            tenant_id,
            employee_id,
            date,
            status,
            check_in_time: None,
            check_out_time: None,
            work_hours: None,
            productivity_rating: None,
            notes: None,
        }
    }

    /// Stored hours, or the span between check-in and check-out when only the times are known.
    pub fn worked_hours(&self) -> f64 {
        if let Some(hours) = self.work_hours {
            return hours.max(0.0);
        }
        match (self.check_in_time, self.check_out_time) {
            (Some(check_in), Some(check_out)) => check_in.hours_until(check_out),
            _ => 0.0,
        }
    }

    /// Returns `true` when the record has a check-in but no check-out yet.
    pub fn is_checked_in(&self) -> bool {
        self.check_in_time.is_some() && self.check_out_time.is_none()
    }
}
