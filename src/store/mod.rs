//! Persistence seam for the attendance engine.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    engine::snapshot::AttendanceSnapshot,
    error::AppError,
    model::{
        attendance::AttendanceRecord,
        branch::Branch,
        employee::{Employee, EmployeeFilter},
        holiday::{Holiday, NewHoliday},
        settings::{AttendanceConfig, TenantSettings},
    },
};

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Any tenant; callers check ownership.
    async fn find_employee(&self, employee_id: u64) -> Result<Option<Employee>, AppError>;

    /// Any tenant; callers check ownership.
    async fn find_branch(&self, branch_id: u64) -> Result<Option<Branch>, AppError>;

    /// Tenant employees matching `filter`, ordered by id ascending.
    async fn list_employees(
        &self,
        tenant_id: u64,
        filter: &EmployeeFilter,
    ) -> Result<Vec<Employee>, AppError>;

    /// Settings, holidays in `[from, to]` and the records of `employee_ids` in
    /// `[from, to]`, read as one consistent unit.
    async fn snapshot(
        &self,
        tenant_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        employee_ids: &[u64],
    ) -> Result<AttendanceSnapshot, AppError>;

    async fn find_record(
        &self,
        tenant_id: u64,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    /// Inserts a new record. Returns `false` when one already exists for the day.
    async fn insert_record(&self, record: &AttendanceRecord) -> Result<bool, AppError>;

    /// Inserts or overwrites the record for the day. Last write wins.
    async fn upsert_record(&self, record: &AttendanceRecord) -> Result<(), AppError>;

    /// Stores check-out time, hours, notes and rating on a record that has no
    /// check-out yet. Returns `false` when there was no such record.
    async fn complete_check_out(&self, record: &AttendanceRecord) -> Result<bool, AppError>;

    async fn tenant_settings(&self, tenant_id: u64) -> Result<TenantSettings, AppError>;

    async fn save_attendance_config(
        &self,
        tenant_id: u64,
        branch_id: Option<u64>,
        config: &AttendanceConfig,
    ) -> Result<(), AppError>;

    /// Fails with [`AppError::Conflict`] when the `(tenant, branch-or-none, date)` scope is taken.
    async fn insert_holiday(&self, holiday: &NewHoliday) -> Result<Holiday, AppError>;

    /// Returns the removed holiday, or `None` if there was nothing to remove.
    async fn delete_holiday(
        &self,
        tenant_id: u64,
        holiday_id: u64,
    ) -> Result<Option<Holiday>, AppError>;

    async fn holidays_between(
        &self,
        tenant_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Holiday>, AppError>;
}
