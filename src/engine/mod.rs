//! Attendance computation: classification, daily and monthly views, corrections.
//!
//! Every entry point takes the tenant explicitly; nothing here reads ambient state.

pub mod cache;
pub mod calendar;
pub mod classifier;
pub mod clock;
pub mod correction;
pub mod daily;
pub mod monthly;
pub mod recording;
pub mod snapshot;

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    error::AppError,
    model::{
        branch::Branch,
        employee::Employee,
        holiday::{Holiday, NewHoliday},
        settings::AttendanceConfig,
    },
    store::AttendanceStore,
};
use cache::MonthlyCache;
use clock::YearMonth;

const MAX_HOLIDAY_NAME_LEN: usize = 120;
const MAX_LATE_THRESHOLD_MINUTES: u32 = 12 * 60;

pub struct AttendanceEngine {
    store: Arc<dyn AttendanceStore>,
    cache: MonthlyCache,
}

impl AttendanceEngine {
    pub fn new(store: Arc<dyn AttendanceStore>, cache: MonthlyCache) -> Self {
        Self { store, cache }
    }

    /// Resolves the employee behind a session. Unknown or foreign employees are an auth failure.
    pub async fn acting_employee(
        &self,
        tenant_id: u64,
        employee_id: u64,
    ) -> Result<Employee, AppError> {
        match self.store.find_employee(employee_id).await? {
            Some(employee) if employee.tenant_id == tenant_id => Ok(employee),
            _ => Err(AppError::auth("Employee not found for token")),
        }
    }

    /// Looks up an employee the caller wants to act on.
    pub async fn tenant_employee(
        &self,
        tenant_id: u64,
        employee_id: u64,
    ) -> Result<Employee, AppError> {
        match self.store.find_employee(employee_id).await? {
            Some(employee) if employee.tenant_id == tenant_id => Ok(employee),
            Some(employee) => {
                warn!(
                    tenant_id,
                    employee_id,
                    owner_tenant_id = employee.tenant_id,
                    "Cross-tenant employee access rejected"
                );
                Err(AppError::forbidden("Employee belongs to another tenant"))
            }
            None => Err(AppError::not_found("Employee not found")),
        }
    }

    /// Looks up a branch a holiday or settings override is scoped to.
    pub async fn tenant_branch(
        &self,
        tenant_id: u64,
        branch_id: u64,
    ) -> Result<Branch, AppError> {
        match self.store.find_branch(branch_id).await? {
            Some(branch) if branch.tenant_id == tenant_id => Ok(branch),
            Some(branch) => {
                warn!(
                    tenant_id,
                    branch_id,
                    owner_tenant_id = branch.tenant_id,
                    "Cross-tenant branch access rejected"
                );
                Err(AppError::forbidden("Branch belongs to another tenant"))
            }
            None => Err(AppError::not_found("Branch not found")),
        }
    }

    #[instrument(name = "holiday_create", skip(self, holiday), fields(tenant_id = holiday.tenant_id, date = %holiday.date))]
    pub async fn create_holiday(&self, holiday: NewHoliday) -> Result<Holiday, AppError> {
        let name = holiday.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Holiday name is required"));
        }
        if name.chars().count() > MAX_HOLIDAY_NAME_LEN {
            return Err(AppError::validation(format!(
                "Holiday name must be at most {MAX_HOLIDAY_NAME_LEN} characters"
            )));
        }
        let holiday = NewHoliday {
            name: name.to_string(),
            description: holiday
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            ..holiday
        };
        if let Some(branch_id) = holiday.branch_id {
            self.tenant_branch(holiday.tenant_id, branch_id).await?;
        }

        let created = self.store.insert_holiday(&holiday).await?;
        self.cache
            .invalidate_holiday(created.tenant_id, created.branch_id, YearMonth::of(created.date))
            .await;

        info!(holiday_id = created.id, "Holiday declared");
        Ok(created)
    }

    /// Deleting a holiday that does not exist (or belongs to another tenant) is a no-op.
    #[instrument(name = "holiday_delete", skip(self))]
    pub async fn delete_holiday(&self, tenant_id: u64, holiday_id: u64) -> Result<(), AppError> {
        match self.store.delete_holiday(tenant_id, holiday_id).await? {
            Some(removed) => {
                self.cache
                    .invalidate_holiday(tenant_id, removed.branch_id, YearMonth::of(removed.date))
                    .await;
                info!(date = %removed.date, "Holiday removed");
            }
            None => info!("Holiday already absent"),
        }
        Ok(())
    }

    /// Holidays in `month`. With a branch, only tenant-wide and that branch's holidays.
    pub async fn holiday_calendar(
        &self,
        tenant_id: u64,
        branch_id: Option<u64>,
        month: YearMonth,
    ) -> Result<Vec<Holiday>, AppError> {
        let mut holidays = self
            .store
            .holidays_between(tenant_id, month.first_day(), month.last_day())
            .await?;
        if let Some(branch_id) = branch_id {
            holidays.retain(|h| h.branch_id.is_none_or(|b| b == branch_id));
        }
        holidays.sort_by_key(|h| (h.date, h.branch_id, h.id));
        Ok(holidays)
    }

    pub async fn attendance_config(
        &self,
        tenant_id: u64,
        branch_id: Option<u64>,
    ) -> Result<AttendanceConfig, AppError> {
        let settings = self.store.tenant_settings(tenant_id).await?;
        Ok(*settings.for_branch(branch_id))
    }

    #[instrument(name = "attendance_settings_update", skip(self, config))]
    pub async fn update_attendance_config(
        &self,
        tenant_id: u64,
        branch_id: Option<u64>,
        config: AttendanceConfig,
    ) -> Result<AttendanceConfig, AppError> {
        if config.late_threshold_minutes > MAX_LATE_THRESHOLD_MINUTES {
            return Err(AppError::validation(format!(
                "lateThresholdMinutes must be at most {MAX_LATE_THRESHOLD_MINUTES}"
            )));
        }
        if let Some(branch_id) = branch_id {
            self.tenant_branch(tenant_id, branch_id).await?;
        }
        self.store
            .save_attendance_config(tenant_id, branch_id, &config)
            .await?;
        let dropped = self.cache.invalidate_settings(tenant_id, branch_id).await;

        info!(
            include_weekends = config.include_weekends,
            standard_check_in = %config.standard_check_in_time,
            late_threshold_minutes = config.late_threshold_minutes,
            dropped,
            "Attendance settings updated"
        );
        Ok(config)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{AttendanceEngine, cache::MonthlyCache};
    use crate::model::employee::Employee;
    use crate::store::{AttendanceStore, memory::MemoryStore};

    pub fn engine_with(store: MemoryStore) -> AttendanceEngine {
        engine_with_store(store)
    }

    pub fn engine_with_store(store: impl AttendanceStore + 'static) -> AttendanceEngine {
        AttendanceEngine::new(
            Arc::new(store),
            MonthlyCache::new(1_000, Duration::from_secs(300)),
        )
    }

    pub fn november_employee(tenant_id: u64, id: u64) -> Employee {
        Employee {
            id,
            tenant_id,
            employee_code: format!("EMP-{id:03}"),
            first_name: "Farhana".into(),
            last_name: "Akter".into(),
            department: Some("Operations".into()),
            branch_id: None,
            branch_name: None,
            status: "active".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::testing::{engine_with, november_employee};
    use super::*;
    use crate::model::employee::EmployeeFilter;
    use crate::store::memory::MemoryStore;

    fn new_holiday(branch_id: Option<u64>, day: u32, name: &str) -> NewHoliday {
        NewHoliday {
            tenant_id: 1,
            branch_id,
            date: NaiveDate::from_ymd_opt(2024, 11, day).unwrap(),
            name: name.into(),
            description: None,
        }
    }

    #[actix_web::test]
    async fn duplicate_holiday_scope_is_rejected() {
        let store = MemoryStore::new();
        store.add_branch(3, 1, "Chattogram");
        let engine = engine_with(store);
        engine.create_holiday(new_holiday(None, 7, "A")).await.unwrap();

        let dup = engine.create_holiday(new_holiday(None, 7, "B")).await.unwrap_err();
        assert!(matches!(dup, AppError::Conflict(_)));

        // Same date, different scope.
        engine.create_holiday(new_holiday(Some(3), 7, "C")).await.unwrap();

        let blank = engine.create_holiday(new_holiday(None, 8, "   ")).await.unwrap_err();
        assert!(matches!(blank, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn holiday_delete_is_idempotent() {
        let engine = engine_with(MemoryStore::new());
        let created = engine.create_holiday(new_holiday(None, 7, "A")).await.unwrap();

        engine.delete_holiday(1, created.id).await.unwrap();
        engine.delete_holiday(1, created.id).await.unwrap();
        engine.delete_holiday(1, 9_999).await.unwrap();
    }

    #[actix_web::test]
    async fn holiday_calendar_filters_by_branch() {
        let store = MemoryStore::new();
        store.add_branch(3, 1, "Chattogram");
        store.add_branch(4, 1, "Sylhet");
        let engine = engine_with(store);
        engine.create_holiday(new_holiday(Some(3), 12, "Branch 3")).await.unwrap();
        engine.create_holiday(new_holiday(None, 5, "All")).await.unwrap();
        engine.create_holiday(new_holiday(Some(4), 6, "Branch 4")).await.unwrap();
        let nov = YearMonth::new(2024, 11).unwrap();

        let all = engine.holiday_calendar(1, None, nov).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].name, "All");

        let branch_3: Vec<String> = engine
            .holiday_calendar(1, Some(3), nov)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(branch_3, vec!["All", "Branch 3"]);

        let dec = YearMonth::new(2024, 12).unwrap();
        assert!(engine.holiday_calendar(1, None, dec).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn holiday_mutation_refreshes_cached_month() {
        let store = MemoryStore::new();
        store.add_employee(november_employee(1, 42));
        let engine = engine_with(store);
        let nov = YearMonth::new(2024, 11).unwrap();
        let filter = EmployeeFilter::default();

        let before = engine.monthly(1, nov, &filter).await.unwrap();
        assert_eq!(before.employees[0].tally.holiday, 0);

        let created = engine.create_holiday(new_holiday(None, 4, "Declared")).await.unwrap();
        let during = engine.monthly(1, nov, &filter).await.unwrap();
        assert_eq!(during.employees[0].tally.holiday, 1);
        assert_eq!(during.employees[0].tally.absent, 20);

        engine.delete_holiday(1, created.id).await.unwrap();
        let after = engine.monthly(1, nov, &filter).await.unwrap();
        assert_eq!(after.employees[0].tally.holiday, 0);
    }

    #[actix_web::test]
    async fn settings_update_reclassifies_weekends() {
        let store = MemoryStore::new();
        store.add_employee(november_employee(1, 42));
        let engine = engine_with(store);
        let nov = YearMonth::new(2024, 11).unwrap();
        let filter = EmployeeFilter::default();

        let five_day = engine.monthly(1, nov, &filter).await.unwrap();
        assert!(!five_day.include_weekends);
        assert_eq!(five_day.employees[0].tally.weekend, 9);

        let config = AttendanceConfig {
            include_weekends: true,
            ..AttendanceConfig::default()
        };
        engine.update_attendance_config(1, None, config).await.unwrap();
        assert_eq!(engine.attendance_config(1, None).await.unwrap(), config);

        let seven_day = engine.monthly(1, nov, &filter).await.unwrap();
        assert!(seven_day.include_weekends);
        assert_eq!(seven_day.employees[0].tally.weekend, 0);
        assert_eq!(seven_day.employees[0].tally.absent, 30);

        let too_lenient = AttendanceConfig {
            late_threshold_minutes: 24 * 60,
            ..config
        };
        let err = engine
            .update_attendance_config(1, None, too_lenient)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn branch_scope_must_belong_to_the_tenant() {
        let store = MemoryStore::new();
        store.add_branch(3, 1, "Chattogram");
        store.add_branch(8, 2, "Other tenant");
        let engine = engine_with(store);

        let foreign = engine
            .create_holiday(new_holiday(Some(8), 7, "Foreign"))
            .await
            .unwrap_err();
        assert!(matches!(foreign, AppError::Forbidden(_)));
        let unknown = engine
            .create_holiday(new_holiday(Some(99), 7, "Unknown"))
            .await
            .unwrap_err();
        assert!(matches!(unknown, AppError::NotFound(_)));
        let nov = YearMonth::new(2024, 11).unwrap();
        assert!(engine.holiday_calendar(1, None, nov).await.unwrap().is_empty());

        let config = AttendanceConfig::default();
        assert!(matches!(
            engine.update_attendance_config(1, Some(8), config).await.unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            engine.update_attendance_config(1, Some(99), config).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        engine.update_attendance_config(1, Some(3), config).await.unwrap();
        assert_eq!(engine.attendance_config(1, Some(3)).await.unwrap(), config);
    }

    #[actix_web::test]
    async fn acting_employee_must_exist_in_tenant() {
        let store = MemoryStore::new();
        store.add_employee(november_employee(1, 42));
        let engine = engine_with(store);

        assert!(engine.acting_employee(1, 42).await.is_ok());
        assert!(matches!(
            engine.acting_employee(2, 42).await.unwrap_err(),
            AppError::Auth(_)
        ));
        assert!(matches!(
            engine.acting_employee(1, 43).await.unwrap_err(),
            AppError::Auth(_)
        ));
    }
}
