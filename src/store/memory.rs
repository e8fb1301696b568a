use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::AttendanceStore;
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

type RecordKey = (u64, u64, NaiveDate);

#[derive(Default)]
struct MemoryState {
    employees: BTreeMap<u64, Employee>,
    branches: BTreeMap<u64, Branch>,
    records: BTreeMap<RecordKey, AttendanceRecord>,
    holidays: BTreeMap<u64, Holiday>,
    next_holiday_id: u64,
    configs: HashMap<(u64, Option<u64>), AttendanceConfig>,
}

/// In-process store with the same uniqueness rules as the MySQL schema.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_branch(&self, id: u64, tenant_id: u64, name: &str) {
        if let Ok(mut state) = self.state.write() {
            state.branches.insert(
                id,
                Branch {
                    id,
                    tenant_id,
                    name: name.to_string(),
                },
            );
        }
    }

    /// Also registers the employee's branch under the employee's tenant if it is new.
    pub fn add_employee(&self, employee: Employee) {
        if let Ok(mut state) = self.state.write() {
            if let Some(branch_id) = employee.branch_id {
                state.branches.entry(branch_id).or_insert_with(|| Branch {
                    id: branch_id,
                    tenant_id: employee.tenant_id,
                    name: employee
                        .branch_name
                        .clone()
                        .unwrap_or_else(|| format!("Branch {branch_id}")),
                });
            }
            state.employees.insert(employee.id, employee);
        }
    }

    /// Seeds or replaces a record, bypassing check-in rules.
    pub fn put_record(&self, record: AttendanceRecord) {
        if let Ok(mut state) = self.state.write() {
            state.records.insert(
                (record.tenant_id, record.employee_id, record.date),
                record,
            );
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, AppError> {
        self.state
            .read()
            .map_err(|_| AppError::Storage("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, AppError> {
        self.state
            .write()
            .map_err(|_| AppError::Storage("memory store lock poisoned".into()))
    }
}

impl MemoryState {
    fn settings(&self, tenant_id: u64) -> TenantSettings {
        let mut settings = TenantSettings::default();
        for ((tenant, branch), config) in &self.configs {
            if *tenant != tenant_id {
                continue;
            }
            match branch {
                Some(b) => {
                    settings.branches.insert(*b, *config);
                }
                None => settings.default = *config,
            }
        }
        settings
    }

    fn holidays_between(&self, tenant_id: u64, from: NaiveDate, to: NaiveDate) -> Vec<Holiday> {
        self.holidays
            .values()
            .filter(|h| h.tenant_id == tenant_id && h.date >= from && h.date <= to)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_employee(&self, employee_id: u64) -> Result<Option<Employee>, AppError> {
        Ok(self.read()?.employees.get(&employee_id).cloned())
    }

    async fn find_branch(&self, branch_id: u64) -> Result<Option<Branch>, AppError> {
        Ok(self.read()?.branches.get(&branch_id).cloned())
    }

    async fn list_employees(
        &self,
        tenant_id: u64,
        filter: &EmployeeFilter,
    ) -> Result<Vec<Employee>, AppError> {
        Ok(self
            .read()?
            .employees
            .values()
            .filter(|e| e.tenant_id == tenant_id && filter.matches(e))
            .cloned()
            .collect())
    }

    async fn snapshot(
        &self,
        tenant_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        employee_ids: &[u64],
    ) -> Result<AttendanceSnapshot, AppError> {
        let state = self.read()?;
        if from > to {
            return Ok(AttendanceSnapshot::new(state.settings(tenant_id), Vec::new(), Vec::new()));
        }
        let records = employee_ids
            .iter()
            .flat_map(|id| {
                state
                    .records
                    .range((tenant_id, *id, from)..=(tenant_id, *id, to))
                    .map(|(_, r)| r.clone())
            })
            .collect();
        Ok(AttendanceSnapshot::new(
            state.settings(tenant_id),
            state.holidays_between(tenant_id, from, to),
            records,
        ))
    }

    async fn find_record(
        &self,
        tenant_id: u64,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        Ok(self
            .read()?
            .records
            .get(&(tenant_id, employee_id, date))
            .cloned())
    }

    async fn insert_record(&self, record: &AttendanceRecord) -> Result<bool, AppError> {
        let mut state = self.write()?;
        let key = (record.tenant_id, record.employee_id, record.date);
        if state.records.contains_key(&key) {
            return Ok(false);
        }
        state.records.insert(key, record.clone());
        Ok(true)
    }

    async fn upsert_record(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        let mut state = self.write()?;
        let key = (record.tenant_id, record.employee_id, record.date);
        let productivity_rating = state
            .records
            .get(&key)
            .and_then(|existing| existing.productivity_rating);
        let mut stored = record.clone();
        stored.productivity_rating = stored.productivity_rating.or(productivity_rating);
        state.records.insert(key, stored);
        Ok(())
    }

    async fn complete_check_out(&self, record: &AttendanceRecord) -> Result<bool, AppError> {
        let mut state = self.write()?;
        let key = (record.tenant_id, record.employee_id, record.date);
        match state.records.get_mut(&key) {
            Some(existing) if existing.check_out_time.is_none() => {
                existing.check_out_time = record.check_out_time;
                existing.work_hours = record.work_hours;
                existing.notes = record.notes.clone();
                existing.productivity_rating = record.productivity_rating;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn tenant_settings(&self, tenant_id: u64) -> Result<TenantSettings, AppError> {
        Ok(self.read()?.settings(tenant_id))
    }

    async fn save_attendance_config(
        &self,
        tenant_id: u64,
        branch_id: Option<u64>,
        config: &AttendanceConfig,
    ) -> Result<(), AppError> {
        self.write()?.configs.insert((tenant_id, branch_id), *config);
        Ok(())
    }

    async fn insert_holiday(&self, holiday: &NewHoliday) -> Result<Holiday, AppError> {
        let mut state = self.write()?;
        let taken = state.holidays.values().any(|h| {
            h.tenant_id == holiday.tenant_id
                && h.branch_id == holiday.branch_id
                && h.date == holiday.date
        });
        if taken {
            return Err(AppError::Conflict(
                "A holiday already exists for this date".into(),
            ));
        }

        state.next_holiday_id += 1;
        let created = Holiday {
            id: state.next_holiday_id,
            tenant_id: holiday.tenant_id,
            branch_id: holiday.branch_id,
            date: holiday.date,
            name: holiday.name.clone(),
            description: holiday.description.clone(),
        };
        state.holidays.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_holiday(
        &self,
        tenant_id: u64,
        holiday_id: u64,
    ) -> Result<Option<Holiday>, AppError> {
        let mut state = self.write()?;
        let owned = state
            .holidays
            .get(&holiday_id)
            .is_some_and(|h| h.tenant_id == tenant_id);
        Ok(if owned {
            state.holidays.remove(&holiday_id)
        } else {
            None
        })
    }

    async fn holidays_between(
        &self,
        tenant_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Holiday>, AppError> {
        Ok(self.read()?.holidays_between(tenant_id, from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
    }

    #[actix_web::test]
    async fn one_record_per_employee_day() {
        let store = MemoryStore::new();
        let record = AttendanceRecord::new(1, 5, day(4), AttendanceStatus::Present);

        assert!(store.insert_record(&record).await.unwrap());
        assert!(!store.insert_record(&record).await.unwrap());

        // Same employee id under another tenant is a different key.
        let other = AttendanceRecord::new(2, 5, day(4), AttendanceStatus::Present);
        assert!(store.insert_record(&other).await.unwrap());
    }

    #[actix_web::test]
    async fn upsert_is_last_write_wins_and_keeps_rating() {
        let store = MemoryStore::new();
        let mut first = AttendanceRecord::new(1, 5, day(4), AttendanceStatus::Absent);
        first.productivity_rating = Some(70);
        store.upsert_record(&first).await.unwrap();

        let mut second = AttendanceRecord::new(1, 5, day(4), AttendanceStatus::Present);
        second.notes = Some("manually marked by 2".into());
        store.upsert_record(&second).await.unwrap();

        let stored = store.find_record(1, 5, day(4)).await.unwrap().unwrap();
        assert_eq!(stored.status, AttendanceStatus::Present);
        assert_eq!(stored.productivity_rating, Some(70));
        assert_eq!(stored.notes.as_deref(), Some("manually marked by 2"));
    }

    #[actix_web::test]
    async fn competing_upserts_leave_one_record_for_the_day() {
        let store = MemoryStore::new();
        let mut first = AttendanceRecord::new(1, 5, day(6), AttendanceStatus::Present);
        first.work_hours = Some(8.0);
        first.notes = Some("manually marked by 2".into());
        let mut second = AttendanceRecord::new(1, 5, day(6), AttendanceStatus::Present);
        second.work_hours = Some(4.5);
        second.notes = Some("manually marked by 3".into());

        store.upsert_record(&first).await.unwrap();
        store.upsert_record(&second).await.unwrap();

        let snapshot = store.snapshot(1, day(1), day(30), &[5]).await.unwrap();
        let records = snapshot.records_of(5);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].work_hours, Some(4.5));
        assert_eq!(records[0].notes.as_deref(), Some("manually marked by 3"));
    }

    #[actix_web::test]
    async fn snapshot_only_carries_requested_employees_in_range() {
        let store = MemoryStore::new();
        for (emp, d) in [(5, 3), (5, 4), (5, 30), (6, 4)] {
            store.put_record(AttendanceRecord::new(1, emp, day(d), AttendanceStatus::Present));
        }
        store.put_record(AttendanceRecord::new(2, 5, day(4), AttendanceStatus::Present));

        let snapshot = store.snapshot(1, day(4), day(29), &[5]).await.unwrap();
        assert!(snapshot.record(5, day(4)).is_some());
        assert!(snapshot.record(5, day(3)).is_none());
        assert!(snapshot.record(5, day(30)).is_none());
        assert!(snapshot.record(6, day(4)).is_none());
        assert_eq!(snapshot.records_of(5).len(), 1);
    }

    #[actix_web::test]
    async fn holidays_are_tenant_scoped() {
        let store = MemoryStore::new();
        let holiday = store
            .insert_holiday(&NewHoliday {
                tenant_id: 1,
                branch_id: None,
                date: day(1),
                name: "Tenant One".into(),
                description: None,
            })
            .await
            .unwrap();

        assert!(store.delete_holiday(2, holiday.id).await.unwrap().is_none());
        assert!(store.holidays_between(2, day(1), day(30)).await.unwrap().is_empty());
        assert_eq!(store.holidays_between(1, day(1), day(30)).await.unwrap().len(), 1);
        assert!(store.delete_holiday(1, holiday.id).await.unwrap().is_some());
    }
}
