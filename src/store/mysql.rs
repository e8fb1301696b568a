use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use futures_util::TryStreamExt;
use sqlx::{FromRow, MySqlExecutor, MySqlPool, mysql::MySqlDatabaseError};
use tracing::{debug, warn};

use super::AttendanceStore;
use crate::{
    engine::snapshot::AttendanceSnapshot,
    error::AppError,
    model::{
        attendance::{AttendanceRecord, AttendanceStatus},
        branch::Branch,
        employee::{Employee, EmployeeFilter},
        holiday::{Holiday, NewHoliday},
        settings::{AttendanceConfig, TenantSettings},
    },
};

const EMPLOYEE_SELECT: &str = r#"
    SELECT e.id, e.tenant_id, e.employee_code, e.first_name, e.last_name,
           d.name AS department, e.branch_id, b.name AS branch_name, e.status
    FROM employees e
    LEFT JOIN departments d ON d.id = e.department_id
    LEFT JOIN branches b ON b.id = e.branch_id
"#;

const RECORD_COLUMNS: &str = "tenant_id, employee_id, date, status, check_in, check_out, \
                              work_hours, productivity_rating, notes";

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[derive(FromRow)]
struct AttendanceRow {
    tenant_id: u64,
    employee_id: u64,
    date: NaiveDate,
    status: String,
    check_in: Option<NaiveTime>,
    check_out: Option<NaiveTime>,
    work_hours: Option<f64>,
    productivity_rating: Option<u8>,
    notes: Option<String>,
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(row: AttendanceRow) -> Self {
        let status = AttendanceStatus::from_str(&row.status).unwrap_or_else(|_| {
            warn!(
                employee_id = row.employee_id,
                date = %row.date,
                stored = %row.status,
                "Unknown stored attendance status, treating as absent"
            );
            AttendanceStatus::Absent
        });
        AttendanceRecord {
            tenant_id: row.tenant_id,
            employee_id: row.employee_id,
            date: row.date,
            status,
            check_in_time: row.check_in.map(Into::into),
            check_out_time: row.check_out.map(Into::into),
            work_hours: row.work_hours,
            productivity_rating: row.productivity_rating,
            notes: row.notes,
        }
    }
}

#[derive(FromRow)]
struct SettingsRow {
    branch_id: Option<u64>,
    include_weekends: bool,
    standard_check_in: NaiveTime,
    late_threshold_minutes: u32,
}

impl From<&SettingsRow> for AttendanceConfig {
    fn from(row: &SettingsRow) -> Self {
        AttendanceConfig {
            include_weekends: row.include_weekends,
            standard_check_in_time: row.standard_check_in.into(),
            late_threshold_minutes: row.late_threshold_minutes,
        }
    }
}

// SQLSTATE 23000 also covers foreign key and NOT NULL violations.
const ER_DUP_ENTRY: u16 = 1062;

fn is_duplicate_entry(error_number: u16) -> bool {
    error_number == ER_DUP_ENTRY
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err
            .try_downcast_ref::<MySqlDatabaseError>()
            .is_some_and(|mysql| is_duplicate_entry(mysql.number())),
        _ => false,
    }
}

async fn load_settings<'e, E: MySqlExecutor<'e>>(
    executor: E,
    tenant_id: u64,
) -> Result<TenantSettings, sqlx::Error> {
    let rows = sqlx::query_as::<_, SettingsRow>(
        r#"
        SELECT branch_id, include_weekends, standard_check_in, late_threshold_minutes
        FROM tenant_attendance_settings
        WHERE tenant_id = ?
        "#,
    )
    .bind(tenant_id)
    .fetch_all(executor)
    .await?;

    let mut settings = TenantSettings::default();
    for row in &rows {
        match row.branch_id {
            Some(branch_id) => {
                settings.branches.insert(branch_id, row.into());
            }
            None => settings.default = row.into(),
        }
    }
    Ok(settings)
}

async fn load_holidays<'e, E: MySqlExecutor<'e>>(
    executor: E,
    tenant_id: u64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Holiday>, sqlx::Error> {
    sqlx::query_as::<_, Holiday>(
        r#"
        SELECT id, tenant_id, branch_id, date, name, description
        FROM holidays
        WHERE tenant_id = ? AND date BETWEEN ? AND ?
        ORDER BY date, id
        "#,
    )
    .bind(tenant_id)
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await
}

async fn load_records<'e, E: MySqlExecutor<'e>>(
    executor: E,
    tenant_id: u64,
    from: NaiveDate,
    to: NaiveDate,
    employee_ids: &[u64],
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let placeholders = vec!["?"; employee_ids.len()].join(", ");
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM attendance \
         WHERE tenant_id = ? AND date BETWEEN ? AND ? AND employee_id IN ({placeholders})"
    );

    let mut query = sqlx::query_as::<_, AttendanceRow>(&sql)
        .bind(tenant_id)
        .bind(from)
        .bind(to);
    for id in employee_ids {
        query = query.bind(*id);
    }

    let mut stream = query.fetch(executor);
    let mut records = Vec::new();
    while let Some(row) = stream.try_next().await? {
        records.push(AttendanceRecord::from(row));
    }
    Ok(records)
}

/// MySQL-backed store. Uniqueness rules live in the schema (see `migrations/`).
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_employee(&self, employee_id: u64) -> Result<Option<Employee>, AppError> {
        let sql = format!("{EMPLOYEE_SELECT} WHERE e.id = ?");
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(employee)
    }

    async fn find_branch(&self, branch_id: u64) -> Result<Option<Branch>, AppError> {
        let branch =
            sqlx::query_as::<_, Branch>("SELECT id, tenant_id, name FROM branches WHERE id = ?")
                .bind(branch_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(branch)
    }

    async fn list_employees(
        &self,
        tenant_id: u64,
        filter: &EmployeeFilter,
    ) -> Result<Vec<Employee>, AppError> {
        // ---------- build WHERE clause dynamically ----------
        let mut conditions = vec!["e.tenant_id = ?"];
        let mut bindings = vec![FilterValue::U64(tenant_id)];

        if let Some(branch_id) = filter.branch_id {
            conditions.push("e.branch_id = ?");
            bindings.push(FilterValue::U64(branch_id));
        }
        if let Some(department) = filter.department.as_deref() {
            conditions.push("d.name = ?");
            bindings.push(FilterValue::Str(department));
        }
        if let Some(employee_id) = filter.employee_id {
            conditions.push("e.id = ?");
            bindings.push(FilterValue::U64(employee_id));
        }

        let sql = format!(
            "{EMPLOYEE_SELECT} WHERE {} ORDER BY e.id ASC",
            conditions.join(" AND ")
        );
        debug!(sql = %sql, "Listing employees");

        let mut query = sqlx::query_as::<_, Employee>(&sql);
        for value in bindings {
            query = match value {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(v) => query.bind(v),
            };
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn snapshot(
        &self,
        tenant_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        employee_ids: &[u64],
    ) -> Result<AttendanceSnapshot, AppError> {
        // One transaction: InnoDB's consistent read gives every query the same view.
        let mut tx = self.pool.begin().await?;

        let settings = load_settings(&mut *tx, tenant_id).await?;
        let holidays = load_holidays(&mut *tx, tenant_id, from, to).await?;
        let records = if employee_ids.is_empty() {
            Vec::new()
        } else {
            load_records(&mut *tx, tenant_id, from, to, employee_ids).await?
        };

        tx.commit().await?;
        Ok(AttendanceSnapshot::new(settings, holidays, records))
    }

    async fn find_record(
        &self,
        tenant_id: u64,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance \
             WHERE tenant_id = ? AND employee_id = ? AND date = ?"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(tenant_id)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AttendanceRecord::from))
    }

    async fn insert_record(&self, record: &AttendanceRecord) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (tenant_id, employee_id, date, status, check_in, check_out,
                 work_hours, productivity_rating, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.tenant_id)
        .bind(record.employee_id)
        .bind(record.date)
        .bind(record.status.as_ref())
        .bind(record.check_in_time.map(|t| t.to_naive()))
        .bind(record.check_out_time.map(|t| t.to_naive()))
        .bind(record.work_hours)
        .bind(record.productivity_rating)
        .bind(record.notes.as_deref())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_record(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO attendance
                (tenant_id, employee_id, date, status, check_in, check_out, work_hours, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                status = VALUES(status),
                check_in = VALUES(check_in),
                check_out = VALUES(check_out),
                work_hours = VALUES(work_hours),
                notes = VALUES(notes),
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(record.tenant_id)
        .bind(record.employee_id)
        .bind(record.date)
        .bind(record.status.as_ref())
        .bind(record.check_in_time.map(|t| t.to_naive()))
        .bind(record.check_out_time.map(|t| t.to_naive()))
        .bind(record.work_hours)
        .bind(record.notes.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn complete_check_out(&self, record: &AttendanceRecord) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, work_hours = ?, notes = ?, productivity_rating = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE tenant_id = ?
            AND employee_id = ?
            AND date = ?
            AND check_out IS NULL
            "#,
        )
        .bind(record.check_out_time.map(|t| t.to_naive()))
        .bind(record.work_hours)
        .bind(record.notes.as_deref())
        .bind(record.productivity_rating)
        .bind(record.tenant_id)
        .bind(record.employee_id)
        .bind(record.date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn tenant_settings(&self, tenant_id: u64) -> Result<TenantSettings, AppError> {
        Ok(load_settings(&self.pool, tenant_id).await?)
    }

    async fn save_attendance_config(
        &self,
        tenant_id: u64,
        branch_id: Option<u64>,
        config: &AttendanceConfig,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO tenant_attendance_settings
                (tenant_id, branch_id, include_weekends, standard_check_in, late_threshold_minutes)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                include_weekends = VALUES(include_weekends),
                standard_check_in = VALUES(standard_check_in),
                late_threshold_minutes = VALUES(late_threshold_minutes),
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(tenant_id)
        .bind(branch_id)
        .bind(config.include_weekends)
        .bind(config.standard_check_in_time.to_naive())
        .bind(config.late_threshold_minutes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_holiday(&self, holiday: &NewHoliday) -> Result<Holiday, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO holidays (tenant_id, branch_id, date, name, description)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(holiday.tenant_id)
        .bind(holiday.branch_id)
        .bind(holiday.date)
        .bind(&holiday.name)
        .bind(holiday.description.as_deref())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(Holiday {
                id: done.last_insert_id(),
                tenant_id: holiday.tenant_id,
                branch_id: holiday.branch_id,
                date: holiday.date,
                name: holiday.name.clone(),
                description: holiday.description.clone(),
            }),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(
                "A holiday already exists for this date".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_holiday(
        &self,
        tenant_id: u64,
        holiday_id: u64,
    ) -> Result<Option<Holiday>, AppError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Holiday>(
            r#"
            SELECT id, tenant_id, branch_id, date, name, description
            FROM holidays
            WHERE id = ? AND tenant_id = ?
            FOR UPDATE
            "#,
        )
        .bind(holiday_id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            sqlx::query("DELETE FROM holidays WHERE id = ? AND tenant_id = ?")
                .bind(holiday_id)
                .bind(tenant_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(existing)
    }

    async fn holidays_between(
        &self,
        tenant_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Holiday>, AppError> {
        Ok(load_holidays(&self.pool, tenant_id, from, to).await?)
    }
}
