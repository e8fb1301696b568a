use chrono::NaiveDate;
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use super::{AttendanceEngine, classifier::StatusTally, clock::WallClock, snapshot::AttendanceSnapshot};
use crate::{
    error::AppError,
    model::{
        attendance::AttendanceStatus,
        employee::{Employee, EmployeeFilter},
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyRow {
    #[schema(example = 42)]
    pub employee_id: u64,
    #[schema(example = "Rahim Uddin")]
    pub employee_name: String,
    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,
    #[schema(example = "Dhaka HQ", nullable = true)]
    pub branch: Option<String>,
    #[schema(example = 2, nullable = true)]
    pub branch_id: Option<u64>,
    pub status: AttendanceStatus,
    #[schema(example = "09:10", value_type = Option<String>)]
    pub check_in_time: Option<WallClock>,
    #[schema(example = "17:10", value_type = Option<String>)]
    pub check_out_time: Option<WallClock>,
    #[schema(example = 8.0)]
    pub work_hours: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DailyView {
    pub date: NaiveDate,
    pub rows: Vec<DailyRow>,
    pub summary: StatusTally,
}

/// One row per employee, ordered by employee id. The summary is summed from the rows.
pub fn build_daily(
    date: NaiveDate,
    employees: &[Employee],
    snapshot: &AttendanceSnapshot,
) -> DailyView {
    let mut employees: Vec<&Employee> = employees.iter().collect();
    employees.sort_by_key(|e| e.id);

    let rows: Vec<DailyRow> = employees
        .into_iter()
        .map(|employee| {
            let record = snapshot.record(employee.id, date);
            DailyRow {
                employee_id: employee.id,
                employee_name: employee.full_name(),
                department: employee.department.clone(),
                branch: employee.branch_name.clone(),
                branch_id: employee.branch_id,
                status: snapshot.classify(employee, date),
                check_in_time: record.and_then(|r| r.check_in_time),
                check_out_time: record.and_then(|r| r.check_out_time),
                work_hours: record.and_then(|r| r.work_hours),
            }
        })
        .collect();

    let summary = rows.iter().map(|r| r.status).collect();
    DailyView {
        date,
        rows,
        summary,
    }
}

impl AttendanceEngine {
    #[instrument(name = "attendance_daily", skip(self, filter), fields(date = %date))]
    pub async fn daily(
        &self,
        tenant_id: u64,
        date: NaiveDate,
        filter: &EmployeeFilter,
    ) -> Result<DailyView, AppError> {
        let employees = self.store.list_employees(tenant_id, filter).await?;
        let ids: Vec<u64> = employees.iter().map(|e| e.id).collect();
        let snapshot = self.store.snapshot(tenant_id, date, date, &ids).await?;
        Ok(build_daily(date, &employees, &snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        attendance::AttendanceRecord, holiday::Holiday, settings::TenantSettings,
    };

    fn employee(id: u64, branch_id: Option<u64>) -> Employee {
        Employee {
            id,
            tenant_id: 1,
            employee_code: format!("EMP-{id:03}"),
            first_name: "Nusrat".into(),
            last_name: format!("{id}"),
            department: Some("Finance".into()),
            branch_id,
            branch_name: branch_id.map(|b| format!("Branch {b}")),
            status: "active".into(),
        }
    }

    #[test]
    fn rows_are_ordered_and_summary_matches_rows() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 20).unwrap();
        let employees = vec![employee(30, Some(2)), employee(10, None), employee(20, Some(1))];

        let mut on_time = AttendanceRecord::new(1, 10, date, AttendanceStatus::Present);
        on_time.check_in_time = WallClock::new(9, 0);
        on_time.check_out_time = WallClock::new(17, 0);
        on_time.work_hours = Some(8.0);
        let mut late = AttendanceRecord::new(1, 30, date, AttendanceStatus::Late);
        late.check_in_time = WallClock::new(10, 5);

        let branch_holiday = Holiday {
            id: 5,
            tenant_id: 1,
            branch_id: Some(1),
            date,
            name: "Branch Day".into(),
            description: None,
        };
        let snapshot = AttendanceSnapshot::new(
            TenantSettings::default(),
            vec![branch_holiday],
            vec![on_time, late],
        );

        let view = build_daily(date, &employees, &snapshot);

        let ids: Vec<u64> = view.rows.iter().map(|r| r.employee_id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(view.rows[0].status, AttendanceStatus::Present);
        assert_eq!(view.rows[0].work_hours, Some(8.0));
        assert_eq!(view.rows[1].status, AttendanceStatus::Holiday);
        assert_eq!(view.rows[2].status, AttendanceStatus::Late);
        assert_eq!(view.rows[2].branch.as_deref(), Some("Branch 2"));

        assert_eq!(view.summary.present, 1);
        assert_eq!(view.summary.late, 1);
        assert_eq!(view.summary.holiday, 1);
        assert_eq!(view.summary.total() as usize, view.rows.len());
    }
}
