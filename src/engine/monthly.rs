use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::{
    AttendanceEngine,
    cache::MonthlyKey,
    classifier::StatusTally,
    clock::{YearMonth, round2},
    snapshot::AttendanceSnapshot,
};
use crate::{
    error::AppError,
    model::{
        attendance::AttendanceStatus,
        employee::{Employee, EmployeeFilter},
    },
};

/// One cell of the per-employee month grid.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    #[schema(example = 20)]
    pub day: u32,
    #[schema(example = "2024-11-20", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(example = "Wednesday")]
    pub day_of_week: String,
}

/// Month rollup for one employee. The grid and the counts come from the same pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeMonth {
    pub employee_id: u64,
    pub employee_name: String,
    pub branch_id: Option<u64>,
    pub tally: StatusTally,
    pub total_worked_hours: f64,
    pub attendance_percentage: u32,
    pub avg_hours: f64,
    pub calendar: Vec<CalendarEntry>,
}

/// Result of a monthly aggregation call.
#[derive(Debug, Clone)]
pub struct MonthlyView {
    pub month: YearMonth,
    pub include_weekends: bool,
    pub employees: Vec<Arc<EmployeeMonth>>,
}

/// Walks every day of `month` once, classifying it and accumulating counts,
/// worked hours and the calendar grid.
pub fn summarize_month(
    employee: &Employee,
    month: YearMonth,
    snapshot: &AttendanceSnapshot,
) -> EmployeeMonth {
    let mut tally = StatusTally::default();
    let mut total_worked_hours = 0.0;
    let mut calendar = Vec::with_capacity(month.days_in_month() as usize);

    for date in month.days() {
        let status = snapshot.classify(employee, date);
        tally.add(status);

        if status.is_attended() {
            if let Some(record) = snapshot.record(employee.id, date) {
                total_worked_hours += record.worked_hours();
            }
        }

        calendar.push(CalendarEntry {
            day: date.day(),
            date,
            status,
            day_of_week: date.format("%A").to_string(),
        });
    }

    debug_assert_eq!(tally.total(), month.days_in_month());

    EmployeeMonth {
        employee_id: employee.id,
        employee_name: employee.full_name(),
        branch_id: employee.branch_id,
        attendance_percentage: attendance_percentage(&tally),
        avg_hours: round2(total_worked_hours / tally.attended().max(1) as f64),
        total_worked_hours: round2(total_worked_hours),
        tally,
        calendar,
    }
}

/// `round(attended / (attended + absent) * 100)`; weekends and holidays are left out
/// of both sides. A month with no working days reports 0.
pub fn attendance_percentage(tally: &StatusTally) -> u32 {
    let working = tally.working();
    if working == 0 {
        return 0;
    }
    (tally.attended() as f64 / working as f64 * 100.0).round() as u32
}

impl AttendanceEngine {
    /// Monthly rollup for every employee matching `filter`, ordered by employee id.
    ///
    /// Cached summaries are reused; the rest are computed from a single snapshot
    /// read at the start of the call.
    #[instrument(name = "attendance_monthly", skip(self, filter), fields(month = %month))]
    pub async fn monthly(
        &self,
        tenant_id: u64,
        month: YearMonth,
        filter: &EmployeeFilter,
    ) -> Result<MonthlyView, AppError> {
        let employees = self.store.list_employees(tenant_id, filter).await?;

        let mut cached: HashMap<u64, Arc<EmployeeMonth>> = HashMap::new();
        let mut missing = Vec::new();
        for employee in &employees {
            let key = MonthlyKey::new(tenant_id, employee.id, month);
            match self.cache.get(&key).await {
                Some(summary) => {
                    cached.insert(employee.id, summary);
                }
                None => missing.push(employee.id),
            }
        }
        debug!(
            employees = employees.len(),
            cache_hits = cached.len(),
            "Building monthly attendance"
        );

        let generation = self.cache.generation(tenant_id);
        let snapshot = self
            .store
            .snapshot(tenant_id, month.first_day(), month.last_day(), &missing)
            .await?;

        let mut summaries = Vec::with_capacity(employees.len());
        for employee in &employees {
            let summary = match cached.remove(&employee.id) {
                Some(summary) => summary,
                None => {
                    let summary = Arc::new(summarize_month(employee, month, &snapshot));
                    let key = MonthlyKey::new(tenant_id, employee.id, month);
                    self.cache.insert(key, summary.clone(), generation).await;
                    summary
                }
            };
            summaries.push(summary);
        }

        Ok(MonthlyView {
            month,
            include_weekends: snapshot
                .settings()
                .for_branch(filter.branch_id)
                .include_weekends,
            employees: summaries,
        })
    }
}
