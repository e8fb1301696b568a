use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use super::{administrator, non_blank, optional_id, required_date, session_employee, today};
use crate::{
    auth::auth::AuthUser,
    engine::{
        AttendanceEngine,
        classifier::StatusTally,
        clock::{WallClock, YearMonth},
        correction::ManualMark,
        daily::DailyRow,
        monthly::{CalendarEntry, EmployeeMonth},
        recording::{CheckOutDetails, DEFAULT_HISTORY_DAYS, HistoryEntry},
    },
    error::AppError,
    model::{
        attendance::{AttendanceRecord, AttendanceStatus},
        employee::EmployeeFilter,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuery {
    /// Day to report, `YYYY-MM-DD`
    #[param(example = "2024-11-20")]
    pub date: Option<String>,
    /// Branch id
    pub branch: Option<String>,
    pub department: Option<String>,
    pub employee_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyQuery {
    /// Month to aggregate, `YYYY-MM`
    #[param(example = "2024-11")]
    pub month: Option<String>,
    /// Branch id
    pub branch: Option<String>,
    pub department: Option<String>,
    pub employee_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Number of days back from today, 1 to 366 (default 30)
    #[param(example = 30)]
    pub days: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    #[schema(example = "Closed the quarterly report")]
    pub notes: Option<String>,
    #[schema(example = 85, minimum = 0, maximum = 100)]
    pub productivity_rating: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManualMarkRequest {
    #[schema(example = 42)]
    pub employee_id: u64,
    #[schema(example = "2024-11-25", format = "date")]
    pub date: String,
    #[schema(example = "present")]
    pub status: AttendanceStatus,
    #[schema(example = 8.0)]
    pub work_hours: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Checked in successfully")]
    pub message: String,
    pub data: AttendanceRecord,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailyResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "2024-11-20", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub data: Vec<DailyRow>,
    #[schema(example = 12)]
    pub count: usize,
    pub summary: StatusTally,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyEntry {
    #[schema(example = 42)]
    pub employee_id: u64,
    #[schema(example = "Farhana Akter")]
    pub employee_name: String,
    #[schema(example = 19)]
    pub present_days: u32,
    #[schema(example = 1)]
    pub absent_days: u32,
    #[schema(example = 1)]
    pub late_days: u32,
    #[schema(example = 9)]
    pub weekend_days: u32,
    #[schema(example = 0)]
    pub holiday_days: u32,
    #[schema(example = 95)]
    pub attendance_percentage: u32,
    #[schema(example = 8.0)]
    pub avg_hours: f64,
    #[schema(example = 160.0)]
    pub total_worked_hours: f64,
    /// Day-by-day grid, only when a single employee was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar: Option<Vec<CalendarEntry>>,
}

impl MonthlyEntry {
    fn from_summary(summary: &EmployeeMonth, with_calendar: bool) -> Self {
        Self {
            employee_id: summary.employee_id,
            employee_name: summary.employee_name.clone(),
            present_days: summary.tally.present,
            absent_days: summary.tally.absent,
            late_days: summary.tally.late,
            weekend_days: summary.tally.weekend,
            holiday_days: summary.tally.holiday,
            attendance_percentage: summary.attendance_percentage,
            avg_hours: summary.avg_hours,
            total_worked_hours: summary.total_worked_hours,
            calendar: with_calendar.then(|| summary.calendar.clone()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "2024-11", value_type = String)]
    pub month: YearMonth,
    pub data: Vec<MonthlyEntry>,
    #[schema(example = false)]
    pub include_weekends: bool,
    #[schema(example = 12)]
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEmployee {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = "Farhana Akter")]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryData {
    pub employee: HistoryEmployee,
    #[schema(example = "2024-10-22", value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(example = "2024-11-20", value_type = String, format = "date")]
    pub to: NaiveDate,
    pub attendances: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    #[schema(example = true)]
    pub success: bool,
    pub data: HistoryData,
}

fn employee_filter(
    branch: Option<&str>,
    department: Option<&str>,
    employee_id: Option<&str>,
) -> Result<EmployeeFilter, AppError> {
    Ok(EmployeeFilter {
        branch_id: optional_id(branch, "branch")?,
        department: non_blank(department).map(str::to_string),
        employee_id: optional_id(employee_id, "employeeId")?,
    })
}

fn now_wall_clock() -> WallClock {
    Local::now().time().into()
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked in successfully", body = RecordResponse),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "success": false,
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
) -> Result<impl Responder, AppError> {
    let employee = session_employee(&auth, &engine).await?;
    let record = engine.check_in(&employee, today(), now_wall_clock()).await?;

    Ok(HttpResponse::Ok().json(RecordResponse {
        success: true,
        message: "Checked in successfully".into(),
        data: record,
    }))
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance",
    request_body(content = CheckOutRequest, description = "Optional notes and self-rating"),
    responses(
        (status = 200, description = "Checked out successfully", body = RecordResponse),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "success": false,
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    body: Option<web::Json<CheckOutRequest>>,
) -> Result<impl Responder, AppError> {
    let employee = session_employee(&auth, &engine).await?;

    let details = match body.map(web::Json::into_inner) {
        Some(req) => {
            let productivity_rating = match req.productivity_rating {
                Some(r) if r > 100 => {
                    return Err(AppError::validation(
                        "productivityRating must be between 0 and 100",
                    ));
                }
                Some(r) => Some(r as u8),
                None => None,
            };
            CheckOutDetails {
                notes: req.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
                productivity_rating,
            }
        }
        None => CheckOutDetails::default(),
    };

    let record = engine
        .check_out(&employee, today(), now_wall_clock(), details)
        .await?;

    Ok(HttpResponse::Ok().json(RecordResponse {
        success: true,
        message: "Checked out successfully".into(),
        data: record,
    }))
}

/// Daily attendance of every matching employee
#[utoipa::path(
    get,
    path = "/api/attendance/daily",
    params(DailyQuery),
    responses(
        (status = 200, description = "One row per employee", body = DailyResponse),
        (status = 400, description = "Missing or malformed date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn daily(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    query: web::Query<DailyQuery>,
) -> Result<impl Responder, AppError> {
    administrator(&auth, &engine).await?;

    let date = required_date(query.date.as_deref(), "date")?;
    let filter = employee_filter(
        query.branch.as_deref(),
        query.department.as_deref(),
        query.employee_id.as_deref(),
    )?;
    debug!(?filter, %date, "Daily attendance requested");

    let view = engine.daily(auth.tenant_id, date, &filter).await?;

    Ok(HttpResponse::Ok().json(DailyResponse {
        success: true,
        date: view.date,
        count: view.rows.len(),
        data: view.rows,
        summary: view.summary,
    }))
}

/// Monthly aggregates per employee
#[utoipa::path(
    get,
    path = "/api/attendance/monthly",
    params(MonthlyQuery),
    responses(
        (status = 200, description = "Per-employee counts and percentages", body = MonthlyResponse),
        (status = 400, description = "Missing or malformed month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn monthly(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    query: web::Query<MonthlyQuery>,
) -> Result<impl Responder, AppError> {
    administrator(&auth, &engine).await?;

    let month: YearMonth = non_blank(query.month.as_deref())
        .ok_or_else(|| AppError::validation("month is required (YYYY-MM)"))?
        .parse()
        .map_err(|_| AppError::validation("month must be in YYYY-MM format"))?;
    let filter = employee_filter(
        query.branch.as_deref(),
        query.department.as_deref(),
        query.employee_id.as_deref(),
    )?;

    let view = engine.monthly(auth.tenant_id, month, &filter).await?;
    let with_calendar = filter.employee_id.is_some();
    let data: Vec<MonthlyEntry> = view
        .employees
        .iter()
        .map(|summary| MonthlyEntry::from_summary(summary, with_calendar))
        .collect();

    Ok(HttpResponse::Ok().json(MonthlyResponse {
        success: true,
        month: view.month,
        count: data.len(),
        data,
        include_weekends: view.include_weekends,
    }))
}

/// Recent attendance of one employee
#[utoipa::path(
    get,
    path = "/api/attendance/employee/{employeeId}",
    params(
        ("employeeId" = u64, Path, description = "Employee id"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Records newest first", body = HistoryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Another employee's history, or another tenant"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn employee_history(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    path: web::Path<u64>,
    query: web::Query<HistoryQuery>,
) -> Result<impl Responder, AppError> {
    session_employee(&auth, &engine).await?;
    let employee_id = path.into_inner();
    auth.require_self_or_admin(employee_id)?;

    let days = match non_blank(query.days.as_deref()) {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| AppError::validation("days must be a positive integer"))?,
        None => DEFAULT_HISTORY_DAYS,
    };

    let history = engine
        .employee_history(auth.tenant_id, employee_id, days, today())
        .await?;

    Ok(HttpResponse::Ok().json(HistoryResponse {
        success: true,
        data: HistoryData {
            employee: HistoryEmployee {
                id: history.employee.id,
                name: history.employee.full_name(),
            },
            from: history.from,
            to: history.to,
            attendances: history.entries,
        },
    }))
}

/// Mark an absent day as present
#[utoipa::path(
    post,
    path = "/api/attendance/manual-mark",
    request_body = ManualMarkRequest,
    responses(
        (status = 200, description = "Day marked present", body = RecordResponse),
        (status = 400, description = "Future date, day not absent, or bad input", body = Object, example = json!({
            "success": false,
            "message": "Cannot mark attendance for a future date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only, or employee of another tenant"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn manual_mark(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    body: web::Json<ManualMarkRequest>,
) -> Result<impl Responder, AppError> {
    administrator(&auth, &engine).await?;

    let req = body.into_inner();
    let date = required_date(Some(&req.date), "date")?;
    let mark = ManualMark {
        employee_id: req.employee_id,
        date,
        status: req.status,
        work_hours: req.work_hours,
    };

    let record = engine
        .manual_mark(auth.tenant_id, auth.user_id, mark, today())
        .await?;

    Ok(HttpResponse::Ok().json(RecordResponse {
        success: true,
        message: "Attendance marked as present".into(),
        data: record,
    }))
}
