use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{administrator, non_blank, optional_id, required_date, session_employee};
use crate::{
    auth::auth::AuthUser,
    engine::{AttendanceEngine, clock::YearMonth},
    error::AppError,
    model::holiday::{Holiday, NewHoliday},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHoliday {
    #[schema(example = "2024-12-16", format = "date")]
    pub date: String,
    #[schema(example = "Victory Day")]
    pub name: String,
    pub description: Option<String>,
    /// Omit for a tenant-wide holiday
    #[schema(example = 2)]
    pub branch_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct HolidayCalendarQuery {
    #[param(example = 2024)]
    pub year: Option<String>,
    /// 1 to 12
    #[param(example = 12)]
    pub month: Option<String>,
    pub branch_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HolidayResponse {
    #[schema(example = true)]
    pub success: bool,
    pub data: Holiday,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HolidayList {
    pub holidays: Vec<Holiday>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HolidayCalendarResponse {
    #[schema(example = true)]
    pub success: bool,
    pub data: HolidayList,
}

/// Declare a holiday for the tenant or one branch
#[utoipa::path(
    post,
    path = "/api/attendance/holidays",
    request_body = CreateHoliday,
    responses(
        (status = 201, description = "Holiday created", body = HolidayResponse),
        (status = 400, description = "Invalid date or name"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only, or the branch belongs to another tenant"),
        (status = 404, description = "Branch not found"),
        (status = 409, description = "A holiday already exists for this date and scope")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holiday"
)]
pub async fn create_holiday(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    body: web::Json<CreateHoliday>,
) -> Result<impl Responder, AppError> {
    administrator(&auth, &engine).await?;

    let req = body.into_inner();
    let holiday = NewHoliday {
        tenant_id: auth.tenant_id,
        branch_id: req.branch_id,
        date: required_date(Some(&req.date), "date")?,
        name: req.name,
        description: req.description,
    };

    let created = engine.create_holiday(holiday).await?;

    Ok(HttpResponse::Created().json(HolidayResponse {
        success: true,
        data: created,
    }))
}

/// Remove a holiday. Unknown ids succeed.
#[utoipa::path(
    delete,
    path = "/api/attendance/holidays/{id}",
    params(
        ("id" = u64, Path, description = "Holiday id")
    ),
    responses(
        (status = 200, description = "Holiday removed (or already absent)", body = Object, example = json!({
            "success": true,
            "message": "Holiday deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holiday"
)]
pub async fn delete_holiday(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    administrator(&auth, &engine).await?;

    engine.delete_holiday(auth.tenant_id, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Holiday deleted"
    })))
}

/// Holidays of one month
#[utoipa::path(
    get,
    path = "/api/attendance/holiday-calendar",
    params(HolidayCalendarQuery),
    responses(
        (status = 200, description = "Holidays in date order", body = HolidayCalendarResponse),
        (status = 400, description = "Missing or invalid year/month"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holiday"
)]
pub async fn holiday_calendar(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    query: web::Query<HolidayCalendarQuery>,
) -> Result<impl Responder, AppError> {
    session_employee(&auth, &engine).await?;

    let year = non_blank(query.year.as_deref())
        .and_then(|y| y.parse::<i32>().ok())
        .ok_or_else(|| AppError::validation("year is required and must be a number"))?;
    let month = non_blank(query.month.as_deref())
        .and_then(|m| m.parse::<u32>().ok())
        .and_then(|m| YearMonth::new(year, m))
        .ok_or_else(|| AppError::validation("month must be between 1 and 12"))?;
    let branch_id = optional_id(query.branch_id.as_deref(), "branchId")?;

    let holidays = engine
        .holiday_calendar(auth.tenant_id, branch_id, month)
        .await?;

    Ok(HttpResponse::Ok().json(HolidayCalendarResponse {
        success: true,
        data: HolidayList { holidays },
    }))
}
