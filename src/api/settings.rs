use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{administrator, optional_id};
use crate::{
    auth::auth::AuthUser,
    engine::{AttendanceEngine, clock::WallClock},
    error::AppError,
    model::settings::AttendanceConfig,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SettingsQuery {
    /// Branch override to read; omit for the tenant default
    pub branch_id: Option<String>,
}

/// Fields left out keep their current value.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettings {
    #[schema(example = 2)]
    pub branch_id: Option<u64>,
    #[schema(example = false)]
    pub include_weekends: Option<bool>,
    #[schema(example = "09:00")]
    pub standard_check_in_time: Option<String>,
    #[schema(example = 15)]
    pub late_threshold_minutes: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = json!(null))]
    pub branch_id: Option<u64>,
    pub data: AttendanceConfig,
}

/// Attendance rules in effect for the tenant or a branch
#[utoipa::path(
    get,
    path = "/api/attendance/settings",
    params(SettingsQuery),
    responses(
        (status = 200, description = "Effective settings", body = SettingsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn get_settings(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    query: web::Query<SettingsQuery>,
) -> Result<impl Responder, AppError> {
    administrator(&auth, &engine).await?;

    let branch_id = optional_id(query.branch_id.as_deref(), "branchId")?;
    let config = engine.attendance_config(auth.tenant_id, branch_id).await?;

    Ok(HttpResponse::Ok().json(SettingsResponse {
        success: true,
        branch_id,
        data: config,
    }))
}

/// Change the tenant default or a branch override
#[utoipa::path(
    put,
    path = "/api/attendance/settings",
    request_body = UpdateSettings,
    responses(
        (status = 200, description = "Settings saved", body = SettingsResponse),
        (status = 400, description = "Invalid check-in time or threshold"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only, or the branch belongs to another tenant"),
        (status = 404, description = "Branch not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn update_settings(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    body: web::Json<UpdateSettings>,
) -> Result<impl Responder, AppError> {
    administrator(&auth, &engine).await?;

    let req = body.into_inner();
    let current = engine
        .attendance_config(auth.tenant_id, req.branch_id)
        .await?;

    let standard_check_in_time = match req.standard_check_in_time.as_deref() {
        Some(raw) => raw.parse::<WallClock>().map_err(|_| {
            AppError::validation("standardCheckInTime must be a time such as 09:00")
        })?,
        None => current.standard_check_in_time,
    };
    let config = AttendanceConfig {
        include_weekends: req.include_weekends.unwrap_or(current.include_weekends),
        standard_check_in_time,
        late_threshold_minutes: req
            .late_threshold_minutes
            .unwrap_or(current.late_threshold_minutes),
    };

    let saved = engine
        .update_attendance_config(auth.tenant_id, req.branch_id, config)
        .await?;

    Ok(HttpResponse::Ok().json(SettingsResponse {
        success: true,
        branch_id: req.branch_id,
        data: saved,
    }))
}
