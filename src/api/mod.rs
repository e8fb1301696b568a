//! HTTP handlers. Query strings arrive as raw strings and are parsed here so
//! malformed values surface as `{ success: false, message }` 400s.

pub mod attendance;
pub mod holiday;
pub mod settings;

use chrono::{Local, NaiveDate};

use crate::{
    auth::auth::AuthUser,
    engine::{AttendanceEngine, clock::parse_date},
    error::AppError,
    model::employee::Employee,
};

/// Local calendar date of the server.
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Treats an absent or blank query value as "not given".
pub(crate) fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn required_date(raw: Option<&str>, field: &str) -> Result<NaiveDate, AppError> {
    let raw = non_blank(raw)
        .ok_or_else(|| AppError::validation(format!("{field} is required (YYYY-MM-DD)")))?;
    parse_date(raw)
        .ok_or_else(|| AppError::validation(format!("{field} must be a date in YYYY-MM-DD format")))
}

pub(crate) fn optional_id(raw: Option<&str>, field: &str) -> Result<Option<u64>, AppError> {
    non_blank(raw)
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| AppError::validation(format!("{field} must be a positive integer")))
        })
        .transpose()
}

/// Confirms the session's employee exists in the session's tenant.
pub(crate) async fn session_employee(
    auth: &AuthUser,
    engine: &AttendanceEngine,
) -> Result<Employee, AppError> {
    engine
        .acting_employee(auth.tenant_id, auth.acting_employee_id()?)
        .await
}

/// Session check plus the HR/Admin role gate used by every administrative endpoint.
pub(crate) async fn administrator(
    auth: &AuthUser,
    engine: &AttendanceEngine,
) -> Result<Employee, AppError> {
    let employee = session_employee(auth, engine).await?;
    auth.require_hr_or_admin()?;
    Ok(employee)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_count_as_missing() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(optional_id(Some(""), "branch").unwrap(), None);
        assert_eq!(optional_id(Some("12"), "branch").unwrap(), Some(12));
        assert!(optional_id(Some("twelve"), "branch").is_err());
    }

    #[test]
    fn dates_must_be_iso() {
        assert!(required_date(None, "date").is_err());
        assert!(required_date(Some("20/11/2024"), "date").is_err());
        assert_eq!(
            required_date(Some("2024-11-20"), "date").unwrap(),
            NaiveDate::from_ymd_opt(2024, 11, 20).unwrap()
        );
    }
}
