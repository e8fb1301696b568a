use crate::api::attendance::{
    CheckOutRequest, DailyResponse, HistoryData, HistoryEmployee, HistoryResponse,
    ManualMarkRequest, MonthlyEntry, MonthlyResponse, RecordResponse,
};
use crate::api::holiday::{CreateHoliday, HolidayCalendarResponse, HolidayList, HolidayResponse};
use crate::api::settings::{SettingsResponse, UpdateSettings};
use crate::engine::{
    classifier::StatusTally, daily::DailyRow, monthly::CalendarEntry, recording::HistoryEntry,
};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus},
    holiday::Holiday,
    settings::AttendanceConfig,
};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Engine API",
        version = "1.0.0",
        description = r#"
## Attendance Computation & Aggregation

Classifies every employee-day of a tenant as **present**, **late**, **absent**, **weekend** or
**holiday**, and rolls the days up into daily and monthly reports.

### Key Features
- **Check-in / check-out** for the signed-in employee
- **Daily view**: one row per employee with a status summary
- **Monthly view**: day counts, attendance percentage and average hours
- **Manual correction**: HR can turn an absent day into a present one
- **Holiday calendar**: tenant-wide or branch-specific holidays
- **Settings**: standard check-in time, late threshold, weekend policy

### Security
Every endpoint needs a **JWT Bearer** token carrying the tenant and employee of the caller.
Reports, corrections, holidays and settings are limited to **HR** and **Admin**.

### Errors
Every failure returns `{ "success": false, "message": "..." }`.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::daily,
        crate::api::attendance::monthly,
        crate::api::attendance::employee_history,
        crate::api::attendance::manual_mark,

        crate::api::holiday::create_holiday,
        crate::api::holiday::delete_holiday,
        crate::api::holiday::holiday_calendar,

        crate::api::settings::get_settings,
        crate::api::settings::update_settings
    ),
    components(
        schemas(
            AttendanceStatus,
            AttendanceRecord,
            AttendanceConfig,
            Holiday,
            StatusTally,
            DailyRow,
            CalendarEntry,
            HistoryEntry,
            CheckOutRequest,
            ManualMarkRequest,
            RecordResponse,
            DailyResponse,
            MonthlyEntry,
            MonthlyResponse,
            HistoryEmployee,
            HistoryData,
            HistoryResponse,
            CreateHoliday,
            HolidayResponse,
            HolidayList,
            HolidayCalendarResponse,
            UpdateSettings,
            SettingsResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in, reports and corrections"),
        (name = "Holiday", description = "Holiday calendar APIs"),
        (name = "Settings", description = "Tenant and branch attendance rules"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
