use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

/// A declared non-working date. `branch_id = None` means tenant-wide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 12,
    "tenantId": 1,
    "branchId": null,
    "date": "2024-12-25",
    "name": "Christmas Day",
    "description": null
}))]
pub struct Holiday {
    pub id: u64,
    pub tenant_id: u64,
    pub branch_id: Option<u64>,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub name: String,
    pub description: Option<String>,
}

/// Input for declaring a holiday.
#[derive(Debug, Clone)]
pub struct NewHoliday {
    pub tenant_id: u64,
    pub branch_id: Option<u64>,
    pub date: NaiveDate,
    pub name: String,
    pub description: Option<String>,
}
