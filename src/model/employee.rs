use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 1,
        "tenantId": 1,
        "employeeCode": "EMP-001",
        "firstName": "John",
        "lastName": "Doe",
        "department": "Engineering",
        "branchId": 2,
        "branchName": "Dhaka HQ",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub tenant_id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,

    #[schema(example = 2, nullable = true)]
    pub branch_id: Option<u64>,

    #[schema(example = "Dhaka HQ", nullable = true)]
    pub branch_name: Option<String>,

    #[schema(example = "active")]
    pub status: String,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Narrows the employees an engine call looks at. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeFilter {
    pub branch_id: Option<u64>,
    pub department: Option<String>,
    pub employee_id: Option<u64>,
}

impl EmployeeFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        self.branch_id.is_none_or(|b| employee.branch_id == Some(b))
            && self
                .department
                .as_deref()
                .is_none_or(|d| employee.department.as_deref() == Some(d))
            && self.employee_id.is_none_or(|id| employee.id == id)
    }
}
