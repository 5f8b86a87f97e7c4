use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingType {
    Billable,
    Investment,
    Bench,
    #[serde(other)]
    Unknown,
}

/// An allocation request or project assignment as the backend lists them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub assignment_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub employee_name: Option<String>,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub billing_type: Option<BillingType>,
    /// `PENDING` for any request still awaiting approval, then `ACTIVE` or `ENDED`.
    pub assignment_status: Option<String>,
    /// Approval stage of the underlying request: `PENDING_MANAGER`,
    /// `PENDING_HR`, `APPROVED` or `REJECTED`. Only set on the employee's own list.
    pub request_status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequestDraft {
    pub project_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardToHr {
    pub comments: String,
    pub billing_type: BillingType,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub reason: String,
}

/// `GET /utilization/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUtilization {
    pub allocation_status: Option<BillingType>,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    #[serde(default)]
    pub total_utilization: u32,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

/// One row of `GET /utilization/team`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamUtilization {
    pub employee_id: Uuid,
    pub email: Option<String>,
    pub allocation_status: Option<BillingType>,
    pub project_name: Option<String>,
}

/// Headcount by allocation status, as served by `GET /utilization/summary`
/// or computed locally from team rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationSummary {
    pub total_employees: u64,
    pub billable_count: u64,
    pub investment_count: u64,
    pub bench_count: u64,
}
