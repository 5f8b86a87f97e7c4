use uuid::Uuid;

use crate::errors::ApiError;
use crate::http::ApiClient;
use crate::models::allocation::{
    AllocationRequestDraft, Assignment, BillingType, EmployeeUtilization, ForwardToHr, Rejection,
    TeamUtilization, UtilizationSummary,
};

/// Bench allocation requests and their Manager → HR approval chain.
#[derive(Clone)]
pub struct AllocationsApi {
    client: ApiClient,
}

impl AllocationsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// POST /allocation-requests (employee)
    pub async fn create_request(&self, project_id: Uuid) -> Result<(), ApiError> {
        self.client
            .post(
                "/allocation-requests",
                &AllocationRequestDraft { project_id },
            )
            .await?;
        Ok(())
    }

    /// GET /allocation-requests/pending (manager, HR)
    pub async fn pending(&self) -> Result<Vec<Assignment>, ApiError> {
        self.client
            .get("/allocation-requests/pending")
            .await?
            .json()
    }

    /// GET /allocation-requests/my (employee)
    pub async fn mine(&self) -> Result<Vec<Assignment>, ApiError> {
        self.client.get("/allocation-requests/my").await?.json()
    }

    /// PUT /allocation-requests/{id}/forward (manager)
    pub async fn forward_to_hr(
        &self,
        request_id: Uuid,
        comments: &str,
        billing_type: BillingType,
    ) -> Result<(), ApiError> {
        let body = ForwardToHr {
            comments: comments.to_string(),
            billing_type,
        };
        self.client
            .put(&format!("/allocation-requests/{request_id}/forward"), &body)
            .await?;
        Ok(())
    }

    /// PUT /allocation-requests/{id}/reject (manager, HR)
    pub async fn reject(&self, request_id: Uuid, reason: &str) -> Result<(), ApiError> {
        let body = Rejection {
            reason: reason.to_string(),
        };
        self.client
            .put(&format!("/allocation-requests/{request_id}/reject"), &body)
            .await?;
        Ok(())
    }

    /// PUT /allocation-requests/{id}/approve (HR)
    pub async fn approve(&self, request_id: Uuid) -> Result<(), ApiError> {
        self.client
            .put(
                &format!("/allocation-requests/{request_id}/approve"),
                &serde_json::json!({}),
            )
            .await?;
        Ok(())
    }

    /// GET /utilization/me
    pub async fn my_utilization(&self) -> Result<EmployeeUtilization, ApiError> {
        self.client.get("/utilization/me").await?.json()
    }

    /// GET /utilization/team
    pub async fn team_utilization(&self) -> Result<Vec<TeamUtilization>, ApiError> {
        self.client.get("/utilization/team").await?.json()
    }

    /// GET /utilization/summary
    pub async fn utilization_summary(&self) -> Result<UtilizationSummary, ApiError> {
        self.client.get("/utilization/summary").await?.json()
    }
}
