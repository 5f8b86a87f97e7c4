use uuid::Uuid;

use crate::errors::ApiError;
use crate::http::ApiClient;
use crate::models::project::{Project, ProjectDraft, ProjectStatus, ProjectStatusUpdate};

#[derive(Clone)]
pub struct ProjectsApi {
    client: ApiClient,
}

impl ProjectsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// GET /projects
    pub async fn all(&self) -> Result<Vec<Project>, ApiError> {
        self.client.get("/projects").await?.json()
    }

    /// GET /projects/active
    pub async fn active(&self) -> Result<Vec<Project>, ApiError> {
        self.client.get("/projects/active").await?.json()
    }

    /// POST /projects
    pub async fn create(&self, draft: &ProjectDraft) -> Result<Project, ApiError> {
        self.client.post("/projects", draft).await?.json()
    }

    /// PUT /projects/{id}
    pub async fn update(&self, id: Uuid, draft: &ProjectDraft) -> Result<Project, ApiError> {
        self.client
            .put(&format!("/projects/{id}"), draft)
            .await?
            .json()
    }

    /// DELETE /projects/{id}
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        self.client.delete(&format!("/projects/{id}")).await?;
        Ok(())
    }

    /// PUT /projects/{id}/status
    pub async fn update_status(
        &self,
        id: Uuid,
        status: ProjectStatus,
    ) -> Result<Project, ApiError> {
        self.client
            .put(
                &format!("/projects/{id}/status"),
                &ProjectStatusUpdate { status },
            )
            .await?
            .json()
    }

    /// Looks a project up in the full listing; the backend has no single-project GET.
    pub async fn find(&self, id: Uuid) -> Result<Option<Project>, ApiError> {
        Ok(self.all().await?.into_iter().find(|p| p.id == id))
    }
}
