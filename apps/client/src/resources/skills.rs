use serde_json::Value;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::http::{ApiClient, ApiRequest};
use crate::models::skill::{
    CatalogSkill, EmployeeSkill, SkillDraft, SkillSearchHit, SkillStatus, SkillVerification,
};

#[derive(Clone)]
pub struct SkillsApi {
    client: ApiClient,
}

impl SkillsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    // Catalog

    /// GET /catalog/skills
    pub async fn catalog(&self) -> Result<Vec<CatalogSkill>, ApiError> {
        self.client.get("/catalog/skills").await?.json()
    }

    /// POST /catalog/skills
    pub async fn add_catalog_skill(&self, skill: &CatalogSkill) -> Result<CatalogSkill, ApiError> {
        self.client.post("/catalog/skills", skill).await?.json()
    }

    /// DELETE /catalog/skills/{id}
    pub async fn delete_catalog_skill(&self, id: Uuid) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/catalog/skills/{id}"))
            .await?;
        Ok(())
    }

    // Employee skills

    /// GET /skills/my
    pub async fn mine(&self) -> Result<Vec<EmployeeSkill>, ApiError> {
        self.client.get("/skills/my").await?.json()
    }

    /// GET /skills/search?skill=...
    pub async fn search_by_skill(&self, skill_name: &str) -> Result<Vec<SkillSearchHit>, ApiError> {
        self.client
            .send(ApiRequest::get("/skills/search").param("skill", skill_name))
            .await?
            .json()
    }

    /// GET /skills/search?skills=a&skills=b
    pub async fn search_talent(&self, skills: &[String]) -> Result<Vec<SkillSearchHit>, ApiError> {
        let skills: Vec<Value> = skills.iter().cloned().map(Value::String).collect();
        self.client
            .send(ApiRequest::get("/skills/search").param("skills", skills))
            .await?
            .json()
    }

    /// POST /skills
    pub async fn add(&self, draft: &SkillDraft) -> Result<EmployeeSkill, ApiError> {
        self.client.post("/skills", draft).await?.json()
    }

    /// PUT /skills/{id}
    pub async fn update(&self, id: Uuid, draft: &SkillDraft) -> Result<EmployeeSkill, ApiError> {
        self.client
            .put(&format!("/skills/{id}"), draft)
            .await?
            .json()
    }

    /// DELETE /skills/{id}
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        self.client.delete(&format!("/skills/{id}")).await?;
        Ok(())
    }

    // Manager / HR verification

    /// GET /skills/pending
    pub async fn pending(&self) -> Result<Vec<EmployeeSkill>, ApiError> {
        self.client.get("/skills/pending").await?.json()
    }

    /// PUT /skills/{id}/verify
    pub async fn verify(&self, id: Uuid, status: SkillStatus) -> Result<EmployeeSkill, ApiError> {
        self.client
            .put(
                &format!("/skills/{id}/verify"),
                &SkillVerification { status },
            )
            .await?
            .json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{client, RecordingTransport};
    use serde_json::json;

    #[tokio::test]
    async fn test_search_talent_sends_repeated_skills_param() {
        let transport = RecordingTransport::new(json!([]));
        let api = SkillsApi::new(client(transport.clone()));

        let hits = api
            .search_talent(&["Rust".to_string(), "Kafka".to_string()])
            .await
            .unwrap();

        assert!(hits.is_empty());
        let req = transport.last();
        assert_eq!(req.url, "/skills/search");
        assert_eq!(req.params["skills"], json!(["Rust", "Kafka"]));
        assert_eq!(
            req.fingerprint().as_deref(),
            Some(r#"get:/skills/search:{"skills":["Rust","Kafka"]}"#)
        );
    }

    #[tokio::test]
    async fn test_verify_sends_status() {
        let id = Uuid::new_v4();
        let transport = RecordingTransport::new(json!({
            "id": id,
            "skillName": "Rust",
            "proficiencyLevel": "ADVANCED",
            "status": "APPROVED"
        }));
        let api = SkillsApi::new(client(transport.clone()));

        let skill = api.verify(id, SkillStatus::Approved).await.unwrap();

        assert_eq!(skill.status, Some(SkillStatus::Approved));
        assert_eq!(transport.last().body, Some(json!({"status": "APPROVED"})));
    }
}
