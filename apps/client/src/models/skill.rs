use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

/// A skill on an employee's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSkill {
    pub id: Uuid,
    pub skill_name: String,
    pub proficiency_level: Option<ProficiencyLevel>,
    pub status: Option<SkillStatus>,
}

/// Body of `POST /skills` and `PUT /skills/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDraft {
    pub skill_name: String,
    pub proficiency_level: ProficiencyLevel,
}

/// Entry in the organisation-wide skill catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSkill {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSearchHit {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub employee_name: Option<String>,
    pub skill_name: String,
    pub proficiency_level: Option<ProficiencyLevel>,
    pub status: Option<SkillStatus>,
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillVerification {
    pub status: SkillStatus,
}
