//! Typed wrappers over `ApiClient`, one per backend area.
//!
//! Every call goes through the shared client, so list endpoints hit from
//! several places at once collapse into a single request.

pub mod allocations;
pub mod projects;
pub mod skills;
pub mod users;

pub use allocations::AllocationsApi;
pub use projects::ProjectsApi;
pub use skills::SkillsApi;
pub use users::UsersApi;

use crate::http::ApiClient;

/// All resource APIs over one shared client.
#[derive(Clone)]
pub struct SkillBridgeApi {
    pub projects: ProjectsApi,
    pub skills: SkillsApi,
    pub allocations: AllocationsApi,
    pub users: UsersApi,
}

impl SkillBridgeApi {
    pub fn new(client: ApiClient) -> Self {
        Self {
            projects: ProjectsApi::new(client.clone()),
            skills: SkillsApi::new(client.clone()),
            allocations: AllocationsApi::new(client.clone()),
            users: UsersApi::new(client),
        }
    }
}
