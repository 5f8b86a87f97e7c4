use crate::errors::ApiError;
use crate::http::ApiClient;
use crate::models::user::{NewUser, UserProfile};

#[derive(Clone)]
pub struct UsersApi {
    client: ApiClient,
}

impl UsersApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn list(&self, url: &str) -> Result<Vec<UserProfile>, ApiError> {
        self.client.get(url).await?.json()
    }

    /// GET /users/managers
    pub async fn managers(&self) -> Result<Vec<UserProfile>, ApiError> {
        self.list("/users/managers").await
    }

    /// GET /users/hrs
    pub async fn hrs(&self) -> Result<Vec<UserProfile>, ApiError> {
        self.list("/users/hrs").await
    }

    /// GET /users/employees
    pub async fn employees(&self) -> Result<Vec<UserProfile>, ApiError> {
        self.list("/users/employees").await
    }

    /// GET /users/bench
    pub async fn bench(&self) -> Result<Vec<UserProfile>, ApiError> {
        self.list("/users/bench").await
    }

    /// GET /users/team
    pub async fn team(&self) -> Result<Vec<UserProfile>, ApiError> {
        self.list("/users/team").await
    }

    /// GET /users/allocatable
    pub async fn allocatable(&self) -> Result<Vec<UserProfile>, ApiError> {
        self.list("/users/allocatable").await
    }

    /// POST /users
    pub async fn create(&self, user: &NewUser) -> Result<UserProfile, ApiError> {
        self.client.post("/users", user).await?.json()
    }

    /// GET /users/me
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.client.get("/users/me").await?.json()
    }
}
