//! Login, logout and the identity carried by the persisted token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::errors::SessionError;
use crate::http::ApiClient;
use crate::models::user::AuthResponse;
use crate::storage::{KeyValueStore, TOKEN_KEY};

const DEFAULT_LOGIN_FAILURE: &str = "Login failed. Please check your credentials.";

/// Per-role dashboard state kept next to the token; cleared on logout.
const SECTION_KEYS: [&str; 3] = [
    "managerActiveSection",
    "hrActiveSection",
    "employeeActiveSection",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Employee,
    Manager,
    Hr,
}

/// Claims the backend puts in its JWTs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    /// User email.
    pub sub: String,
    pub role: Option<Role>,
    pub iat: Option<i64>,
    pub exp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    pub role: Option<Role>,
    pub email: String,
}

/// Reads the payload segment of a JWT. The signature is not checked; the
/// backend does that on every request.
pub fn decode_claims(token: &str) -> Result<Claims, SessionError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| SessionError::InvalidToken("missing payload segment".to_string()))?;
    let raw = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SessionError::InvalidToken(format!("payload is not base64url: {e}")))?;
    serde_json::from_slice(&raw)
        .map_err(|e| SessionError::InvalidToken(format!("payload is not valid claims: {e}")))
}

#[derive(Clone)]
pub struct Session {
    client: ApiClient,
}

impl Session {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// POST /auth/login, then persist the returned token.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, SessionError> {
        let body = json!({ "email": email, "password": password });
        let response = match self.client.post("/auth/login", &body).await {
            Ok(response) => response,
            Err(e) => {
                error!("Login failed: {e}");
                return Err(SessionError::LoginFailed(
                    e.message()
                        .unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_string()),
                ));
            }
        };

        let auth: AuthResponse = response.json()?;
        let claims = decode_claims(&auth.token)?;
        self.client.store().set_item(TOKEN_KEY, &auth.token)?;

        let outcome = LoginOutcome {
            role: claims.role.or(auth.role),
            email: auth.email.unwrap_or(claims.sub),
        };
        info!("Logged in as {} ({:?})", outcome.email, outcome.role);
        Ok(outcome)
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        let store = self.client.store();
        store.remove_item(TOKEN_KEY)?;
        for key in SECTION_KEYS {
            store.remove_item(key)?;
        }
        info!("Logged out");
        Ok(())
    }

    /// Claims of the persisted token. A token that does not decode is removed.
    pub fn current(&self) -> Result<Option<Claims>, SessionError> {
        let store = self.client.store();
        let Some(token) = store.get_item(TOKEN_KEY)? else {
            return Ok(None);
        };
        match decode_claims(&token) {
            Ok(claims) => Ok(Some(claims)),
            Err(e) => {
                warn!("Discarding stored token: {e}");
                store.remove_item(TOKEN_KEY)?;
                Ok(None)
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.client.store().get_item(TOKEN_KEY), Ok(Some(token)) if !token.is_empty())
    }
}
