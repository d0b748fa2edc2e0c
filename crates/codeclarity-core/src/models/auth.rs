use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /auth/authenticate`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair returned by both the authenticate and refresh endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub token: String,
    pub refresh_token: String,
    pub token_expiry: DateTime<Utc>,
    pub refresh_token_expiry: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultOrg {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The authenticated user, as returned by `GET /auth/user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_org: Option<DefaultOrg>,
    #[serde(default)]
    pub activated: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// The user's default organization ID, if the server assigned one.
    pub fn default_org_id(&self) -> Option<&str> {
        self.default_org
            .as_ref()
            .map(|org| org.id.as_str())
            .filter(|id| !id.is_empty())
    }
}
