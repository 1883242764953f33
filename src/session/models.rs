use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter};
use uuid::Uuid;

/// Bio every new account starts with. Rendered as-is by clients.
pub const DEFAULT_BIO: &str = "<p>Welcome back! Paste anything here – we trust you.</p>";

/// Role every account is created with
pub const DEFAULT_ROLE: &str = "user";

/// User record held against a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    username: String,
    pub name: String,
    pub email: String,
    pub api_key: String,
    pub session_id: String, // Informational only, never checked
    pub bio: String,
    pub roles: Vec<String>,
}

impl User {
    /// Creates a user with display fields derived from the username
    /// and freshly generated api key / session id.
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();

        Self {
            name: username.clone(),
            email: format!("{}@example.com", username),
            api_key: Uuid::new_v4().to_string(),
            session_id: format!("{}-{}", Uuid::new_v4(), Utc::now().timestamp_millis()),
            bio: DEFAULT_BIO.to_string(),
            roles: vec![DEFAULT_ROLE.to_string()],
            username,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Appends a role, keeping roles an ordered set
    pub fn grant_role(&mut self, role: impl Into<String>) {
        let role = role.into();
        if !self.has_role(&role) {
            self.roles.push(role);
        }
    }

    /// Overwrites a profile field verbatim. No validation or escaping.
    pub fn set_field(&mut self, field: ProfileField, value: String) {
        match field {
            ProfileField::Name => self.name = value,
            ProfileField::Email => self.email = value,
            ProfileField::Bio => self.bio = value,
            ProfileField::ApiKey => self.api_key = value,
        }
    }
}

/// Profile keys a client may overwrite, with their wire names
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, AsRefStr)]
pub enum ProfileField {
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "email")]
    Email,
    #[strum(serialize = "bio")]
    Bio,
    #[strum(serialize = "apiKey")]
    ApiKey,
}

/// Returned once per login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    pub encoded_password: String,
}
