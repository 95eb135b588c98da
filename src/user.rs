//! Accounts and authentication payloads

use serde::{Deserialize, Serialize};

pub type UserId = i64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignUpPayload {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// What the server replies to a successful login
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    /// The token type, always `Bearer`
    #[serde(rename = "type", default = "bearer")]
    pub token_type: String,
    pub user_id: UserId,
    pub email: String,
    pub name: String,
}

fn bearer() -> String {
    "Bearer".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeNamePayload {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
    pub current_password: String,
    pub new_password: String,
}
