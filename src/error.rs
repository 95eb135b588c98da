//! Errors returned by the REST client

use thiserror::Error;

/// The message shown when the server gives no explanation
pub const FALLBACK_ERROR_MESSAGE: &str = "An error occurred";

#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401. The session is no longer valid and the user must log in again
    #[error("Unauthorized")]
    Unauthorized,
    /// The server refused the request and explained why
    #[error("{message} (code {code})")]
    Server { code: u16, message: String },
    /// This call requires a session, but nobody is logged in
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unable to decode server response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// The text that should be shown to the user for this error
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server { message, .. } if message.is_empty() == false => message.clone(),
            ApiError::Unauthorized => "Your session has expired, please log in again".to_string(),
            ApiError::NotLoggedIn => "Please log in first".to_string(),
            _ => FALLBACK_ERROR_MESSAGE.to_string(),
        }
    }
}
