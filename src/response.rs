//! The envelope every REST endpoint wraps its replies in

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// `{status, code, message, data}`, as sent by the server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// `success` or `error`
    pub status: String,
    pub code: u16,
    #[serde(default)]
    pub message: String,
    /// Absent (or `null`) for calls that only acknowledge
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Returns the payload, or an error in case the server sent none
    pub fn into_data(self) -> Result<T, ApiError> {
        match self.data {
            Some(data) => Ok(data),
            None => Err(ApiError::Server {
                code: self.code,
                message: format!("Missing data in server reply ({})", self.message),
            }),
        }
    }
}

/// Turn an HTTP status code and reply body into an envelope, or into the matching error
pub fn decode<T: DeserializeOwned>(http_status: u16, body: &str) -> Result<ApiResponse<T>, ApiError> {
    if http_status == 401 {
        return Err(ApiError::Unauthorized);
    }

    if (200..300).contains(&http_status) == false {
        // Error replies usually carry an envelope, but proxies and crashes may send anything
        let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
            .map(|envelope| envelope.message)
            .unwrap_or_default();
        log::debug!("Server replied {}: {:?}", http_status, message);
        return Err(ApiError::Server { code: http_status, message });
    }

    let envelope: ApiResponse<T> = serde_json::from_str(body)?;
    if envelope.is_success() == false {
        if envelope.code == 401 {
            return Err(ApiError::Unauthorized);
        }
        return Err(ApiError::Server { code: envelope.code, message: envelope.message });
    }
    Ok(envelope)
}
