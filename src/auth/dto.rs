use serde::{Deserialize, Serialize};

use crate::users::model::PublicUser;

/// Request body for registration. Missing fields deserialize as empty and are
/// reported by validation instead of by the JSON extractor.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub vwo_level: String,
    pub subject: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResendRequest {
    pub email: String,
}

/// Envelope shared by all auth endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(user: Option<PublicUser>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            user,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>, message: Option<String>) -> Self {
        Self {
            success: false,
            user: None,
            message,
            error: Some(error.into()),
        }
    }
}
