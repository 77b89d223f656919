//! Request/response bodies for the auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Invite token gating account creation.
    pub token: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: UserSummary,
}

/// User payload of `/auth/verify`; the client contract uses camelCase
/// field names.
#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedUser {
    pub id: String,
    pub email: String,
    pub is_active: bool,
    pub email_verified: bool,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: VerifiedUser,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verified_user_uses_camel_case() {
        let user = VerifiedUser {
            id: "42".to_string(),
            email: "user@example.com".to_string(),
            is_active: true,
            email_verified: false,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("isActive").is_some());
        assert!(json.get("emailVerified").is_some());
        assert!(json.get("is_active").is_none());
    }
}
