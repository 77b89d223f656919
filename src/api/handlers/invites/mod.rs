//! Invite token management endpoints. All of them sit behind the session
//! guard; tokens can only be minted and inspected by signed-in users.

pub(crate) mod storage;

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info};
use utoipa::ToSchema;

use self::storage::{InviteToken, DEFAULT_EXPIRES_IN_HOURS, DEFAULT_MAX_USES};
use super::{auth::guard::AuthUser, client_error, MessageResponse};

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct CreateTokenRequest {
    /// Hours until expiry; defaults to one week.
    pub expires_in_hours: Option<i64>,
    /// Registrations a single token admits; defaults to one.
    pub max_uses: Option<i32>,
    pub notes: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct InviteTokenResponse {
    pub id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub max_uses: i32,
    pub used_count: i32,
    pub remaining_uses: i32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<InviteToken> for InviteTokenResponse {
    fn from(invite: InviteToken) -> Self {
        let remaining_uses = invite.remaining_uses();
        Self {
            id: invite.id.to_string(),
            token: invite.token,
            expires_at: invite.expires_at,
            max_uses: invite.max_uses,
            used_count: invite.used_count,
            remaining_uses,
            last_used_at: invite.last_used_at,
            is_active: invite.is_active,
            notes: invite.notes,
            created_at: invite.created_at,
        }
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct TokenListResponse {
    pub success: bool,
    pub tokens: Vec<InviteTokenResponse>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct StatsResponse {
    pub success: bool,
    pub total_tokens: i64,
    pub active_tokens: i64,
    pub expired_tokens: i64,
    pub used_tokens: i64,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct CleanupResponse {
    pub success: bool,
    pub deleted: u64,
}

/// Mint an invite token owned by the caller.
#[utoipa::path(
    post,
    path = "/auth/invite-tokens",
    request_body = CreateTokenRequest,
    responses(
        (status = 201, description = "Token created", body = InviteTokenResponse),
        (status = 400, description = "Invalid parameters", body = MessageResponse),
        (status = 401, description = "Invalid or expired token", body = MessageResponse),
        (status = 500, description = "Token creation failed", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "invite-tokens"
)]
pub async fn create(
    Extension(pool): Extension<PgPool>,
    Extension(user): Extension<AuthUser>,
    payload: Option<Json<CreateTokenRequest>>,
) -> Response {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();

    let expires_in_hours = payload.expires_in_hours.unwrap_or(DEFAULT_EXPIRES_IN_HOURS);
    let max_uses = payload.max_uses.unwrap_or(DEFAULT_MAX_USES);

    if expires_in_hours <= 0 {
        return client_error(StatusCode::BAD_REQUEST, "expires_in_hours must be positive");
    }
    if max_uses <= 0 {
        return client_error(StatusCode::BAD_REQUEST, "max_uses must be positive");
    }

    // Checked arithmetic; an absurd lifetime is a client error, not a panic.
    let Some(expires_at) = storage::expiry_after_hours(Utc::now(), expires_in_hours) else {
        return client_error(StatusCode::BAD_REQUEST, "expires_in_hours is too large");
    };

    match storage::create_token(&pool, user.id, expires_at, max_uses, payload.notes.as_deref())
        .await
    {
        Ok(invite) => {
            info!("Invite token created");
            (
                StatusCode::CREATED,
                Json(InviteTokenResponse::from(invite)),
            )
                .into_response()
        }
        Err(err) => {
            error!("Invite token creation failed: {err:?}");
            client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create invite token",
            )
        }
    }
}

/// List the caller's invite tokens, newest first.
#[utoipa::path(
    get,
    path = "/auth/invite-tokens",
    responses(
        (status = 200, description = "Tokens created by the caller", body = TokenListResponse),
        (status = 401, description = "Invalid or expired token", body = MessageResponse),
        (status = 500, description = "Listing failed", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "invite-tokens"
)]
pub async fn list(
    Extension(pool): Extension<PgPool>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    match storage::tokens_by_user(&pool, user.id).await {
        Ok(tokens) => (
            StatusCode::OK,
            Json(TokenListResponse {
                success: true,
                tokens: tokens.into_iter().map(InviteTokenResponse::from).collect(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Invite token listing failed: {err:?}");
            client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list invite tokens",
            )
        }
    }
}

/// Aggregate counters across all invite tokens.
#[utoipa::path(
    get,
    path = "/auth/invite-tokens/stats",
    responses(
        (status = 200, description = "Usage counters", body = StatsResponse),
        (status = 401, description = "Invalid or expired token", body = MessageResponse),
        (status = 500, description = "Stats query failed", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "invite-tokens"
)]
pub async fn stats(Extension(pool): Extension<PgPool>) -> Response {
    match storage::usage_stats(&pool).await {
        Ok(stats) => (
            StatusCode::OK,
            Json(StatsResponse {
                success: true,
                total_tokens: stats.total_tokens,
                active_tokens: stats.active_tokens,
                expired_tokens: stats.expired_tokens,
                used_tokens: stats.used_tokens,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Invite token stats failed: {err:?}");
            client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to compute invite token stats",
            )
        }
    }
}

/// Delete tokens that are expired and already deactivated.
#[utoipa::path(
    post,
    path = "/auth/invite-tokens/cleanup",
    responses(
        (status = 200, description = "Expired tokens removed", body = CleanupResponse),
        (status = 401, description = "Invalid or expired token", body = MessageResponse),
        (status = 500, description = "Cleanup failed", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "invite-tokens"
)]
pub async fn cleanup(Extension(pool): Extension<PgPool>) -> Response {
    match storage::cleanup_expired_tokens(&pool).await {
        Ok(deleted) => {
            info!(deleted, "Expired invite tokens removed");
            (
                StatusCode::OK,
                Json(CleanupResponse {
                    success: true,
                    deleted,
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!("Invite token cleanup failed: {err:?}");
            client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to cleanup invite tokens",
            )
        }
    }
}

/// Deactivate a token so it can no longer admit registrations.
#[utoipa::path(
    delete,
    path = "/auth/invite-tokens/{token}",
    params(("token" = String, Path, description = "Opaque invite token value")),
    responses(
        (status = 200, description = "Token deactivated", body = MessageResponse),
        (status = 404, description = "Token not found", body = MessageResponse),
        (status = 401, description = "Invalid or expired token", body = MessageResponse),
        (status = 500, description = "Deactivation failed", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "invite-tokens"
)]
pub async fn deactivate(
    Extension(pool): Extension<PgPool>,
    Path(token): Path<String>,
) -> Response {
    match storage::deactivate_token(&pool, &token).await {
        Ok(true) => (
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: "Invite token deactivated".to_string(),
            }),
        )
            .into_response(),
        Ok(false) => client_error(StatusCode::NOT_FOUND, "Invite token not found"),
        Err(err) => {
            error!("Invite token deactivation failed: {err:?}");
            client_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to deactivate invite token",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    #[test]
    fn test_response_from_entity_derives_remaining_uses() {
        let now = Utc::now();
        let invite = InviteToken {
            id: Uuid::new_v4(),
            token: storage::generate_token(),
            created_by: Uuid::new_v4(),
            expires_at: now + Duration::hours(24),
            max_uses: 5,
            used_count: 2,
            last_used_at: Some(now),
            is_active: true,
            notes: Some("friends".to_string()),
            created_at: now,
            updated_at: now,
        };

        let response = InviteTokenResponse::from(invite);
        assert_eq!(response.remaining_uses, 3);
        assert_eq!(response.max_uses, 5);
        assert_eq!(response.used_count, 2);
        assert!(response.is_active);
        assert_eq!(response.notes.as_deref(), Some("friends"));
    }

    #[test]
    fn test_create_request_defaults_are_empty() {
        let request = CreateTokenRequest::default();
        assert!(request.expires_in_hours.is_none());
        assert!(request.max_uses.is_none());
        assert!(request.notes.is_none());
    }
}
