//! `OpenAPI` document served under `/api-docs` and browsable via Swagger UI.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::api::handlers::{auth, health, invites, subscribe, MessageResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::login,
        auth::register,
        auth::verify,
        auth::refresh,
        auth::logout,
        invites::create,
        invites::list,
        invites::stats,
        invites::cleanup,
        invites::deactivate,
        subscribe::subscribe,
        subscribe::subscribers,
    ),
    components(schemas(
        MessageResponse,
        health::Health,
        auth::types::LoginRequest,
        auth::types::LoginResponse,
        auth::types::RegisterRequest,
        auth::types::RegisterResponse,
        auth::types::UserSummary,
        auth::types::VerifiedUser,
        auth::types::VerifyResponse,
        auth::types::RefreshResponse,
        invites::CreateTokenRequest,
        invites::InviteTokenResponse,
        invites::TokenListResponse,
        invites::StatsResponse,
        invites::CleanupResponse,
        subscribe::SubscribeRequest,
        subscribe::Subscriber,
        subscribe::SubscriberListResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and session management"),
        (name = "invite-tokens", description = "Invite token administration"),
        (name = "subscribe", description = "Mailing list"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_all_routes() {
        let doc = openapi();
        let paths = &doc.paths.paths;

        for route in [
            "/health",
            "/auth/login",
            "/auth/register",
            "/auth/verify",
            "/auth/refresh",
            "/auth/logout",
            "/auth/invite-tokens",
            "/auth/invite-tokens/stats",
            "/auth/invite-tokens/cleanup",
            "/auth/invite-tokens/{token}",
            "/subscribe",
            "/subscribe/subscribers",
        ] {
            assert!(paths.contains_key(route), "missing route {route}");
        }
    }

    #[test]
    fn test_openapi_declares_bearer_scheme() {
        let doc = openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
