//! # Gatepass
//!
//! `gatepass` is a small identity backend providing user registration and
//! login gated by single-use invite tokens, JWT-based session
//! authentication, and a mailing-list subscription endpoint.
//!
//! ## Invite tokens
//!
//! Account creation requires a valid invite token. A token is usable while
//! it is active, unexpired, and below its `max_uses` counter; consumption is
//! a single atomic conditional update so two concurrent registrations cannot
//! over-consume a single-use token.
//!
//! ## Sessions
//!
//! Logins are exchanged for a short-lived access token and a longer-lived
//! refresh token, both HS256 JWTs. There is no server-side revocation
//! store; token lifetime is bounded solely by the `exp` claim.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
