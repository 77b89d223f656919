//! Invite token entity and database operations.
//!
//! A token is usable while it is active, unexpired, and below its
//! `max_uses` counter. Consumption is a single conditional UPDATE so two
//! concurrent registrations cannot over-consume a single-use token.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sqlx::{PgPool, Row};
use tracing::{warn, Instrument};
use uuid::Uuid;

pub const DEFAULT_EXPIRES_IN_HOURS: i64 = 168;
pub const DEFAULT_MAX_USES: i32 = 1;

#[derive(Debug, Clone)]
pub struct InviteToken {
    pub id: Uuid,
    pub token: String,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub max_uses: i32,
    pub used_count: i32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why a token is (or is not) usable at a given instant. `Expired` and
/// `Exhausted` are derived, not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenUsability {
    Usable,
    Inactive,
    Expired,
    Exhausted,
}

impl InviteToken {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.used_count >= self.max_uses
    }

    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.usability(now) == TokenUsability::Usable
    }

    #[must_use]
    pub fn remaining_uses(&self) -> i32 {
        (self.max_uses - self.used_count).max(0)
    }

    /// Inactive wins over expired/exhausted: an explicitly deactivated token
    /// stays unusable no matter what the counters say.
    #[must_use]
    pub fn usability(&self, now: DateTime<Utc>) -> TokenUsability {
        if !self.is_active {
            TokenUsability::Inactive
        } else if self.is_expired(now) {
            TokenUsability::Expired
        } else if self.is_exhausted() {
            TokenUsability::Exhausted
        } else {
            TokenUsability::Usable
        }
    }
}

/// Generate an opaque token identifier: 32 random bytes, URL-safe base64.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// Expiry timestamp `hours` from `now`, or `None` when the lifetime does
/// not fit the representable time range.
#[must_use]
pub fn expiry_after_hours(now: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    Duration::try_hours(hours).and_then(|ttl| now.checked_add_signed(ttl))
}

fn token_from_row(row: &sqlx::postgres::PgRow) -> InviteToken {
    InviteToken {
        id: row.get("id"),
        token: row.get("token"),
        created_by: row.get("created_by"),
        expires_at: row.get("expires_at"),
        max_uses: row.get("max_uses"),
        used_count: row.get("used_count"),
        last_used_at: row.get("last_used_at"),
        is_active: row.get("is_active"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Persist a new invite token for `created_by`. The caller computes
/// `expires_at`, typically via [`expiry_after_hours`].
pub async fn create_token(
    pool: &PgPool,
    created_by: Uuid,
    expires_at: DateTime<Utc>,
    max_uses: i32,
    notes: Option<&str>,
) -> Result<InviteToken> {
    let token = generate_token();

    let query = r"
        INSERT INTO invite_tokens (token, created_by, expires_at, max_uses, notes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, token, created_by, expires_at, max_uses, used_count,
                  last_used_at, is_active, notes, created_at, updated_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(&token)
        .bind(created_by)
        .bind(expires_at)
        .bind(max_uses)
        .bind(notes)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert invite token")?;

    Ok(token_from_row(&row))
}

pub async fn token_details(pool: &PgPool, token: &str) -> Result<Option<InviteToken>> {
    let query = r"
        SELECT id, token, created_by, expires_at, max_uses, used_count,
               last_used_at, is_active, notes, created_at, updated_at
        FROM invite_tokens
        WHERE token = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup invite token")?;

    Ok(row.as_ref().map(token_from_row))
}

/// Fail-closed validation: absent, inactive, expired, or exhausted tokens
/// are unusable. Expired/exhausted tokens are deactivated on sight instead
/// of waiting for the cleanup sweep.
pub async fn validate_token(pool: &PgPool, token: &str) -> Result<bool> {
    let Some(invite) = token_details(pool, token).await? else {
        warn!("Invite token not found");
        return Ok(false);
    };

    match invite.usability(Utc::now()) {
        TokenUsability::Usable => Ok(true),
        TokenUsability::Inactive => {
            warn!("Invite token is inactive");
            Ok(false)
        }
        TokenUsability::Expired | TokenUsability::Exhausted => {
            warn!("Invite token expired or exhausted, deactivating");
            deactivate_token(pool, token).await?;
            Ok(false)
        }
    }
}

/// Consume one use of a token.
///
/// The increment, the `last_used_at` stamp, and the auto-deactivation on
/// reaching `max_uses` happen in one conditional UPDATE. The WHERE clause
/// rejects absent, inactive, and exhausted tokens, which also closes the
/// validate-then-consume race between concurrent registrations. Takes any
/// executor so registration can run it inside its transaction.
pub async fn mark_used<'e, E>(executor: E, token: &str) -> Result<bool>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = r"
        UPDATE invite_tokens
        SET used_count = used_count + 1,
            last_used_at = NOW(),
            is_active = (used_count + 1 < max_uses),
            updated_at = NOW()
        WHERE token = $1
          AND is_active
          AND used_count < max_uses
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(token)
        .execute(executor)
        .instrument(span)
        .await
        .context("failed to mark invite token used")?;

    Ok(result.rows_affected() > 0)
}

/// Deactivate regardless of counters; false when the token does not exist.
pub async fn deactivate_token(pool: &PgPool, token: &str) -> Result<bool> {
    let query = r"
        UPDATE invite_tokens
        SET is_active = FALSE, updated_at = NOW()
        WHERE token = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(token)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to deactivate invite token")?;

    Ok(result.rows_affected() > 0)
}

/// Delete tokens that are both expired and already inactive. Maintenance
/// only; never called on the request path.
pub async fn cleanup_expired_tokens(pool: &PgPool) -> Result<u64> {
    let query = r"
        DELETE FROM invite_tokens
        WHERE expires_at < NOW() AND NOT is_active
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to cleanup expired invite tokens")?;

    Ok(result.rows_affected())
}

/// Tokens created by `user_id`, newest first.
pub async fn tokens_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<InviteToken>> {
    let query = r"
        SELECT id, token, created_by, expires_at, max_uses, used_count,
               last_used_at, is_active, notes, created_at, updated_at
        FROM invite_tokens
        WHERE created_by = $1
        ORDER BY created_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list invite tokens")?;

    Ok(rows.iter().map(token_from_row).collect())
}

#[derive(Debug, Clone, Copy)]
pub struct UsageStats {
    pub total_tokens: i64,
    pub active_tokens: i64,
    pub expired_tokens: i64,
    pub used_tokens: i64,
}

pub async fn usage_stats(pool: &PgPool) -> Result<UsageStats> {
    let query = r"
        SELECT COUNT(*) AS total_tokens,
               COUNT(*) FILTER (WHERE is_active) AS active_tokens,
               COUNT(*) FILTER (WHERE expires_at < NOW()) AS expired_tokens,
               COUNT(*) FILTER (WHERE used_count > 0) AS used_tokens
        FROM invite_tokens
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to compute invite token stats")?;

    Ok(UsageStats {
        total_tokens: row.get("total_tokens"),
        active_tokens: row.get("active_tokens"),
        expired_tokens: row.get("expired_tokens"),
        used_tokens: row.get("used_tokens"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(max_uses: i32, used_count: i32, is_active: bool, ttl_hours: i64) -> InviteToken {
        let now = Utc::now();
        InviteToken {
            id: Uuid::new_v4(),
            token: generate_token(),
            created_by: Uuid::new_v4(),
            expires_at: now + Duration::hours(ttl_hours),
            max_uses,
            used_count,
            last_used_at: None,
            is_active,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_fresh_token_is_usable() {
        let invite = token(1, 0, true, DEFAULT_EXPIRES_IN_HOURS);
        let now = Utc::now();
        assert!(invite.is_valid(now));
        assert_eq!(invite.usability(now), TokenUsability::Usable);
        assert_eq!(invite.remaining_uses(), 1);
    }

    #[test]
    fn test_exhausted_token_is_not_usable() {
        let invite = token(1, 1, true, 1);
        let now = Utc::now();
        assert!(invite.is_exhausted());
        assert!(!invite.is_valid(now));
        assert_eq!(invite.usability(now), TokenUsability::Exhausted);
        assert_eq!(invite.remaining_uses(), 0);
    }

    #[test]
    fn test_expired_token_is_not_usable_regardless_of_active_flag() {
        let invite = token(5, 0, true, -1);
        let now = Utc::now();
        assert!(invite.is_expired(now));
        assert!(!invite.is_valid(now));
        assert_eq!(invite.usability(now), TokenUsability::Expired);
    }

    #[test]
    fn test_exhausted_wins_even_when_active_flag_is_set() {
        // A stale active flag must not make an exhausted token usable.
        let invite = token(3, 3, true, 24);
        assert!(!invite.is_valid(Utc::now()));
    }

    #[test]
    fn test_deactivated_token_is_inactive() {
        let invite = token(5, 1, false, 24);
        let now = Utc::now();
        assert_eq!(invite.usability(now), TokenUsability::Inactive);
        assert!(!invite.is_valid(now));
    }

    #[test]
    fn test_inactive_wins_over_expired() {
        let invite = token(1, 1, false, -1);
        assert_eq!(invite.usability(Utc::now()), TokenUsability::Inactive);
    }

    #[test]
    fn test_remaining_uses_never_negative() {
        let invite = token(1, 3, true, 24);
        assert_eq!(invite.remaining_uses(), 0);
    }

    #[test]
    fn test_multi_use_token_partial_consumption() {
        let invite = token(5, 3, true, 24);
        let now = Utc::now();
        assert!(invite.is_valid(now));
        assert_eq!(invite.remaining_uses(), 2);
    }

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        // 32 bytes -> 43 chars of unpadded URL-safe base64
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_generate_token_unique() {
        let first = generate_token();
        let second = generate_token();
        assert_ne!(first, second);
    }

    #[test]
    fn test_expiry_after_hours() {
        let now = Utc::now();
        let expiry = expiry_after_hours(now, DEFAULT_EXPIRES_IN_HOURS).unwrap();
        assert_eq!(expiry - now, Duration::hours(DEFAULT_EXPIRES_IN_HOURS));
    }

    #[test]
    fn test_expiry_after_hours_rejects_overflow() {
        let now = Utc::now();
        assert!(expiry_after_hours(now, i64::MAX).is_none());
        assert!(expiry_after_hours(now, i64::MIN).is_none());
    }
}
