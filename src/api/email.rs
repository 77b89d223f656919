//! Email validation helpers shared by registration and subscription.

use regex::Regex;

/// Domains flagged as temporary/throwaway mail providers. Kept sorted so
/// membership checks can binary search.
const DISPOSABLE_DOMAINS: &[&str] = &[
    "10minutemail.com",
    "33mail.com",
    "anonbox.net",
    "burnermail.io",
    "dispostable.com",
    "emailondeck.com",
    "fakeinbox.com",
    "getairmail.com",
    "getnada.com",
    "guerrillamail.com",
    "guerrillamail.net",
    "inboxkitten.com",
    "mail-temp.com",
    "mail.tm",
    "mailcatch.com",
    "maildrop.cc",
    "mailinator.com",
    "mailnesia.com",
    "mintemail.com",
    "mohmal.com",
    "mytemp.email",
    "sharklasers.com",
    "spamgourmet.com",
    "temp-mail.org",
    "tempail.com",
    "tempmail.dev",
    "tempmailo.com",
    "throwawaymail.com",
    "trashmail.com",
    "trashmail.de",
    "yopmail.com",
    "yopmail.fr",
];

/// Normalize an email for lookup/uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// True when the email's domain is a known disposable mail provider.
pub fn is_disposable_email(email: &str) -> bool {
    let Some(domain) = email.rsplit('@').next().filter(|d| !d.is_empty()) else {
        return false;
    };
    let domain = domain.trim().to_lowercase();
    DISPOSABLE_DOMAINS.binary_search(&domain.as_str()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposable_domains_sorted() {
        let mut sorted = DISPOSABLE_DOMAINS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, DISPOSABLE_DOMAINS, "blocklist must stay sorted");
    }

    #[test]
    fn test_valid_email() {
        assert!(valid_email("user@example.com"));
        assert!(valid_email("first.last+tag@sub.example.org"));
        assert!(!valid_email("no-at-sign.example.com"));
        assert!(!valid_email("user@nodot"));
        assert!(!valid_email("user with space@example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  User@Example.COM  "), "user@example.com");
    }

    #[test]
    fn test_is_disposable_email() {
        assert!(is_disposable_email("anyone@mailinator.com"));
        assert!(is_disposable_email("anyone@MAILINATOR.com"));
        assert!(is_disposable_email("x@yopmail.fr"));
        assert!(!is_disposable_email("user@example.com"));
        assert!(!is_disposable_email("user@gmail.com"));
        assert!(!is_disposable_email("no-at-sign"));
    }
}
