//! Mailbox syntax checks for MAIL FROM and RCPT TO arguments
//!
//! These are syntax checks only. Nothing here resolves domains or verifies deliverability.

use regex::Regex;
use std::sync::LazyLock;

static MAILBOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[_a-z0-9+-]+(\.[_a-z0-9+-]+)*@[a-z0-9-]+(\.[a-z0-9-]+)*(\.[a-z]{2,4})$")
        .expect("mailbox pattern is valid")
});

static IP_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(.*)@\[.*\]").expect("ip literal pattern is valid"));

static POSTMASTER_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)postmaster@\[.*\]").expect("postmaster pattern is valid")
});

/// Check an address against the `local@domain.tld` form, ignoring case
pub fn is_valid_address(addr: &str) -> bool {
    MAILBOX.is_match(&addr.to_lowercase())
}

/// Check for an address at a bracketed domain literal, e.g. `user@[10.0.0.1]`
pub fn is_ip_literal(addr: &str) -> bool {
    IP_LITERAL.is_match(addr)
}

/// Check for the postmaster of a bracketed domain literal, e.g. `postmaster@[10.0.0.1]`
pub fn is_postmaster_literal(addr: &str) -> bool {
    POSTMASTER_LITERAL.is_match(addr)
}

/// Whether a MAIL FROM argument is accepted.
///
/// Any non-empty sender passes, so the literal and syntax checks never decide the outcome.
/// Only the empty reverse path is rejected.
pub fn accepts_sender(addr: &str) -> bool {
    is_ip_literal(addr) || !addr.is_empty() || is_valid_address(addr)
}

/// Whether a RCPT TO argument is accepted
pub fn accepts_recipient(addr: &str) -> bool {
    is_postmaster_literal(addr) || is_valid_address(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_address("user.name+tag@sub.domain.com"));
        assert!(is_valid_address("a@b.com"));
        assert!(is_valid_address("USER@EXAMPLE.ORG"));
        assert!(is_valid_address("first_last-1@mail-relay.example.info"));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(!is_valid_address("not-an-email"));
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("@example.com"));
        assert!(!is_valid_address("user@"));
        assert!(!is_valid_address("user@example"));
        assert!(!is_valid_address("user@example.museum"));
        assert!(!is_valid_address("user@@example.com"));
        assert!(!is_valid_address("user..name@example.com"));
        assert!(!is_valid_address("user@[127.0.0.1]"));
    }

    #[test]
    fn test_ip_literals() {
        assert!(is_ip_literal("user@[127.0.0.1]"));
        assert!(is_ip_literal("@[::1]"));
        assert!(!is_ip_literal("user@127.0.0.1"));

        assert!(is_postmaster_literal("postmaster@[192.168.0.1]"));
        assert!(is_postmaster_literal("PostMaster@[192.168.0.1]"));
        assert!(!is_postmaster_literal("admin@[192.168.0.1]"));
    }

    #[test]
    fn test_sender_acceptance_is_permissive() {
        assert!(accepts_sender("a@b.com"));
        assert!(accepts_sender("not-an-email"));
        assert!(accepts_sender("user@[10.0.0.1]"));
        assert!(!accepts_sender(""));
    }

    #[test]
    fn test_recipient_acceptance() {
        assert!(accepts_recipient("c@d.com"));
        assert!(accepts_recipient("postmaster@[10.0.0.1]"));
        assert!(!accepts_recipient("user@[10.0.0.1]"));
        assert!(!accepts_recipient("not-an-email"));
        assert!(!accepts_recipient(""));
    }
}
