//! # Payment Reference Validation
//!
//! Classifies a payment reference as secure (backend-minted), legacy
//! (deprecated client-minted), or invalid. Classification is total and
//! deterministic: every string maps to exactly one kind.
//!
//! Legacy references remain functionally accepted for backward compatibility
//! during migration; encountering one during verification emits a
//! deprecation-tracking monitoring record (see the reconciler), not a
//! rejection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Secure references: `txn_<unix-seconds>_<uuid-v4>`.
const SECURE_PREFIX: &str = "txn_";
/// Legacy references: `pay_<unix-seconds>_<6-12 alphanumerics>`.
const LEGACY_PREFIX: &str = "pay_";

/// Classification of a payment reference string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Platform-generated transactional id
    Secure,
    /// Deprecated client-generated id, accepted during migration
    Legacy,
    /// Anything else, including the empty string
    Invalid,
}

impl ReferenceKind {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

/// Classify a reference into exactly one of secure, legacy, or invalid.
pub fn classify_reference(reference: &str) -> ReferenceKind {
    if let Some(rest) = reference.strip_prefix(SECURE_PREFIX) {
        if let Some((timestamp, id)) = rest.split_once('_') {
            if is_timestamp(timestamp) && is_hyphenated_uuid(id) {
                return ReferenceKind::Secure;
            }
        }
        return ReferenceKind::Invalid;
    }

    if let Some(rest) = reference.strip_prefix(LEGACY_PREFIX) {
        if let Some((timestamp, suffix)) = rest.split_once('_') {
            if is_timestamp(timestamp) && is_legacy_suffix(suffix) {
                return ReferenceKind::Legacy;
            }
        }
        return ReferenceKind::Invalid;
    }

    ReferenceKind::Invalid
}

/// True for secure or legacy references, false for invalid or empty ones.
pub fn is_valid_reference(reference: &str) -> bool {
    classify_reference(reference).is_valid()
}

/// Mint a fresh secure reference.
///
/// Crate-private on purpose: only the reconciler's initialize path mints
/// references; arbitrary UI code never constructs them.
pub(crate) fn mint_reference() -> String {
    format!(
        "{}{}_{}",
        SECURE_PREFIX,
        chrono::Utc::now().timestamp(),
        Uuid::new_v4()
    )
}

fn is_timestamp(s: &str) -> bool {
    !s.is_empty() && s.len() <= 12 && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_hyphenated_uuid(s: &str) -> bool {
    s.len() == 36 && Uuid::try_parse(s).is_ok()
}

fn is_legacy_suffix(s: &str) -> bool {
    (6..=12).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_reference_classifies_secure() {
        let reference = "txn_1690000000_6b46b1ae-24d5-4a53-9a32-9042e7c52a3e";
        assert_eq!(classify_reference(reference), ReferenceKind::Secure);
        assert!(is_valid_reference(reference));
    }

    #[test]
    fn test_legacy_reference_classifies_legacy() {
        assert_eq!(
            classify_reference("pay_1690000000_abc123"),
            ReferenceKind::Legacy
        );
        assert!(is_valid_reference("pay_1690000000_abc123"));
    }

    #[test]
    fn test_invalid_references() {
        for reference in [
            "",
            "txn_",
            "txn_1690000000_",
            "txn_1690000000_not-a-uuid",
            "txn_notadigit_6b46b1ae-24d5-4a53-9a32-9042e7c52a3e",
            "pay_1690000000_ab",                // suffix too short
            "pay_1690000000_abcdef0123456789", // suffix too long
            "pay_1690000000_abc-12",           // suffix not alphanumeric
            "ref_1690000000_abc123",
            "completely wrong",
        ] {
            assert_eq!(
                classify_reference(reference),
                ReferenceKind::Invalid,
                "expected {reference:?} to be invalid"
            );
            assert!(!is_valid_reference(reference));
        }
    }

    #[test]
    fn test_minted_reference_round_trips_as_secure() {
        for _ in 0..32 {
            let reference = mint_reference();
            assert_eq!(
                classify_reference(&reference),
                ReferenceKind::Secure,
                "minted reference {reference:?} must classify secure"
            );
        }
    }

    #[test]
    fn test_classification_is_total_on_arbitrary_bytes() {
        // No panic on odd input; every string maps to exactly one kind.
        for reference in ["txn_\u{1f4b8}_x", "pay_1_\u{0}\u{0}\u{0}\u{0}\u{0}\u{0}", "_", "__"] {
            let _ = classify_reference(reference);
        }
    }
}
