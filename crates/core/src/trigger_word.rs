//! Trigger word generation and safety screening.
//!
//! A trigger word is a unique token embedded in prompts to invoke a
//! user's trained personalization weights. It must be distinctive enough
//! that the base model has no prior association with it, and must not
//! accidentally spell anything objectionable.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::error::CoreError;

/// Fixed prefix shared by all trigger words.
const TRIGGER_PREFIX: &str = "TOK";

/// Length of the random suffix.
const SUFFIX_LEN: usize = 5;

/// Suffix alphabet. Vowels are excluded so generated tokens cannot spell
/// real words; `0`, `1`, `I`, and `O` are excluded as visually ambiguous.
const SUFFIX_ALPHABET: &[u8] = b"BCDFGHJKLMNPQRSTVWXZ23456789";

/// Fragments that must not appear anywhere in a candidate, even with the
/// vowel-free alphabet.
const BLOCKLIST: &[&str] = &["FCK", "FKK", "SHT", "CNT", "WTF", "KKK", "SS2"];

/// Maximum regeneration attempts before giving up.
const MAX_ATTEMPTS: usize = 16;

/// Shape every trigger word must match.
static TRIGGER_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^TOK[BCDFGHJKLMNPQRSTVWXZ2-9]{5}$").expect("trigger shape regex is valid")
});

/// Check a candidate trigger word: correct shape, no blocklisted fragment.
pub fn is_safe(word: &str) -> bool {
    if !TRIGGER_SHAPE.is_match(word) {
        return false;
    }
    !BLOCKLIST.iter().any(|fragment| word.contains(fragment))
}

/// Generate a safety-checked trigger word, e.g. `TOKX7RQM`.
///
/// Uniqueness across users is enforced by the database, not here; the
/// random space is large enough that retrying on a unique-constraint
/// violation is the caller's whole collision strategy.
pub fn generate() -> Result<String, CoreError> {
    let mut rng = rand::rng();

    for _ in 0..MAX_ATTEMPTS {
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect();
        let candidate = format!("{TRIGGER_PREFIX}{suffix}");

        if is_safe(&candidate) {
            return Ok(candidate);
        }
    }

    // With a 7-fragment blocklist over a 28-character alphabet this is
    // effectively unreachable, but the loop must terminate.
    Err(CoreError::Internal(
        "Failed to generate a safe trigger word".to_string(),
    ))
}
