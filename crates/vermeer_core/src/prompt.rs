//! Prompt normalization and content-addressable hashing.
//!
//! The normalized form is the identity of a prompt: two prompts that differ
//! only in Unicode representation, case, or whitespace collapse to the same
//! hash and therefore the same ledger record.

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Maximum accepted prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize = 2000;

/// Normalize prompt text for consistent hashing.
///
/// NFKC-normalizes, lowercases, trims, and collapses internal whitespace
/// runs to a single space. Idempotent: normalizing a normalized string is a
/// no-op.
///
/// # Examples
///
/// ```
/// use vermeer_core::normalize_prompt;
///
/// assert_eq!(normalize_prompt("  A Cat  On A Mat "), "a cat on a mat");
/// ```
pub fn normalize_prompt(prompt: &str) -> String {
    let folded: String = prompt.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// SHA-256 hex digest of the normalized prompt text.
pub fn hash_prompt(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_prompt(prompt).as_bytes());
    format!("{:x}", hasher.finalize())
}
