//! Content fingerprints
//!
//! A record's fingerprint is the deduplication key in the store. It is the
//! SHA-256 of the ordered tokens concatenated without a separator, hex encoded.
//! Matching is exact: any change in order, case or whitespace yields a new
//! fingerprint.

use sha2::{Digest, Sha256};

/// Computes the hex-encoded SHA-256 fingerprint of an ordered token list
///
/// # Example
///
/// ```
/// use missing_persons::fingerprint;
///
/// let tokens = vec!["Jane".to_string(), "Doe".to_string(), "1990".to_string()];
/// assert_eq!(fingerprint(&tokens), fingerprint(&tokens));
/// assert_eq!(fingerprint(&tokens).len(), 64);
/// ```
pub fn fingerprint<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut hasher = Sha256::new();
    for token in tokens {
        hasher.update(token.as_ref().as_bytes());
    }
    hex::encode(hasher.finalize())
}
