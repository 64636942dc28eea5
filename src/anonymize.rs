use sha2::{Digest, Sha256};

/// Width of an anonymized identifier, in hex characters.
pub const ANONYMIZED_ID_LEN: usize = 16;

/// Hashes an identifying string (an author's display name) to an opaque id.
///
/// Deterministic across runs, so the same person gets the same id in every
/// file and repository.
pub fn anonymize_id(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..ANONYMIZED_ID_LEN].to_string()
}

/// Removes characters that must not reach the corpus (the bell character).
pub fn normalize_string(s: &str) -> String {
    s.replace('\u{7}', "")
}
