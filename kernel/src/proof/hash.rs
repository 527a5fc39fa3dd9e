//! Canonical hashing: SHA-256 with typed domain separation.
//!
//! **Exactly one place defines canonical hashing.** Every digest that ends up
//! in a commitment, manifest, fingerprint, or artifact is produced by
//! [`canonical_hash`].

use sha2::{Digest, Sha256};

pub use super::hash_domain::HashDomain;

/// The only algorithm this workspace produces or accepts.
pub const HASH_ALGORITHM: &str = "sha256";

/// A content-addressed hash with algorithm identifier.
///
/// Format: `"algorithm:hex_digest"` (e.g., `"sha256:abcdef..."`)
///
/// Invariant: the inner string always contains exactly one `:` separator,
/// with non-empty substrings on both sides (enforced by [`ContentHash::parse`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash {
    /// Full string in `"algorithm:hex_digest"` format.
    full: String,
    /// Byte offset of the `:` separator (cached from parse).
    colon: usize,
}

impl ContentHash {
    /// Parse from `"algorithm:hex"` format.
    ///
    /// Returns `None` if the format is invalid (missing colon,
    /// empty algorithm, or empty digest).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let colon = s.find(':')?;
        if colon == 0 || colon == s.len() - 1 || s[colon + 1..].contains(':') {
            return None;
        }
        Some(Self {
            full: s.to_string(),
            colon,
        })
    }

    /// Parse and additionally require a full-length lowercase `sha256` digest.
    #[must_use]
    pub fn parse_sha256(s: &str) -> Option<Self> {
        let hash = Self::parse(s)?;
        let digest = hash.hex_digest();
        let well_formed = hash.algorithm() == HASH_ALGORITHM
            && digest.len() == 64
            && digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then_some(hash)
    }

    /// The algorithm portion (e.g., "sha256").
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.full[..self.colon]
    }

    /// The hex digest portion.
    #[must_use]
    pub fn hex_digest(&self) -> &str {
        &self.full[self.colon + 1..]
    }

    /// First 16 hex characters of the digest (the published short form).
    #[must_use]
    pub fn short(&self) -> &str {
        let digest = self.hex_digest();
        &digest[..digest.len().min(16)]
    }

    /// The full string representation (`"algorithm:hex_digest"`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full)
    }
}

/// Compute the canonical hash of a byte slice with domain separation.
///
/// Formula: `sha256(domain_bytes || data)`, rendered `"sha256:<hex>"`.
#[must_use]
pub fn canonical_hash(domain: HashDomain, data: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update(data);
    let hex_digest = hex::encode(hasher.finalize());
    ContentHash {
        colon: HASH_ALGORITHM.len(),
        full: format!("{HASH_ALGORITHM}:{hex_digest}"),
    }
}

/// Plain SHA-256 of raw bytes (no domain prefix), rendered `"sha256:<hex>"`.
///
/// Used only for identities defined outside this workspace, such as the
/// bytes of an executable image.
#[must_use]
pub fn raw_sha256(data: &[u8]) -> ContentHash {
    let hex_digest = hex::encode(Sha256::digest(data));
    ContentHash {
        colon: HASH_ALGORITHM.len(),
        full: format!("{HASH_ALGORITHM}:{hex_digest}"),
    }
}
