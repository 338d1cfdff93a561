//! Object hashing and key identifiers.

use sha2::{Digest, Sha256};

use crate::types::{Entry, PublicKey};

/// Length of a key id in raw bytes before hex encoding.
const KEY_ID_LEN: usize = 8;

/// SHA-256 over a canonical byte encoding. Used for the per-index entry
/// hash chain and for log leaf identity hashes.
pub fn object_hash(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(bytes));
    out
}

/// Key id: hex of the first 8 bytes of the SHA-256 of the key's canonical
/// encoding. Signature maps in [`crate::types::SignedKv`] are keyed by this.
pub fn key_id(key: &PublicKey) -> String {
    let digest = object_hash(&key.to_canonical_bytes());
    hex::encode(&digest[..KEY_ID_LEN])
}

impl Entry {
    /// Object hash of this entry; the successor entry must carry it in
    /// `previous`.
    pub fn object_hash(&self) -> [u8; 32] {
        object_hash(&self.to_canonical_bytes())
    }
}
