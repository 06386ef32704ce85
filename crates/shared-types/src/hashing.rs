//! SHA3-256 hashing helpers.

use crate::identifiers::{HashValue, HASH_SIZE};
use rand::RngCore;
use sha3::{Digest, Sha3_256};

/// Hash the concatenation of `parts`.
pub fn hash_data(parts: &[&[u8]]) -> HashValue {
    let mut hasher = Sha3_256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&hasher.finalize());
    HashValue(out)
}

/// Hash of fresh random bytes. Test fixtures only.
pub fn random_hash() -> HashValue {
    let mut seed = [0u8; HASH_SIZE];
    rand::thread_rng().fill_bytes(&mut seed);
    hash_data(&[&seed])
}
