//! Stable hashes used to derive generated reaction ids
use std::hash::{DefaultHasher, Hash, Hasher};

/// Hash of a value with the fixed-key default hasher, identical between runs
pub(crate) fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Lowercase hexadecimal form of [`stable_hash`]
pub(crate) fn hash_as_hex_string<T: Hash + ?Sized>(value: &T) -> String {
    format!("{:x}", stable_hash(value))
}
