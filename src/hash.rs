use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

/// Hash whatever `f` feeds into a fresh hasher.
pub fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}
