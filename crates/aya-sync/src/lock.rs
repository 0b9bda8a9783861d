use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministically maps a worker name to the 64-bit advisory lock id used
/// to single-leader it across replicas.
///
/// `DefaultHasher::new()` starts from fixed (non-randomized) keys, so the
/// same name always hashes to the same id across processes and restarts,
/// unlike `HashMap`'s per-process `RandomState`, which would make the lock
/// id unstable between replicas.
pub fn lock_id_for(worker_name: &str) -> i64 {
    let mut hasher = DefaultHasher::new();
    worker_name.hash(&mut hasher);
    hasher.finish() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_hashes_to_same_id() {
        assert_eq!(lock_id_for("youtube.full_sync"), lock_id_for("youtube.full_sync"));
    }

    #[test]
    fn different_names_hash_differently() {
        assert_ne!(lock_id_for("youtube.full_sync"), lock_id_for("github.resource_sync"));
    }
}
