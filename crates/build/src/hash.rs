use serde::Serialize;
use std::hash::BuildHasher;

/// Fixed seeds so that a name hashes identically across rebuilds of one process
///
/// The values are not portable: ahash output may differ between crate versions
/// and target platforms, so hashes must not be persisted or shared across builds.
const SEEDS: [u64; 4] = [0x243f_6a88_85a3_08d3, 0x1319_8a2e_0370_7344, 0xa409_3822_299f_31d0, 0x082e_fa98_ec4e_6c89];

/// Hash of a resource, field or render target name, stable within one build of the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NameHash(pub u64);

impl NameHash {
    pub fn of(name: &str) -> Self {
        let state = ahash::RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3]);
        Self(state.hash_one(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_hash_is_stable() {
        assert_eq!(NameHash::of("FrameConstants"), NameHash::of("FrameConstants"));
        assert_ne!(NameHash::of("FrameConstants"), NameHash::of("ObjectConstants"));
    }
}
