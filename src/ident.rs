//! Deterministic node identifier allocation.
//!
//! Identifiers double as the inode numbers exposed to the protocol adapter,
//! so they must be stable across process restarts without a persisted table.
//! They are therefore a pure function of `(parent identifier, name)`: the
//! same name under the same parent always hashes to the same identifier,
//! and different inputs collide only with overwhelming improbability.
//!
//! Rename never reallocates: a node keeps the identifier it was created
//! with even after its name or parent changes.

/// Identifier reserved for the volume root.
pub const ROOT_IDENT: u64 = 0;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Derive the identifier for a child node from its parent's identifier and
/// its own name.
///
/// This is a pure function (64-bit FNV-1a over the parent identifier bytes
/// followed by the name bytes) with no external state. The root identifier
/// is reserved and never returned.
pub fn allocate(parent_ident: u64, name: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in parent_ident.to_le_bytes() {
        hash = (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME);
    }
    for byte in name.as_bytes() {
        hash = (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME);
    }

    if hash == ROOT_IDENT {
        FNV_OFFSET
    } else {
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_deterministic() {
        assert_eq!(allocate(ROOT_IDENT, "foo"), allocate(ROOT_IDENT, "foo"));
        assert_eq!(allocate(42, "bar"), allocate(42, "bar"));
    }

    #[test]
    fn test_allocate_differs_by_name() {
        assert_ne!(allocate(ROOT_IDENT, "foo"), allocate(ROOT_IDENT, "bar"));
    }

    #[test]
    fn test_allocate_differs_by_parent() {
        let under_a = allocate(allocate(ROOT_IDENT, "a"), "child");
        let under_b = allocate(allocate(ROOT_IDENT, "b"), "child");
        assert_ne!(under_a, under_b);
    }

    #[test]
    fn test_allocate_never_returns_root_ident() {
        for name in ["", "a", "docs", "readme.txt", "深い"] {
            assert_ne!(allocate(ROOT_IDENT, name), ROOT_IDENT);
            assert_ne!(allocate(u64::MAX, name), ROOT_IDENT);
        }
    }

    #[test]
    fn test_allocate_spreads_across_siblings() {
        let parent = allocate(ROOT_IDENT, "dir");
        let mut seen = std::collections::HashSet::new();
        for i in 0..1000 {
            assert!(seen.insert(allocate(parent, &format!("file{}", i))));
        }
    }
}
