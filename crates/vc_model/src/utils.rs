//! Hash containers used by the registry and the sessions.
//!
//! Based on *hashbrown* with *foldhash*, seeded with a fixed value so
//! iteration order of session tables does not change between runs.

use core::any::TypeId;
use core::hash::{BuildHasher, Hasher};

use foldhash::fast::{FixedState, FoldHasher};
use hashbrown::hash_map::Entry;

// -----------------------------------------------------------------------------
// Hashers

const FIXED_HASH_STATE: FixedState = FixedState::with_seed(0x5D1C_07A3_E2B4_9F61);

/// Fixed-seed `foldhash` state.
#[derive(Copy, Clone, Default, Debug)]
pub struct FixedHashState;

impl BuildHasher for FixedHashState {
    type Hasher = FoldHasher<'static>;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        FIXED_HASH_STATE.build_hasher()
    }
}

/// Passes an already well distributed `u64` through unchanged.
///
/// Used for [`TypeId`] keys and object identities (addresses).
#[derive(Copy, Clone, Default, Debug)]
pub struct NoOpHasher {
    hash: u64,
}

impl Hasher for NoOpHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes.iter().rev() {
            self.hash = self.hash.rotate_left(8).wrapping_add(*byte as u64);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash = i;
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        // Addresses are aligned, the low bits carry no information.
        self.hash = (i as u64).rotate_right(4);
    }
}

/// Builds [`NoOpHasher`].
#[derive(Copy, Clone, Default, Debug)]
pub struct NoOpHashState;

impl BuildHasher for NoOpHashState {
    type Hasher = NoOpHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        NoOpHasher { hash: 0 }
    }
}

/// `hashbrown` map with the fixed `foldhash` state.
pub type HashMap<K, V> = hashbrown::HashMap<K, V, FixedHashState>;

/// `hashbrown` set with the fixed `foldhash` state.
pub type HashSet<K> = hashbrown::HashSet<K, FixedHashState>;

/// Map keyed by object identity (the address of a shared allocation).
pub type IdentityMap<V> = hashbrown::HashMap<usize, V, NoOpHashState>;

// -----------------------------------------------------------------------------
// TypeIdMap

/// A map with [`TypeId`] as the fixed key type.
pub struct TypeIdMap<V>(hashbrown::HashMap<TypeId, V, NoOpHashState>);

impl<V> TypeIdMap<V> {
    /// Creates an empty map.
    #[inline]
    pub const fn new() -> Self {
        Self(hashbrown::HashMap::with_hasher(NoOpHashState))
    }

    /// Returns the value stored for `type_id`, inserting the result of `f`
    /// when the key is vacant.
    ///
    /// `f` is only called when the key is not present, so the value that
    /// was inserted first is the one every caller observes.
    #[inline]
    pub fn get_or_insert(&mut self, type_id: TypeId, f: impl FnOnce() -> V) -> &mut V {
        match self.0.entry(type_id) {
            Entry::Vacant(entry) => entry.insert(f()),
            Entry::Occupied(entry) => entry.into_mut(),
        }
    }

    #[inline]
    pub fn get(&self, type_id: &TypeId) -> Option<&V> {
        self.0.get(type_id)
    }

    #[inline]
    pub fn insert(&mut self, type_id: TypeId, value: V) -> Option<V> {
        self.0.insert(type_id, value)
    }

    #[inline]
    pub fn contains(&self, type_id: &TypeId) -> bool {
        self.0.contains_key(type_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Values in arbitrary order.
    #[inline]
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.0.values()
    }
}

impl<V> Default for TypeIdMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use core::any::TypeId;
    use core::hash::{BuildHasher, Hash, Hasher};

    use super::{FixedHashState, NoOpHashState, TypeIdMap};

    #[test]
    fn first_insert_wins() {
        let mut map = TypeIdMap::<&str>::new();
        assert_eq!(*map.get_or_insert(TypeId::of::<u8>(), || "first"), "first");
        assert_eq!(*map.get_or_insert(TypeId::of::<u8>(), || "second"), "first");
        assert_eq!(map.len(), 1);
        assert!(map.contains(&TypeId::of::<u8>()));
        assert!(!map.contains(&TypeId::of::<u16>()));
    }

    #[test]
    fn fixed_hash_is_stable() {
        let hash = |v: u32| {
            let mut hasher = FixedHashState.build_hasher();
            v.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(7), hash(7));
        assert_ne!(hash(7), hash(8));
    }

    #[test]
    fn no_op_hash_passes_u64() {
        let mut hasher = NoOpHashState.build_hasher();
        hasher.write_u64(42);
        assert_eq!(hasher.finish(), 42);
    }
}
