//! Utility types.

use crate::grammar::TerminalID;
use std::{
    fmt,
    hash::{Hash, Hasher},
};

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;

/// A set of terminal symbols backed by a bit set.
#[derive(Default, Clone)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw().into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw().into())
    }
    /// Add all elements of `other`, returning whether this set has grown.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let before = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != before
    }
    pub fn is_superset(&self, other: &Self) -> bool {
        self.inner.is_superset(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .filter_map(|raw| u16::try_from(raw).ok().map(TerminalID::from_raw))
    }
}

impl fmt::Debug for TerminalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// Equality and hashing only depend on the elements, not on the capacity of
// the underlying bit vector.
impl PartialEq for TerminalSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}
impl Eq for TerminalSet {}

impl Hash for TerminalSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for id in self.iter() {
            id.hash(state);
        }
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}

impl Extend<TerminalID> for TerminalSet {
    fn extend<I: IntoIterator<Item = TerminalID>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}
