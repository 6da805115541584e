use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Position of a shard within an object's `k + m` slots.
///
/// Indices below `k` are data shards, the rest are parity shards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardIndex(u32);

impl ShardIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` if this index addresses a data shard for a profile with
    /// `k` data shards.
    pub fn is_data(self, k: u32) -> bool {
        self.0 < k
    }
}

impl fmt::Display for ShardIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ShardIndex {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

/// Ordered set of shard indices.
///
/// The erasure code tool takes these as a comma-separated list; see
/// [`ShardSet::to_tool_arg`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSet(BTreeSet<ShardIndex>);

impl ShardSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dense set `0..count`.
    pub fn dense(count: u32) -> Self {
        Self::range(0..count)
    }

    /// Every index in `range`.
    pub fn range(range: Range<u32>) -> Self {
        Self(range.map(ShardIndex::new).collect())
    }

    pub fn insert(&mut self, index: ShardIndex) -> bool {
        self.0.insert(index)
    }

    pub fn contains(&self, index: ShardIndex) -> bool {
        self.0.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ShardIndex> + '_ {
        self.0.iter().copied()
    }

    /// Comma-joined form, e.g. `0,1,2,3,4,5`.
    pub fn to_tool_arg(&self) -> String {
        self.0
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromIterator<ShardIndex> for ShardSet {
    fn from_iter<I: IntoIterator<Item = ShardIndex>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One shard slot of an erasure-coded object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ShardSlot {
    /// No node has contributed this shard yet.
    #[default]
    Absent,
    /// Shard bytes as read from the node that holds it.
    Present(Bytes),
}

impl ShardSlot {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Present(b) => Some(b),
            Self::Absent => None,
        }
    }
}
