//! Core types shared between the [`CommitStore`](crate::CommitStore) trait
//! and the OT engine.
//!
//! [`Commit`] is generic over the id and diff types: the engine treats both as
//! opaque. [`CommitId`] is the id used by [`MemoryStore`](crate::MemoryStore).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// CommitId
// ---------------------------------------------------------------------------

/// A content-addressed commit identifier (SHA-256, 32 bytes).
///
/// Displays as 64 lowercase hex characters; `{:#}` prints the first 12 only.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId([u8; 32]);

impl CommitId {
    /// Create a `CommitId` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = if f.alternate() { &self.0[..6] } else { &self.0[..] };
        for byte in bytes {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitId({self:#})")
    }
}

impl FromStr for CommitId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| IdParseError {
            value: s.to_owned(),
            reason,
        };
        if s.len() != 64 {
            return Err(invalid(format!(
                "expected 64 hex characters, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (slot, pair) in bytes.iter_mut().zip(s.as_bytes().chunks_exact(2)) {
            let (Some(hi), Some(lo)) = (nibble(pair[0]), nibble(pair[1])) else {
                let pair = String::from_utf8_lossy(pair);
                return Err(invalid(format!("invalid hex pair '{pair}'")));
            };
            *slot = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

fn nibble(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

impl Serialize for CommitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CommitId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error from parsing a hex string into a [`CommitId`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdParseError {
    /// The raw value that failed.
    pub value: String,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid commit id {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for IdParseError {}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// An immutable node of the commit graph.
///
/// Each parent maps to the diffs that lead from that parent's state to this
/// commit's state. A commit with no parents is a root. `order` is strictly
/// greater than every parent's order, so sorting by descending order always
/// visits children before parents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit<K: Ord, D> {
    id: K,
    parents: BTreeMap<K, Vec<D>>,
    order: u64,
    #[serde(default)]
    snapshot: bool,
    #[serde(default)]
    timestamp: u64,
}

impl<K: Ord, D> Commit<K, D> {
    /// Build a commit. The snapshot flag starts cleared and the timestamp at 0.
    #[must_use]
    pub const fn new(id: K, parents: BTreeMap<K, Vec<D>>, order: u64) -> Self {
        Self {
            id,
            parents,
            order,
            snapshot: false,
            timestamp: 0,
        }
    }

    /// Build a root commit (no parents).
    #[must_use]
    pub const fn root(id: K) -> Self {
        Self::new(id, BTreeMap::new(), 0)
    }

    /// Set the snapshot flag.
    #[must_use]
    pub const fn with_snapshot(mut self, snapshot: bool) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Set the creation timestamp (milliseconds since the Unix epoch).
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The commit id.
    #[must_use]
    pub const fn id(&self) -> &K {
        &self.id
    }

    /// Parent ids mapped to the diffs from each parent to this commit.
    #[must_use]
    pub const fn parents(&self) -> &BTreeMap<K, Vec<D>> {
        &self.parents
    }

    /// Iterate over parent ids in ascending order.
    pub fn parent_ids(&self) -> impl Iterator<Item = &K> {
        self.parents.keys()
    }

    /// The commit's position in the graph's partial order.
    #[must_use]
    pub const fn order(&self) -> u64 {
        self.order
    }

    /// Whether the store holds a snapshot for this commit.
    #[must_use]
    pub const fn is_snapshot(&self) -> bool {
        self.snapshot
    }

    /// Creation time in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// `true` if the commit has no parents.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

impl<K: Ord + Clone, D> Commit<K, D> {
    /// Parent ids collected into a set.
    #[must_use]
    pub fn parent_set(&self) -> BTreeSet<K> {
        self.parents.keys().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
