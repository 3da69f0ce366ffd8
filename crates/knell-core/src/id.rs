//! Strongly-typed identifiers for entities and scheduled events.

use std::fmt;

/// Process-unique identifier for a registered entity.
///
/// Ids are allocated by the registry: a small range of well-known ids
/// below the dynamic watermark is assigned statically, everything above
/// it comes from a strictly increasing counter. An id is never reused
/// while the registry that issued it is alive, so a stale `EntityId`
/// simply fails resolution rather than aliasing a newer entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The raw id value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifier assigned to a scheduled event at post time.
///
/// Sequence ids come from a single monotonic counter, so they double as
/// the tie-breaker between events due at the same virtual instant: the
/// smaller sequence id dispatches first. This is the entire basis for
/// deterministic replay: two runs that post the same events observe
/// the same dispatch order.
///
/// The value returned by `post` is the same value used for cancellation
/// and introspection; there is no separate handle space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(pub u64);

impl SequenceId {
    /// The raw sequence value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SequenceId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
