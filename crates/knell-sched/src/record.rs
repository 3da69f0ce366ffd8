//! Pending-event records and their total order.

use std::fmt;

use knell_core::{EntityId, SequenceId, VirtualTime};

use crate::payload::EventPayload;

/// Sort key for pending records: due time first, then sequence number.
///
/// Two records due at the same virtual instant dispatch in posting
/// order, which is the basis of deterministic replay. The derived `Ord` is the
/// committed tie-break rule; changing it breaks any record/playback
/// collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct EventKey {
    pub due: VirtualTime,
    pub seq: SequenceId,
}

/// One scheduled event, immutable after construction.
///
/// Holds only the target's integer id, never a pointer, so dispatch
/// re-resolves the target and a record pending against a destroyed
/// entity is simply discarded. Destroyed on dispatch, on cancellation,
/// or with the queue itself (pending records at shutdown are dropped
/// without dispatch).
pub struct EventRecord {
    pub(crate) target: EntityId,
    pub(crate) due: VirtualTime,
    pub(crate) posted_at: VirtualTime,
    pub(crate) seq: SequenceId,
    pub(crate) payload: Box<dyn EventPayload>,
}

impl EventRecord {
    /// Id of the entity this record targets.
    pub fn target(&self) -> EntityId {
        self.target
    }

    /// Virtual time at which the record becomes due.
    pub fn due(&self) -> VirtualTime {
        self.due
    }

    /// Virtual time at which the record was posted.
    pub fn posted_at(&self) -> VirtualTime {
        self.posted_at
    }

    /// The record's sequence number.
    pub fn sequence(&self) -> SequenceId {
        self.seq
    }

    pub(crate) fn key(&self) -> EventKey {
        EventKey {
            due: self.due,
            seq: self.seq,
        }
    }
}

impl fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecord")
            .field("target", &self.target)
            .field("due", &self.due)
            .field("posted_at", &self.posted_at)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_orders_by_due_then_sequence() {
        let early = EventKey {
            due: VirtualTime(5),
            seq: SequenceId(9),
        };
        let late = EventKey {
            due: VirtualTime(10),
            seq: SequenceId(1),
        };
        let late_again = EventKey {
            due: VirtualTime(10),
            seq: SequenceId(2),
        };
        assert!(early < late);
        assert!(late < late_again);
    }
}
