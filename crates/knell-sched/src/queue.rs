//! The time-ordered pending-event queue.
//!
//! All state, the clock included, lives behind one mutex, so sequence
//! allocation, past-due validation, and insertion are a single critical
//! section and records posted from any thread land in the same total
//! order. The lock is held only for queue-state mutation; the kernel
//! pops one due record at a time and dispatches it with the lock
//! released, which is what lets a running payload post and cancel
//! freely without a re-entrant lock.
//!
//! # Ordering
//!
//! Pending records are kept in a `BTreeMap` keyed by `(due, seq)`; the
//! side index from sequence number to due time makes cancellation and
//! the introspection queries cheap without walking the map.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use indexmap::IndexMap;

use knell_core::{EntityId, SequenceId, Ticks, VirtualTime};

use crate::metrics::KernelMetrics;
use crate::payload::EventPayload;
use crate::record::{EventKey, EventRecord};

struct QueueState {
    now: VirtualTime,
    target: VirtualTime,
    next_seq: u64,
    pending: BTreeMap<EventKey, EventRecord>,
    by_seq: IndexMap<SequenceId, VirtualTime>,
    metrics: KernelMetrics,
}

impl QueueState {
    fn enqueue(
        &mut self,
        target: EntityId,
        due: VirtualTime,
        payload: Box<dyn EventPayload>,
    ) -> SequenceId {
        let seq = SequenceId(self.next_seq);
        self.next_seq += 1;
        let record = EventRecord {
            target,
            due,
            posted_at: self.now,
            seq,
            payload,
        };
        self.by_seq.insert(seq, due);
        self.pending.insert(record.key(), record);
        self.metrics.posted += 1;
        if self.pending.len() > self.metrics.high_water_pending {
            self.metrics.high_water_pending = self.pending.len();
        }
        seq
    }
}

pub(crate) struct EventQueue {
    state: Mutex<QueueState>,
}

impl EventQueue {
    pub(crate) fn new(start: VirtualTime, first_sequence: u64) -> Self {
        Self {
            state: Mutex::new(QueueState {
                now: start,
                target: start,
                next_seq: first_sequence,
                pending: BTreeMap::new(),
                by_seq: IndexMap::new(),
                metrics: KernelMetrics::default(),
            }),
        }
    }

    /// Current virtual time.
    pub(crate) fn now(&self) -> VirtualTime {
        self.lock().now
    }

    /// Target of the advance in progress (or of the last one).
    pub(crate) fn target_time(&self) -> VirtualTime {
        self.lock().target
    }

    /// Enqueue a record due at `due`.
    ///
    /// Panics if `due` is before the current virtual time; the clock is
    /// irreversible and a past due time is a caller logic bug.
    pub(crate) fn post(
        &self,
        target: EntityId,
        due: VirtualTime,
        payload: Box<dyn EventPayload>,
    ) -> SequenceId {
        let mut st = self.lock();
        assert!(
            due >= st.now,
            "cannot schedule into the past: due {due} < now {}",
            st.now
        );
        st.enqueue(target, due, payload)
    }

    /// Enqueue a record due `delay` ticks from now.
    ///
    /// The due time is computed under the queue lock, so a caller on a
    /// foreign thread cannot race the clock into a past due time.
    pub(crate) fn post_in(
        &self,
        target: EntityId,
        delay: Ticks,
        payload: Box<dyn EventPayload>,
    ) -> SequenceId {
        let mut st = self.lock();
        let due = st.now + delay;
        st.enqueue(target, due, payload)
    }

    /// Remove a pending record. `false` if it already fired or was
    /// already canceled; losing that race is harmless.
    pub(crate) fn cancel(&self, seq: SequenceId) -> bool {
        let mut st = self.lock();
        let Some(due) = st.by_seq.swap_remove(&seq) else {
            return false;
        };
        let removed = st.pending.remove(&EventKey { due, seq });
        debug_assert!(removed.is_some(), "sequence index out of sync");
        st.metrics.canceled += 1;
        true
    }

    /// Remove every pending record targeting `target`.
    pub(crate) fn cancel_all_for(&self, target: EntityId) -> usize {
        let mut st = self.lock();
        let keys: Vec<EventKey> = st
            .pending
            .iter()
            .filter(|(_, r)| r.target == target)
            .map(|(k, _)| *k)
            .collect();
        for key in &keys {
            st.pending.remove(key);
            st.by_seq.swap_remove(&key.seq);
        }
        st.metrics.canceled += keys.len() as u64;
        keys.len()
    }

    /// Whether the record is still pending.
    pub(crate) fn is_pending(&self, seq: SequenceId) -> bool {
        self.lock().by_seq.contains_key(&seq)
    }

    /// Ticks until the record dispatches. `None` for unknown/fired ids.
    pub(crate) fn time_until(&self, seq: SequenceId) -> Option<Ticks> {
        let st = self.lock();
        let due = *st.by_seq.get(&seq)?;
        due.since(st.now)
    }

    /// Ticks between the record's post time and its due time.
    pub(crate) fn scheduled_span(&self, seq: SequenceId) -> Option<Ticks> {
        let st = self.lock();
        let due = *st.by_seq.get(&seq)?;
        let record = st.pending.get(&EventKey { due, seq })?;
        due.since(record.posted_at)
    }

    /// Ticks since the record was posted. `None` for unknown/fired ids.
    pub(crate) fn elapsed_since_post(&self, seq: SequenceId) -> Option<Ticks> {
        let st = self.lock();
        let due = *st.by_seq.get(&seq)?;
        let record = st.pending.get(&EventKey { due, seq })?;
        st.now.since(record.posted_at)
    }

    /// Number of pending records.
    pub(crate) fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Drop all pending records without dispatching them.
    pub(crate) fn clear(&self) -> usize {
        let mut st = self.lock();
        let n = st.pending.len();
        st.pending.clear();
        st.by_seq.clear();
        n
    }

    /// Snapshot of the counters.
    pub(crate) fn metrics(&self) -> KernelMetrics {
        self.lock().metrics
    }

    /// Validate and record the target of an advance.
    ///
    /// Panics if `target` is before the current virtual time.
    pub(crate) fn begin_advance(&self, target: VirtualTime) {
        let mut st = self.lock();
        assert!(
            target >= st.now,
            "cannot advance backward: target {target} < now {}",
            st.now
        );
        st.target = target;
    }

    /// Pop the earliest record with `due <= limit`, moving the clock to
    /// its due time. `None` once nothing due remains.
    pub(crate) fn pop_due(&self, limit: VirtualTime) -> Option<EventRecord> {
        let mut st = self.lock();
        let due = st.pending.first_key_value().map(|(k, _)| k.due)?;
        if due > limit {
            return None;
        }
        let (key, record) = st.pending.pop_first().expect("checked non-empty");
        st.by_seq.swap_remove(&key.seq);
        st.now = key.due;
        Some(record)
    }

    /// Land the clock exactly on the advance target.
    pub(crate) fn finish_advance(&self, target: VirtualTime) {
        let mut st = self.lock();
        debug_assert!(st.now <= target);
        st.now = target;
    }

    /// Count a popped record's outcome.
    pub(crate) fn note_dispatch(&self, dead: bool) {
        let mut st = self.lock();
        if dead {
            st.metrics.discarded_dead += 1;
        } else {
            st.metrics.dispatched += 1;
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().expect("event queue lock poisoned")
    }
}
