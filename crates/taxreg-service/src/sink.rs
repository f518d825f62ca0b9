//! # Event Sinks
//!
//! The store hands every committed [`LedgerEvent`] to each registered
//! [`EventSink`] after the write guard drops. One writer notifies at a time,
//! so sinks observe events in commit order.
//!
//! ## Journal Invariant
//!
//! Every journal entry is individually digestable via `CanonicalBytes` +
//! `sha256_digest`. The journal trims the oldest 10% once it exceeds its
//! capacity; sequence numbers keep counting across trims.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use taxreg_core::{sha256_digest, Address, CanonicalBytes, ContentDigest};

use crate::event::{EventKind, LedgerEvent};

/// Receiver of committed ledger events.
pub trait EventSink: Send + Sync {
    /// Observe one committed event.
    ///
    /// Runs with the state unlocked: queries on the registry are fine, but a
    /// mutation from inside `emit` waits on its own notification and never
    /// returns.
    fn emit(&self, event: &LedgerEvent);
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// One journaled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the full event stream, from 1.
    pub sequence: u64,
    pub event: LedgerEvent,
    /// Digest of the canonical event bytes; `None` if canonicalization failed.
    pub digest: Option<ContentDigest>,
}

impl JournalEntry {
    fn new(sequence: u64, event: LedgerEvent) -> Self {
        let digest = match CanonicalBytes::new(&event) {
            Ok(cb) => Some(sha256_digest(&cb)),
            Err(e) => {
                tracing::warn!(kind = %event.kind(), sequence, error = %e, "event canonicalization failed, digest unavailable");
                None
            }
        };
        Self {
            sequence,
            event,
            digest,
        }
    }
}

#[derive(Debug, Default)]
struct JournalInner {
    entries: Vec<JournalEntry>,
    next_sequence: u64,
}

/// Bounded in-memory journal of committed events.
#[derive(Debug)]
pub struct EventJournal {
    inner: Mutex<JournalInner>,
    max_entries: usize,
}

impl EventJournal {
    /// Create a journal retaining at most `max_entries` events.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(JournalInner {
                entries: Vec::new(),
                next_sequence: 1,
            }),
            max_entries,
        }
    }

    /// Append an event, trimming the oldest 10% past capacity.
    pub fn append(&self, event: LedgerEvent) {
        let mut inner = self.inner.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.entries.push(JournalEntry::new(sequence, event));
        if inner.entries.len() > self.max_entries {
            let trim_count = (self.max_entries / 10).max(1);
            let trim_count = trim_count.min(inner.entries.len());
            inner.entries.drain(..trim_count);
        }
    }

    /// Snapshot of all retained entries, oldest first.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.inner.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Sequence number of the most recent event, 0 if none was ever appended.
    pub fn last_sequence(&self) -> u64 {
        self.inner.lock().next_sequence - 1
    }

    /// Retained entries of one kind.
    pub fn entries_by_kind(&self, kind: EventKind) -> Vec<JournalEntry> {
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|e| e.event.kind() == kind)
            .cloned()
            .collect()
    }

    /// Retained entries concerning `address`.
    pub fn entries_for_address(&self, address: &Address) -> Vec<JournalEntry> {
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|e| e.event.address().as_ref() == Some(address))
            .cloned()
            .collect()
    }
}

impl EventSink for EventJournal {
    fn emit(&self, event: &LedgerEvent) {
        self.append(event.clone());
    }
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Republishes events as structured `tracing` events under `taxreg::events`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &LedgerEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => tracing::info!(
                target: "taxreg::events",
                kind = %event.kind(),
                address = ?event.address(),
                %payload,
                "ledger event"
            ),
            Err(e) => tracing::warn!(
                target: "taxreg::events",
                kind = %event.kind(),
                error = %e,
                "ledger event serialization failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxreg_state::Role;

    fn addr(last: u8) -> Address {
        let mut b = [0u8; 20];
        b[19] = last;
        Address::from_bytes(b)
    }

    fn added(last: u8) -> LedgerEvent {
        LedgerEvent::AdminAdded {
            address: addr(last),
            role: Role::SubAdmin,
        }
    }

    // ── Journal ──────────────────────────────────────────────────────

    #[test]
    fn append_assigns_sequences_and_digests() {
        let journal = EventJournal::new(100);
        assert!(journal.is_empty());
        assert_eq!(journal.last_sequence(), 0);
        journal.append(added(1));
        journal.append(added(2));
        let entries = journal.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sequence, 1);
        assert_eq!(entries[1].sequence, 2);
        assert!(entries[0].digest.is_some());
        assert_ne!(entries[0].digest, entries[1].digest);
    }

    #[test]
    fn identical_events_share_digest() {
        let journal = EventJournal::new(10);
        journal.append(added(1));
        journal.append(added(1));
        let entries = journal.entries();
        assert_eq!(entries[0].digest, entries[1].digest);
    }

    #[test]
    fn trims_oldest_tenth_past_capacity() {
        let journal = EventJournal::new(20);
        for i in 0..21 {
            journal.append(added(i));
        }
        assert_eq!(journal.len(), 19);
        assert_eq!(journal.entries()[0].sequence, 3);
        assert_eq!(journal.last_sequence(), 21);
    }

    #[test]
    fn tiny_capacity_trims_at_least_one() {
        let journal = EventJournal::new(1);
        journal.append(added(1));
        journal.append(added(2));
        assert_eq!(journal.len(), 1);
        assert_eq!(journal.entries()[0].sequence, 2);
        assert_eq!(journal.capacity(), 1);
    }

    #[test]
    fn queries_by_kind_and_address() {
        let journal = EventJournal::new(10);
        journal.append(added(1));
        journal.append(LedgerEvent::AdminRemoved {
            address: addr(1),
            role: Role::SubAdmin,
        });
        journal.append(added(2));
        assert_eq!(journal.entries_by_kind(EventKind::AdminAdded).len(), 2);
        assert_eq!(journal.entries_by_kind(EventKind::PaymentRecorded).len(), 0);
        let for_one = journal.entries_for_address(&addr(1));
        assert_eq!(for_one.len(), 2);
        assert_eq!(for_one[1].event.kind(), EventKind::AdminRemoved);
    }

    // ── Sinks ────────────────────────────────────────────────────────

    #[test]
    fn journal_as_sink() {
        let journal = EventJournal::new(10);
        let sink: &dyn EventSink = &journal;
        sink.emit(&added(3));
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn tracing_sink_emits_without_subscriber() {
        TracingSink.emit(&added(3));
    }
}
