// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dispatch table mapping timestamps to pending callbacks.
//!
//! Buckets are keyed by millisecond stamps on the two-decimal grid and
//! drained whole when due, so every cue fires at most once per build.

use crate::event::{Callback, EventId, ResolvedEvent};
use crate::manifest::stamp_ms;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Which edge of an event a cue belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    /// Fires at the event's start
    Start,
    /// Fires at the event's end
    End,
}

/// A pending callback
#[derive(Clone)]
pub struct Cue {
    /// Owning event
    pub event: EventId,
    /// Start or end cue
    pub kind: CueKind,
    pub(crate) callback: Callback,
}

impl fmt::Debug for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cue")
            .field("event", &self.event)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Timestamp-ordered table of pending cues
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    buckets: BTreeMap<u64, VecDeque<Cue>>,
}

impl DispatchTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cue at a millisecond stamp
    pub fn insert(&mut self, stamp_ms: u64, cue: Cue) {
        self.buckets.entry(stamp_ms).or_default().push_back(cue);
    }

    /// Remove and return every cue due at or before `now_ms`, in time order
    ///
    /// Cues sharing a stamp come out in registration order.
    pub fn drain_due(&mut self, now_ms: f64) -> Vec<(u64, Cue)> {
        let mut due = Vec::new();

        while let Some(entry) = self.buckets.first_entry() {
            if *entry.key() as f64 > now_ms {
                break;
            }
            let stamp = *entry.key();
            due.extend(entry.remove().into_iter().map(|cue| (stamp, cue)));
        }

        due
    }

    /// Number of cues not yet fired
    pub fn pending(&self) -> usize {
        self.buckets.values().map(VecDeque::len).sum()
    }

    /// Whether every cue has fired
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Stamps that still have pending cues
    pub fn stamps(&self) -> impl Iterator<Item = u64> + '_ {
        self.buckets.keys().copied()
    }

    /// Drop every pending cue
    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

/// Build a dispatch table from resolved events
///
/// Events starting before `cutoff` (seconds) are skipped entirely, so
/// playback from a custom offset does not replay elapsed cues. Both sides
/// are compared on the stamp grid.
pub fn build_dispatch_table(resolved: &[ResolvedEvent], cutoff: f64) -> DispatchTable {
    let mut table = DispatchTable::new();
    let cutoff_ms = stamp_ms(cutoff);

    for event in resolved.iter().filter(|e| stamp_ms(e.start) >= cutoff_ms) {
        if let Some(callback) = &event.on_start {
            table.insert(
                stamp_ms(event.start),
                Cue {
                    event: event.id,
                    kind: CueKind::Start,
                    callback: callback.clone(),
                },
            );
        }
        if let Some(callback) = &event.on_end {
            table.insert(
                stamp_ms(event.end()),
                Cue {
                    event: event.id,
                    kind: CueKind::End,
                    callback: callback.clone(),
                },
            );
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TimeEvent;
    use crate::manifest::resolve_sequence;

    fn manifest() -> Vec<TimeEvent> {
        vec![
            TimeEvent::at(0.0, 0.5).on_start(|_| {}),
            TimeEvent::follow_up(0.2).on_start(|_| {}),
            TimeEvent::follow_up(0.2).on_end(|_| {}),
            TimeEvent::at(0.1, 0.2).on_start(|_| {}).on_end(|_| {}),
        ]
    }

    #[test]
    fn test_build_registers_start_and_end_cues() {
        let resolved = resolve_sequence(&manifest()).unwrap();
        let table = build_dispatch_table(&resolved, 0.0);

        assert_eq!(table.pending(), 5);
        assert_eq!(table.stamps().collect::<Vec<_>>(), vec![0, 100, 300, 500, 900]);
    }

    #[test]
    fn test_cutoff_skips_elapsed_events() {
        let resolved = resolve_sequence(&manifest()).unwrap();
        let table = build_dispatch_table(&resolved, 0.3);

        assert_eq!(table.stamps().collect::<Vec<_>>(), vec![500, 900]);
    }

    #[test]
    fn test_cutoff_keeps_follow_up_on_the_grid() {
        let manifest = vec![TimeEvent::at(0.7, 0.2), TimeEvent::follow_up(0.1).on_start(|_| {})];
        let resolved = resolve_sequence(&manifest).unwrap();
        assert!(resolved[1].start < 0.9);

        let table = build_dispatch_table(&resolved, 0.9);
        assert_eq!(table.stamps().collect::<Vec<_>>(), vec![900]);
    }

    #[test]
    fn test_drain_due_is_ordered_and_once() {
        let resolved = resolve_sequence(&manifest()).unwrap();
        let mut table = build_dispatch_table(&resolved, 0.0);

        let due = table.drain_due(320.0);
        let stamps: Vec<_> = due.iter().map(|(s, _)| *s).collect();
        assert_eq!(stamps, vec![0, 100, 300]);
        assert_eq!(due[1].1.kind, CueKind::Start);
        assert_eq!(due[2].1.kind, CueKind::End);

        assert!(table.drain_due(320.0).is_empty());
        assert_eq!(table.pending(), 2);

        table.drain_due(10_000.0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_shared_stamp_keeps_registration_order() {
        let manifest = vec![
            TimeEvent::at(1.0, 1.0).labeled("x").on_start(|_| {}),
            TimeEvent::at(0.5, 0.5).labeled("y").on_end(|_| {}),
        ];
        let resolved = resolve_sequence(&manifest).unwrap();
        let mut table = build_dispatch_table(&resolved, 0.0);

        let due = table.drain_due(1000.0);
        assert_eq!(due.len(), 2);
        // "y" resolves first, so its end cue is registered first
        assert_eq!(due[0].1.event, resolved[0].id);
        assert_eq!(due[0].1.kind, CueKind::End);
        assert_eq!(due[1].1.kind, CueKind::Start);
    }
}
