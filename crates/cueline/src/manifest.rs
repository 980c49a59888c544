// SPDX-License-Identifier: MIT OR Apache-2.0
//! Manifest validation and sequence resolution.
//!
//! A manifest is the user-declared list of [`TimeEvent`]s. Resolution turns
//! follow-up relationships into absolute starts and orders the result by
//! start time, keeping declaration order for equal starts.

use crate::config::TimelineConfig;
use crate::error::{EntryFault, Result, TimelineError};
use crate::event::{Anchor, EventId, ResolvedEvent, TimeEvent};
use serde::{Deserialize, Serialize};

/// Round seconds to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Convert seconds to a millisecond stamp on the two-decimal grid
pub fn stamp_ms(seconds: f64) -> u64 {
    ((seconds * 100.0).round().max(0.0) as u64).saturating_mul(10)
}

/// Check every entry of a manifest before anything is scheduled
pub fn validate_manifest(events: &[TimeEvent], operation: &'static str) -> Result<()> {
    if events.is_empty() {
        return Err(TimelineError::EmptyManifest { operation });
    }

    for (index, event) in events.iter().enumerate() {
        if let Some(fault) = entry_fault(event) {
            return Err(TimelineError::InvalidEntry { index, fault });
        }
    }

    Ok(())
}

fn entry_fault(event: &TimeEvent) -> Option<EntryFault> {
    if let Anchor::At(start) = event.anchor {
        if !start.is_finite() {
            return Some(EntryFault::NonFinite);
        }
        if start < 0.0 {
            return Some(EntryFault::NegativeStart);
        }
    }

    if !event.duration.is_finite() {
        return Some(EntryFault::NonFinite);
    }
    if event.duration < 0.0 {
        return Some(EntryFault::NegativeDuration);
    }
    if event.duration == 0.0 {
        return Some(EntryFault::MissingDuration);
    }

    None
}

/// Resolve a manifest into absolute, time-ordered events
///
/// Events without an id get a fresh one. A follow-up event starts where the
/// previously declared event ends, or at 0 when it is the first entry.
pub fn resolve_sequence(events: &[TimeEvent]) -> Result<Vec<ResolvedEvent>> {
    validate_manifest(events, "resolve_sequence")?;

    let mut resolved: Vec<ResolvedEvent> = Vec::with_capacity(events.len());

    for event in events {
        let start = match event.anchor {
            Anchor::At(start) => start,
            Anchor::FollowUp => resolved.last().map(ResolvedEvent::end).unwrap_or(0.0),
        };

        resolved.push(ResolvedEvent {
            id: event.id.unwrap_or_default(),
            label: event.label.clone(),
            start,
            duration: event.duration,
            on_start: event.on_start.clone(),
            on_end: event.on_end.clone(),
        });
    }

    // Stable, so equal starts keep declaration order
    resolved.sort_by(|a, b| a.start.total_cmp(&b.start));

    Ok(resolved)
}

/// Total duration of a resolved sequence in milliseconds
///
/// This is the latest end among all events, which is the end of the
/// last-starting event whenever that event also ends last. The result sits
/// on the same grid as the cue stamps.
pub fn total_duration(resolved: &[ResolvedEvent]) -> f64 {
    let latest_end = resolved.iter().map(ResolvedEvent::end).fold(0.0, f64::max);
    stamp_ms(latest_end) as f64
}

/// Assign fresh ids to every event, overwriting existing ones
pub fn assign_ids(events: &mut [TimeEvent]) {
    for event in events {
        event.id = Some(EventId::new());
    }
}

/// Loose timing declaration as written in a manifest document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDecl {
    /// Absolute start in seconds
    pub start: Option<f64>,
    /// Start when the previous entry ends
    pub follow_up: bool,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Label used to attach callbacks
    pub label: Option<String>,
}

impl EventDecl {
    /// Convert into a typed event, reporting the failed constraint
    pub fn into_event(self, index: usize) -> Result<TimeEvent> {
        let anchor = match (self.start, self.follow_up) {
            (Some(start), _) => Anchor::At(start),
            (None, true) => Anchor::FollowUp,
            (None, false) => {
                return Err(TimelineError::InvalidEntry {
                    index,
                    fault: EntryFault::MissingAnchor,
                })
            }
        };

        let duration = match self.duration {
            Some(d) if d != 0.0 => d,
            _ => {
                return Err(TimelineError::InvalidEntry {
                    index,
                    fault: EntryFault::MissingDuration,
                })
            }
        };

        let mut event = TimeEvent::new(anchor, duration);
        event.label = self.label;
        if let Some(fault) = entry_fault(&event) {
            return Err(TimelineError::InvalidEntry { index, fault });
        }
        Ok(event)
    }
}

/// A manifest document: playback config plus timing declarations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestDocument {
    /// Playback configuration
    #[serde(default)]
    pub config: TimelineConfig,
    /// Event declarations in manifest order
    pub events: Vec<EventDecl>,
}

impl ManifestDocument {
    /// Parse a document from RON
    pub fn from_ron(s: &str) -> Result<Self> {
        let document: ManifestDocument = ron::from_str(s)?;
        document.config.validate()?;
        Ok(document)
    }

    /// Serialize the document to pretty RON
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Convert the declarations into typed events
    pub fn into_events(self) -> Result<(TimelineConfig, Vec<TimeEvent>)> {
        let events = self
            .events
            .into_iter()
            .enumerate()
            .map(|(index, decl)| decl.into_event(index))
            .collect::<Result<Vec<_>>>()?;
        Ok((self.config, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starts(resolved: &[ResolvedEvent]) -> Vec<(Option<&str>, f64)> {
        resolved
            .iter()
            .map(|e| (e.label.as_deref(), round2(e.start)))
            .collect()
    }

    #[test]
    fn test_resolve_follow_up_and_order() {
        let manifest = vec![
            TimeEvent::at(0.0, 0.5).labeled("first"),
            TimeEvent::follow_up(0.2).labeled("follow-up"),
            TimeEvent::follow_up(0.2).labeled("on-end"),
            TimeEvent::at(0.1, 0.2).labeled("in-between"),
        ];

        let resolved = resolve_sequence(&manifest).unwrap();
        assert_eq!(
            starts(&resolved),
            vec![
                (Some("first"), 0.0),
                (Some("in-between"), 0.1),
                (Some("follow-up"), 0.5),
                (Some("on-end"), 0.7),
            ]
        );
        assert_eq!(round2(resolved[3].end()), 0.9);
    }

    #[test]
    fn test_resolve_keeps_declaration_order_for_ties() {
        let manifest = vec![
            TimeEvent::at(1.0, 1.0).labeled("a"),
            TimeEvent::at(0.0, 1.0).labeled("b"),
            TimeEvent::at(1.0, 0.5).labeled("c"),
            TimeEvent::follow_up(0.5).labeled("d"),
        ];

        let resolved = resolve_sequence(&manifest).unwrap();
        let labels: Vec<_> = resolved.iter().filter_map(|e| e.label.as_deref()).collect();
        assert_eq!(labels, vec!["b", "a", "c", "d"]);
        assert_eq!(resolved[3].start, 1.5);
    }

    #[test]
    fn test_follow_up_first_entry_starts_at_zero() {
        let manifest = vec![TimeEvent::follow_up(0.3), TimeEvent::follow_up(0.2)];
        let resolved = resolve_sequence(&manifest).unwrap();
        assert_eq!(resolved[0].start, 0.0);
        assert_eq!(resolved[1].start, 0.3);
    }

    #[test]
    fn test_resolve_keeps_assigned_ids() {
        let mut manifest = vec![TimeEvent::at(0.0, 1.0), TimeEvent::follow_up(1.0)];
        assign_ids(&mut manifest);
        let resolved = resolve_sequence(&manifest).unwrap();
        assert_eq!(Some(resolved[0].id), manifest[0].id);
        assert_eq!(Some(resolved[1].id), manifest[1].id);
        assert_ne!(resolved[0].id, resolved[1].id);
    }

    #[test]
    fn test_empty_manifest_rejected() {
        let err = resolve_sequence(&[]).unwrap_err();
        assert!(matches!(err, TimelineError::EmptyManifest { .. }));
    }

    #[test]
    fn test_invalid_entries_rejected() {
        let cases = [
            (TimeEvent::at(0.0, 0.0), EntryFault::MissingDuration),
            (TimeEvent::at(-1.0, 1.0), EntryFault::NegativeStart),
            (TimeEvent::at(1.0, -1.0), EntryFault::NegativeDuration),
            (TimeEvent::follow_up(-0.5), EntryFault::NegativeDuration),
            (TimeEvent::at(f64::NAN, 1.0), EntryFault::NonFinite),
            (TimeEvent::follow_up(f64::INFINITY), EntryFault::NonFinite),
        ];

        for (event, expected) in cases {
            let manifest = vec![TimeEvent::at(0.0, 1.0), event];
            match validate_manifest(&manifest, "play") {
                Err(TimelineError::InvalidEntry { index, fault }) => {
                    assert_eq!(index, 1);
                    assert_eq!(fault, expected);
                }
                other => panic!("expected invalid entry, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_total_duration_uses_latest_end() {
        let manifest = vec![TimeEvent::at(0.0, 5.0), TimeEvent::at(1.0, 1.0)];
        let resolved = resolve_sequence(&manifest).unwrap();
        assert_eq!(total_duration(&resolved), 5000.0);
    }

    #[test]
    fn test_total_duration_on_stamp_grid() {
        // 0.7 + 0.2 is 0.8999999999999999 in f64
        let manifest = vec![TimeEvent::at(0.7, 0.2)];
        let resolved = resolve_sequence(&manifest).unwrap();
        assert_eq!(total_duration(&resolved), 900.0);
    }

    #[test]
    fn test_stamp_rounding() {
        assert_eq!(stamp_ms(0.0), 0);
        assert_eq!(stamp_ms(0.1), 100);
        assert_eq!(stamp_ms(0.7 + 0.2), 900);
        assert_eq!(stamp_ms(0.104), 100);
        assert_eq!(round1(33.333), 33.3);
    }

    #[test]
    fn test_stamp_saturates_for_huge_offsets() {
        assert_eq!(stamp_ms(1e18), u64::MAX);
        assert_eq!(stamp_ms(f64::MAX), u64::MAX);
    }

    #[test]
    fn test_event_decl_conversion() {
        let decl = EventDecl {
            follow_up: true,
            duration: Some(0.2),
            label: Some("next".into()),
            ..Default::default()
        };
        let event = decl.into_event(0).unwrap();
        assert_eq!(event.anchor, Anchor::FollowUp);
        assert_eq!(event.label.as_deref(), Some("next"));

        let missing_anchor = EventDecl {
            duration: Some(1.0),
            ..Default::default()
        };
        assert!(matches!(
            missing_anchor.into_event(3),
            Err(TimelineError::InvalidEntry {
                index: 3,
                fault: EntryFault::MissingAnchor
            })
        ));

        let missing_duration = EventDecl {
            start: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            missing_duration.into_event(0),
            Err(TimelineError::InvalidEntry {
                fault: EntryFault::MissingDuration,
                ..
            })
        ));
    }

    #[test]
    fn test_manifest_document_from_ron() {
        let source = r#"(
            config: (tick_ms: 10),
            events: [
                (start: Some(0.0), duration: Some(0.5), label: Some("intro")),
                (follow_up: true, duration: Some(0.25), label: Some("verse")),
            ],
        )"#;

        let document = ManifestDocument::from_ron(source).unwrap();
        let (config, events) = document.into_events().unwrap();
        assert_eq!(config.tick_ms, 10);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].anchor, Anchor::At(0.0));
        assert_eq!(events[1].label.as_deref(), Some("verse"));
    }
}
