// SPDX-License-Identifier: MIT OR Apache-2.0
//! Time event declarations and the values handed to callbacks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Unique identifier for a time event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Create a new random event ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Arguments passed to `on_start` / `on_end` callbacks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueArgs {
    /// Scheduled timestamp of the cue in seconds (rounded to 2 decimals)
    pub stamp: f64,
    /// Timeline progress in milliseconds when the cue fired
    pub progress: f64,
    /// Percentage of the total duration elapsed (0-100, one decimal)
    pub percentage: f64,
}

/// Playback snapshot handed to update, pause, and stop observers
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Snapshot {
    /// Elapsed time in milliseconds
    pub progress: f64,
    /// Total timeline duration in milliseconds
    pub total_duration: f64,
    /// Percentage of the total duration elapsed (0-100, one decimal)
    pub percentage: f64,
}

/// Callback invoked when a cue fires
pub type Callback = Rc<dyn Fn(CueArgs)>;

/// Where an event starts on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Anchor {
    /// Absolute offset in seconds from the timeline origin
    At(f64),
    /// Starts when the previously declared event ends
    FollowUp,
}

/// A declared time event
#[derive(Clone)]
pub struct TimeEvent {
    /// Identifier, reassigned on every `play`
    pub id: Option<EventId>,
    /// Optional human-readable label
    pub label: Option<String>,
    /// Start relationship
    pub anchor: Anchor,
    /// Duration in seconds
    pub duration: f64,
    pub(crate) on_start: Option<Callback>,
    pub(crate) on_end: Option<Callback>,
}

impl TimeEvent {
    /// Create an event starting at an absolute offset (seconds)
    pub fn at(start: f64, duration: f64) -> Self {
        Self::new(Anchor::At(start), duration)
    }

    /// Create an event starting when the previous manifest entry ends
    pub fn follow_up(duration: f64) -> Self {
        Self::new(Anchor::FollowUp, duration)
    }

    /// Create an event from an anchor and duration
    pub fn new(anchor: Anchor, duration: f64) -> Self {
        Self {
            id: None,
            label: None,
            anchor,
            duration,
            on_start: None,
            on_end: None,
        }
    }

    /// Set a label
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the callback fired at the event's start
    pub fn on_start(mut self, callback: impl Fn(CueArgs) + 'static) -> Self {
        self.on_start = Some(Rc::new(callback));
        self
    }

    /// Set the callback fired at the event's end
    pub fn on_end(mut self, callback: impl Fn(CueArgs) + 'static) -> Self {
        self.on_end = Some(Rc::new(callback));
        self
    }

    /// Attach a start callback to an existing event
    pub fn set_on_start(&mut self, callback: impl Fn(CueArgs) + 'static) {
        self.on_start = Some(Rc::new(callback));
    }

    /// Attach an end callback to an existing event
    pub fn set_on_end(&mut self, callback: impl Fn(CueArgs) + 'static) {
        self.on_end = Some(Rc::new(callback));
    }
}

impl fmt::Debug for TimeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeEvent")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("anchor", &self.anchor)
            .field("duration", &self.duration)
            .field("on_start", &self.on_start.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

/// An event with a concrete start, produced once per `play`
#[derive(Clone)]
pub struct ResolvedEvent {
    /// Identifier assigned at play time
    pub id: EventId,
    /// Label carried over from the declaration
    pub label: Option<String>,
    /// Absolute start in seconds
    pub start: f64,
    /// Duration in seconds
    pub duration: f64,
    pub(crate) on_start: Option<Callback>,
    pub(crate) on_end: Option<Callback>,
}

impl ResolvedEvent {
    /// End of the event in seconds
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Whether a start callback is attached
    pub fn has_on_start(&self) -> bool {
        self.on_start.is_some()
    }

    /// Whether an end callback is attached
    pub fn has_on_end(&self) -> bool {
        self.on_end.is_some()
    }
}

impl fmt::Debug for ResolvedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEvent")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("start", &self.start)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}
