// SPDX-License-Identifier: MIT OR Apache-2.0
//! Callback-sequencing timeline.
//!
//! This crate turns a declarative list of timed events into callbacks fired
//! at the right offsets:
//! - Events start at an absolute offset or follow the previous event
//! - Start and end callbacks fire exactly once per playback
//! - Play, pause, continue, and stop with progress reporting
//!
//! ## Architecture
//!
//! The timeline is built on:
//! - Manifest resolution into a time-ordered sequence
//! - A dispatch table of drain-once cue buckets
//! - A playback clock advanced by an injected [`Timer`]
//!
//! ```
//! use cueline::{ManualTimer, TimeEvent, Timeline};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let fired = Rc::new(RefCell::new(Vec::new()));
//! let log = fired.clone();
//! let timer = ManualTimer::new();
//! let timeline = Timeline::new(
//!     vec![
//!         TimeEvent::at(0.0, 0.5),
//!         TimeEvent::follow_up(0.2).on_start(move |args| log.borrow_mut().push(args.progress)),
//!     ],
//!     timer.clone(),
//! );
//!
//! timeline.play().unwrap();
//! timer.run_to_end(1_000);
//! assert_eq!(*fired.borrow(), vec![500.0]);
//! assert!(timeline.is_finished());
//! ```

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod manifest;
pub mod timer;

pub use clock::{percentage_of, PlaybackState, Timeline};
pub use config::{TimelineConfig, DEFAULT_TICK_MS};
pub use dispatch::{build_dispatch_table, Cue, CueKind, DispatchTable};
pub use error::{EntryFault, Result, TimelineError};
pub use event::{Anchor, Callback, CueArgs, EventId, ResolvedEvent, Snapshot, TimeEvent};
pub use manifest::{resolve_sequence, total_duration, validate_manifest, EventDecl, ManifestDocument};
pub use timer::{ManualTimer, TickFn, Timer};
