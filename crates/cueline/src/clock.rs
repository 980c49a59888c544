// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback clock driving a manifest against a timer.

use crate::config::TimelineConfig;
use crate::dispatch::{build_dispatch_table, DispatchTable};
use crate::error::{Result, TimelineError};
use crate::event::{Callback, CueArgs, EventId, ResolvedEvent, Snapshot, TimeEvent};
use crate::manifest::{
    assign_ids, resolve_sequence, round1, total_duration, validate_manifest, ManifestDocument,
};
use crate::timer::Timer;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Stopped
    #[default]
    Stopped,
    /// Playing forward
    Playing,
    /// Paused, progress retained
    Paused,
}

type Observer = Rc<dyn Fn(Snapshot)>;
type FinishObserver = Rc<dyn Fn()>;

/// Percentage of `total_duration` covered by `stamp` (both in milliseconds)
///
/// One decimal, clamped to 0-100. A zero-length timeline reports 0%.
pub fn percentage_of(stamp: f64, total_duration: f64) -> f64 {
    if total_duration <= 0.0 || !total_duration.is_finite() {
        return 0.0;
    }
    let percentage = 100.0 - ((stamp - total_duration) / total_duration) * -100.0;
    round1(percentage.clamp(0.0, 100.0))
}

struct Inner {
    manifest: Vec<TimeEvent>,
    config: TimelineConfig,
    timer: Box<dyn Timer>,
    state: PlaybackState,
    /// Elapsed time in milliseconds
    progress: f64,
    /// Frozen at `play`, in milliseconds
    total_duration: f64,
    resolved: IndexMap<EventId, ResolvedEvent>,
    table: DispatchTable,
    finished: bool,
    /// Bumped whenever playback restarts or stops
    run: u64,
    on_update: Option<Observer>,
    on_finished: Option<FinishObserver>,
}

impl Inner {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            progress: self.progress,
            total_duration: self.total_duration,
            percentage: percentage_of(self.progress, self.total_duration),
        }
    }

    /// Cancel the timer and reset progress
    fn halt(&mut self) {
        self.timer.cancel();
        self.progress = 0.0;
        self.state = PlaybackState::Stopped;
        self.finished = false;
        self.table.clear();
        self.run += 1;
    }

    fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing && !self.finished
    }
}

/// A callback-sequencing timeline
///
/// Clones are handles to the same timeline.
#[derive(Clone)]
pub struct Timeline {
    inner: Rc<RefCell<Inner>>,
}

impl Timeline {
    /// Create a timeline with the default tick interval
    pub fn new(manifest: Vec<TimeEvent>, timer: impl Timer + 'static) -> Self {
        Self::build(manifest, Box::new(timer), TimelineConfig::default())
    }

    /// Create a timeline with an explicit configuration
    pub fn with_config(
        manifest: Vec<TimeEvent>,
        timer: impl Timer + 'static,
        config: TimelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(manifest, Box::new(timer), config))
    }

    /// Create a timeline from a RON manifest document
    ///
    /// Callbacks can be attached afterwards with [`Timeline::edit_manifest`].
    pub fn from_document(document: ManifestDocument, timer: impl Timer + 'static) -> Result<Self> {
        let (config, manifest) = document.into_events()?;
        Self::with_config(manifest, timer, config)
    }

    fn build(manifest: Vec<TimeEvent>, timer: Box<dyn Timer>, config: TimelineConfig) -> Self {
        if manifest.is_empty() {
            tracing::warn!("Timeline: No events in manifest, this might cause an error");
        }

        Self {
            inner: Rc::new(RefCell::new(Inner {
                manifest,
                config,
                timer,
                state: PlaybackState::Stopped,
                progress: 0.0,
                total_duration: 0.0,
                resolved: IndexMap::new(),
                table: DispatchTable::new(),
                finished: false,
                run: 0,
                on_update: None,
                on_finished: None,
            })),
        }
    }

    /// Replace the manifest; takes effect at the next `play`
    pub fn set_manifest(&self, manifest: Vec<TimeEvent>) {
        let mut inner = self.inner.borrow_mut();
        if inner.state != PlaybackState::Stopped {
            tracing::debug!("Manifest replaced during playback, applies on next play");
        }
        inner.manifest = manifest;
    }

    /// Edit the manifest, e.g. to attach callbacks by label
    ///
    /// The closure works on a copy that replaces the manifest when it
    /// returns, so it may call back into this timeline.
    pub fn edit_manifest<R>(&self, f: impl FnOnce(&mut Vec<TimeEvent>) -> R) -> R {
        let mut manifest = self.inner.borrow().manifest.clone();
        let result = f(&mut manifest);
        self.set_manifest(manifest);
        result
    }

    /// Play from the beginning
    pub fn play(&self) -> Result<()> {
        self.play_from(0.0)
    }

    /// Play from a custom offset in seconds
    ///
    /// Events starting before the offset are skipped. Any running playback is
    /// stopped first. Cues due exactly at the offset fire before this returns.
    pub fn play_from(&self, seconds: f64) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            validate_manifest(&inner.manifest, "play")?;

            let offset = if seconds.is_finite() && seconds > 0.0 {
                seconds
            } else {
                if seconds != 0.0 {
                    tracing::warn!("Ignoring invalid start offset {seconds}, playing from 0");
                }
                0.0
            };

            inner.halt();
            inner.state = PlaybackState::Playing;
            assign_ids(&mut inner.manifest);
            inner.progress = (offset * 1000.0).round();

            let resolved = resolve_sequence(&inner.manifest)?;
            inner.total_duration = total_duration(&resolved);
            inner.table = build_dispatch_table(&resolved, offset);
            tracing::debug!(
                events = resolved.len(),
                cues = inner.table.pending(),
                total_ms = inner.total_duration,
                offset_ms = inner.progress,
                "Timeline playing"
            );
            inner.resolved = resolved.into_iter().map(|e| (e.id, e)).collect();

            Self::arm(&self.inner, &mut inner);
        }

        Self::evaluate(&self.inner, false);
        Ok(())
    }

    /// Pause playback, keeping progress and pending cues
    pub fn pause(&self) -> Result<()> {
        self.pause_with(|_| {})
    }

    /// Pause playback and report the snapshot at the pause point
    ///
    /// Outside of `Playing` this logs a warning and does nothing.
    pub fn pause_with(&self, on_paused: impl FnOnce(Snapshot)) -> Result<()> {
        let snapshot = {
            let mut inner = self.inner.borrow_mut();
            if inner.manifest.is_empty() {
                return Err(TimelineError::EmptyManifest { operation: "pause" });
            }
            if !inner.is_playing() {
                tracing::warn!(state = ?inner.state, "Timeline: pause called while not playing");
                return Ok(());
            }

            inner.timer.cancel();
            inner.state = PlaybackState::Paused;
            tracing::debug!(progress_ms = inner.progress, "Timeline paused");
            inner.snapshot()
        };

        on_paused(snapshot);
        Ok(())
    }

    /// Continue a paused playback without rebuilding the schedule
    pub fn resume(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        validate_manifest(&inner.manifest, "continue")?;
        if inner.state != PlaybackState::Paused {
            tracing::warn!(state = ?inner.state, "Timeline: continue called while not paused");
            return Ok(());
        }

        inner.state = PlaybackState::Playing;
        tracing::debug!(progress_ms = inner.progress, "Timeline resumed");
        Self::arm(&self.inner, &mut inner);
        Ok(())
    }

    /// Stop playback and reset progress to zero
    pub fn stop(&self) {
        self.stop_with(|_| {});
    }

    /// Stop playback, reporting the snapshot taken just before the reset
    pub fn stop_with(&self, on_stopped: impl FnOnce(Snapshot)) {
        let snapshot = {
            let mut inner = self.inner.borrow_mut();
            let snapshot = inner.snapshot();
            inner.halt();
            tracing::debug!(progress_ms = snapshot.progress, "Timeline stopped");
            snapshot
        };

        on_stopped(snapshot);
    }

    /// Register the per-tick progress observer, replacing any previous one
    pub fn on_update(&self, handler: impl Fn(Snapshot) + 'static) {
        self.inner.borrow_mut().on_update = Some(Rc::new(handler));
    }

    /// Register the completion observer, fired once per playback
    pub fn on_finished(&self, handler: impl Fn() + 'static) {
        self.inner.borrow_mut().on_finished = Some(Rc::new(handler));
    }

    /// Percentage of the total duration covered by `stamp` milliseconds
    pub fn percentage(&self, stamp: f64) -> f64 {
        percentage_of(stamp, self.inner.borrow().total_duration)
    }

    /// Resolve the current manifest and return its duration in milliseconds
    pub fn duration(&self) -> Result<f64> {
        let inner = self.inner.borrow();
        validate_manifest(&inner.manifest, "duration")?;
        Ok(total_duration(&resolve_sequence(&inner.manifest)?))
    }

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        self.inner.borrow().state
    }

    /// Elapsed time in milliseconds
    pub fn progress(&self) -> f64 {
        self.inner.borrow().progress
    }

    /// Total duration frozen at the last `play`, in milliseconds
    pub fn total_duration(&self) -> f64 {
        self.inner.borrow().total_duration
    }

    /// Current progress snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.inner.borrow().snapshot()
    }

    /// Whether playback ran past its total duration
    pub fn is_finished(&self) -> bool {
        self.inner.borrow().finished
    }

    /// Whether the timer is currently armed
    pub fn is_ticking(&self) -> bool {
        self.inner.borrow().timer.is_armed()
    }

    /// Cues not yet fired in the current playback
    pub fn pending_cues(&self) -> usize {
        self.inner.borrow().table.pending()
    }

    /// Events resolved at the last `play`, in time order
    pub fn resolved_events(&self) -> Vec<ResolvedEvent> {
        self.inner.borrow().resolved.values().cloned().collect()
    }

    /// Look up a resolved event by id
    pub fn event(&self, id: EventId) -> Option<ResolvedEvent> {
        self.inner.borrow().resolved.get(&id).cloned()
    }

    /// Playback configuration
    pub fn config(&self) -> TimelineConfig {
        self.inner.borrow().config
    }

    fn arm(rc: &Rc<RefCell<Inner>>, inner: &mut Inner) {
        if inner.timer.is_armed() {
            tracing::warn!("Timeline: replacing an active timer handle");
            inner.timer.cancel();
        }

        let weak: Weak<RefCell<Inner>> = Rc::downgrade(rc);
        let period = inner.config.tick();
        inner.timer.arm(
            period,
            Box::new(move || {
                if let Some(rc) = weak.upgrade() {
                    Self::evaluate(&rc, true);
                }
            }),
        );
    }

    /// One clock step: optionally advance, fire due cues, notify observers
    fn evaluate(rc: &Rc<RefCell<Inner>>, advance: bool) {
        let (run, cues, snapshot, on_update, on_finished) = {
            let Ok(mut inner) = rc.try_borrow_mut() else {
                tracing::warn!("Timeline: tick skipped, timeline is busy");
                return;
            };
            if !inner.is_playing() {
                return;
            }

            if advance {
                let step = inner.config.tick_increment();
                inner.progress += step;
            }
            let progress = inner.progress;
            let total = inner.total_duration;
            tracing::trace!(progress_ms = progress, "Timeline tick");

            let cues: Vec<(Callback, CueArgs)> = inner
                .table
                .drain_due(progress)
                .into_iter()
                .map(|(stamp, cue)| {
                    let args = CueArgs {
                        stamp: stamp as f64 / 1000.0,
                        progress,
                        percentage: percentage_of(progress, total),
                    };
                    (cue.callback, args)
                })
                .collect();

            let completed = progress > total;
            if completed {
                inner.finished = true;
                inner.timer.cancel();
                tracing::debug!(progress_ms = progress, "Timeline finished");
            }

            let on_finished = if completed {
                inner.on_finished.clone()
            } else {
                None
            };
            (inner.run, cues, inner.snapshot(), inner.on_update.clone(), on_finished)
        };

        for (callback, args) in cues {
            callback(args);
        }

        // A callback may have restarted or stopped playback
        let superseded = rc.try_borrow().map_or(true, |inner| inner.run != run);
        if superseded {
            return;
        }

        if let Some(on_update) = on_update {
            on_update(snapshot);
        }
        if let Some(on_finished) = on_finished {
            on_finished();
        }
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Timeline")
                .field("state", &inner.state)
                .field("progress", &inner.progress)
                .field("total_duration", &inner.total_duration)
                .field("events", &inner.manifest.len())
                .field("pending_cues", &inner.table.pending())
                .finish(),
            Err(_) => f.write_str("Timeline { <busy> }"),
        }
    }
}
