// SPDX-License-Identifier: MIT OR Apache-2.0
//! Realtime drivers for cueline timelines.
//!
//! [`IntervalTimer`] implements the [`Timer`](cueline::Timer) capability on
//! top of a tokio interval. Ticks run on the current thread through
//! [`tokio::task::spawn_local`], so the timeline and its callbacks never
//! leave the thread that created them.

pub mod interval;

pub use interval::{play_to_end, wait_finished, IntervalTimer};
