// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline configuration.
//!
//! The tick interval sets both how often the timer fires and how far progress
//! advances per tick. A cue may fire up to one tick after its timestamp.

use crate::error::{Result, TimelineError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default tick interval in milliseconds
pub const DEFAULT_TICK_MS: u64 = 5;

/// Playback configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Tick interval in milliseconds
    pub tick_ms: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

impl TimelineConfig {
    /// Create a config with the given tick interval
    pub fn with_tick_ms(tick_ms: u64) -> Self {
        Self { tick_ms }
    }

    /// Tick interval as a duration
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Progress added per tick, in milliseconds
    pub fn tick_increment(&self) -> f64 {
        self.tick_ms as f64
    }

    /// Reject a zero tick interval
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(TimelineError::InvalidTick);
        }
        Ok(())
    }

    /// Parse a config from RON
    pub fn from_ron(s: &str) -> Result<Self> {
        let config: TimelineConfig = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to pretty RON
    pub fn to_ron(&self) -> Result<String> {
        let pretty = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }
}
