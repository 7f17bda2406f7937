//! # Decoder Configuration
//!
//! Everything tunable about decoding and blending, loaded once from TOML.
//!
//! ```toml
//! commit_policy = "partial"
//!
//! [limits]
//! max_pictures = 512
//!
//! [blend]
//! interpolate = true
//! onion_skin = false
//! blend_rate = 0.5
//!
//! [timing]
//! default_frame_interval_ms = 200
//! ```
//!
//! Every table and every field is optional; missing values fall back to the
//! defaults in [`crate::constants`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    BUBBLE_LIFETIME_MS, DEFAULT_FRAME_INTERVAL_MS, FIELD_HALF_HEIGHT, FIELD_HALF_WIDTH,
    MAX_FRAME_INTERVAL_MS, MAX_INTERP_DISTANCE, MAX_SHIFT, MIN_FRAME_INTERVAL_MS,
};
use crate::error::{ConfigError, ConfigResult};

/// Sanity caps on every counted section of a packet.
///
/// The protocol carries no integrity check, so a corrupt count must never
/// turn into an unbounded allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Descriptor table entries per packet.
    pub max_descriptors: usize,
    /// Replayed plus new pictures per frame.
    pub max_pictures: usize,
    /// Mobiles per frame.
    pub max_mobiles: usize,
    /// Bubbles per packet.
    pub max_bubbles: usize,
    /// Sounds per packet.
    pub max_sounds: usize,
    /// Inventory commands per packet, counting nested ones.
    pub max_inventory_commands: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_descriptors: 255,
            max_pictures: 512,
            max_mobiles: 255,
            max_bubbles: 64,
            max_sounds: 255,
            max_inventory_commands: 300,
        }
    }
}

/// User-facing blend switches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendSettings {
    /// Interpolate positions between frames.
    pub interpolate: bool,
    /// Cross-fade poses between frames.
    pub onion_skin: bool,
    /// Snap animation frames instead of keeping the previous pose around.
    pub fast_animation: bool,
    /// Show bar decreases immediately.
    pub fast_bars: bool,
    /// Fade duration as a fraction of the position interval.
    pub blend_rate: f32,
    /// Displacements above this (pixels) are not interpolated.
    pub max_interp_distance: i32,
    /// Largest accepted scene scroll (pixels).
    pub max_shift: i32,
}

impl Default for BlendSettings {
    fn default() -> Self {
        Self {
            interpolate: true,
            onion_skin: false,
            fast_animation: true,
            fast_bars: true,
            blend_rate: 1.0,
            max_interp_distance: MAX_INTERP_DISTANCE,
            max_shift: MAX_SHIFT,
        }
    }
}

impl BlendSettings {
    /// Whether the previous frame's mobiles and descriptors are worth keeping.
    #[inline]
    #[must_use]
    pub const fn keeps_previous(&self) -> bool {
        self.interpolate || self.onion_skin
    }

    /// Whether the render path needs the previous maps in its snapshot.
    #[inline]
    #[must_use]
    pub const fn snapshot_needs_previous(&self) -> bool {
        self.interpolate || self.onion_skin || !self.fast_animation
    }
}

/// Frame timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Interval used when the true inter-frame delay is unknown.
    pub default_frame_interval_ms: u32,
    /// Shortest measured delay that is trusted.
    pub min_frame_interval_ms: u32,
    /// Longest measured delay that is trusted.
    pub max_frame_interval_ms: u32,
    /// Bubble display lifetime.
    pub bubble_lifetime_ms: u32,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            default_frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            min_frame_interval_ms: MIN_FRAME_INTERVAL_MS,
            max_frame_interval_ms: MAX_FRAME_INTERVAL_MS,
            bubble_lifetime_ms: BUBBLE_LIFETIME_MS,
        }
    }
}

impl TimingSettings {
    /// Picks the interpolation interval for a frame.
    ///
    /// The measured delay wins when it falls inside the trusted window.
    #[must_use]
    pub fn frame_interval(&self, measured: Option<Duration>) -> Duration {
        let min = Duration::from_millis(u64::from(self.min_frame_interval_ms));
        let max = Duration::from_millis(u64::from(self.max_frame_interval_ms));
        match measured {
            Some(delay) if delay >= min && delay <= max => delay,
            _ => Duration::from_millis(u64::from(self.default_frame_interval_ms)),
        }
    }

    /// Bubble lifetime as a duration.
    #[inline]
    #[must_use]
    pub fn bubble_lifetime(&self) -> Duration {
        Duration::from_millis(u64::from(self.bubble_lifetime_ms))
    }
}

/// On-screen rectangle used by the motion-shift vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayfieldBounds {
    /// Leftmost visible H.
    pub min_h: i16,
    /// Rightmost visible H.
    pub max_h: i16,
    /// Topmost visible V.
    pub min_v: i16,
    /// Bottommost visible V.
    pub max_v: i16,
}

impl Default for PlayfieldBounds {
    fn default() -> Self {
        Self {
            min_h: -FIELD_HALF_WIDTH,
            max_h: FIELD_HALF_WIDTH,
            min_v: -FIELD_HALF_HEIGHT,
            max_v: FIELD_HALF_HEIGHT,
        }
    }
}

impl PlayfieldBounds {
    /// Returns true if the point lies inside the rectangle (inclusive).
    #[inline]
    #[must_use]
    pub const fn contains(&self, h: i16, v: i16) -> bool {
        h >= self.min_h && h <= self.max_h && v >= self.min_v && v <= self.max_v
    }
}

/// What to do with scene state when a late packet section fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitPolicy {
    /// Commit descriptors, pictures and mobiles as soon as they decode.
    /// A failure in info strings, bubbles, sounds or inventory leaves them
    /// committed. Matches observed server traffic.
    #[default]
    Partial,
    /// Decode the whole packet first; commit only if every section decodes.
    Atomic,
}

/// Complete decoder configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Late-failure commit behaviour.
    pub commit_policy: CommitPolicy,
    /// Section size caps.
    pub limits: Limits,
    /// Blend switches.
    pub blend: BlendSettings,
    /// Frame timing.
    pub timing: TimingSettings,
    /// Visible playfield.
    pub playfield: PlayfieldBounds,
}

impl DecoderConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for values that fail validation.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// errors of [`Self::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(
            path = %path.display(),
            policy = ?config.commit_policy,
            "loaded decoder config"
        );
        Ok(config)
    }

    /// Serializes the config back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Invalid`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.blend.blend_rate.is_finite() && self.blend.blend_rate > 0.0) {
            return Err(ConfigError::Invalid {
                field: "blend.blend_rate",
                reason: "must be a positive number",
            });
        }
        if self.blend.max_interp_distance < 0 || self.blend.max_shift < 0 {
            return Err(ConfigError::Invalid {
                field: "blend.max_interp_distance",
                reason: "distances must not be negative",
            });
        }
        if self.timing.default_frame_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "timing.default_frame_interval_ms",
                reason: "must be greater than zero",
            });
        }
        if self.timing.min_frame_interval_ms > self.timing.max_frame_interval_ms {
            return Err(ConfigError::Invalid {
                field: "timing.min_frame_interval_ms",
                reason: "must not exceed max_frame_interval_ms",
            });
        }
        if self.playfield.min_h > self.playfield.max_h
            || self.playfield.min_v > self.playfield.max_v
        {
            return Err(ConfigError::Invalid {
                field: "playfield",
                reason: "min must not exceed max",
            });
        }
        Ok(())
    }
}
