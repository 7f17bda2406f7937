//! # Decode Error Types
//!
//! Every failure in this crate is per-packet. A packet that fails is logged
//! and dropped; the decoder is ready for the next one.

use std::fmt;

use thiserror::Error;

/// Decoding phases of a draw-state packet, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Ack command and frame counters.
    Header,
    /// Descriptor table size.
    DescriptorCount,
    /// Descriptor table entries.
    Descriptor,
    /// Bars and lighting.
    Stats,
    /// Picture count byte.
    PictureCount,
    /// Extended picture header after the sentinel.
    PictureHeader,
    /// Bit-packed pictures and delta replay.
    Pictures,
    /// Mobile count byte.
    MobileCount,
    /// Mobile records.
    Mobiles,
    /// Info string list.
    InfoStrings,
    /// Bubble count byte.
    BubbleCount,
    /// Bubble entries.
    Bubble,
    /// Sound count byte.
    SoundCount,
    /// Sound IDs.
    Sounds,
    /// Inventory command stream.
    Inventory,
}

impl Stage {
    /// All stages in decode order.
    pub const ALL: [Self; 15] = [
        Self::Header,
        Self::DescriptorCount,
        Self::Descriptor,
        Self::Stats,
        Self::PictureCount,
        Self::PictureHeader,
        Self::Pictures,
        Self::MobileCount,
        Self::Mobiles,
        Self::InfoStrings,
        Self::BubbleCount,
        Self::Bubble,
        Self::SoundCount,
        Self::Sounds,
        Self::Inventory,
    ];

    /// Stable lowercase name, used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::DescriptorCount => "descriptor-count",
            Self::Descriptor => "descriptor",
            Self::Stats => "stats",
            Self::PictureCount => "picture-count",
            Self::PictureHeader => "picture-header",
            Self::Pictures => "pictures",
            Self::MobileCount => "mobile-count",
            Self::Mobiles => "mobiles",
            Self::InfoStrings => "info-strings",
            Self::BubbleCount => "bubble-count",
            Self::Bubble => "bubble",
            Self::SoundCount => "sound-count",
            Self::Sounds => "sounds",
            Self::Inventory => "inventory",
        }
    }

    /// Position in [`Stage::ALL`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether a failure here happens after scene state may have been
    /// committed under the partial commit policy.
    #[inline]
    #[must_use]
    pub const fn is_after_commit(self) -> bool {
        self.index() >= Self::InfoStrings.index()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What went wrong inside a stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageErrorKind {
    /// The packet ended before the stage's fields did.
    #[error("packet truncated")]
    Truncated,

    /// A count field is above its sanity cap.
    #[error("count {count} exceeds limit {max}")]
    BoundsExceeded {
        /// Count found on the wire.
        count: usize,
        /// Configured cap.
        max: usize,
    },

    /// The picture replay refers to more entries than the previous frame had.
    #[error("replays {again} pictures but only {available} are known")]
    MissingDeltaBase {
        /// Requested replay length.
        again: usize,
        /// Pictures in the previous frame.
        available: usize,
    },

    /// A field holds a value the protocol does not allow.
    #[error("malformed field: {0}")]
    Malformed(&'static str),

    /// A collaborator refused the decoded data.
    #[error("collaborator rejected data: {0}")]
    Collaborator(String),
}

/// A decode failure, tagged with the stage it happened in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("draw-state decode failed at stage `{stage}`: {kind}")]
pub struct StageError {
    /// Stage that failed.
    pub stage: Stage,
    /// Failure detail.
    pub kind: StageErrorKind,
}

impl StageError {
    /// Creates a new error.
    #[inline]
    #[must_use]
    pub const fn new(stage: Stage, kind: StageErrorKind) -> Self {
        Self { stage, kind }
    }

    /// Shorthand for a truncation at `stage`.
    #[inline]
    #[must_use]
    pub const fn truncated(stage: Stage) -> Self {
        Self::new(stage, StageErrorKind::Truncated)
    }

    /// Shorthand for a count above its cap.
    #[inline]
    #[must_use]
    pub const fn bounds(stage: Stage, count: usize, max: usize) -> Self {
        Self::new(stage, StageErrorKind::BoundsExceeded { count, max })
    }

    /// Returns true for [`StageErrorKind::BoundsExceeded`].
    #[inline]
    #[must_use]
    pub const fn is_bounds_exceeded(&self) -> bool {
        matches!(self.kind, StageErrorKind::BoundsExceeded { .. })
    }
}

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, StageError>;

/// Errors an inventory collaborator may report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// A command referred to an item the inventory does not hold.
    #[error("unknown item {0}")]
    UnknownItem(u16),

    /// The command stream was rejected for another reason.
    #[error("inventory rejected command: {0}")]
    Rejected(String),
}
