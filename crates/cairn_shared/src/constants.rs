//! # Playfield & Timing Constants
//!
//! Defaults baked into the client. Every one of these can be overridden
//! through [`crate::DecoderConfig`]; the constants only seed the defaults.

// =============================================================================
// PLAYFIELD GEOMETRY
// =============================================================================

/// Width of the visible playfield in pixels.
pub const FIELD_WIDTH: i16 = 547;

/// Height of the visible playfield in pixels.
pub const FIELD_HEIGHT: i16 = 540;

/// Horizontal half extent. Coordinates on the wire are centre-relative.
pub const FIELD_HALF_WIDTH: i16 = FIELD_WIDTH / 2;

/// Vertical half extent.
pub const FIELD_HALF_HEIGHT: i16 = FIELD_HEIGHT / 2;

// =============================================================================
// TIMING
// =============================================================================

/// Interpolation interval used when the real inter-frame delay is unknown.
///
/// The server draws at roughly five frames per second.
pub const DEFAULT_FRAME_INTERVAL_MS: u32 = 200;

/// Shortest measured inter-frame delay trusted for interpolation.
pub const MIN_FRAME_INTERVAL_MS: u32 = 50;

/// Longest measured inter-frame delay trusted for interpolation.
pub const MAX_FRAME_INTERVAL_MS: u32 = 1_000;

/// How long a speech bubble stays on screen.
pub const BUBBLE_LIFETIME_MS: u32 = 4_000;

// =============================================================================
// BLENDING
// =============================================================================

/// Displacements beyond this many pixels are treated as teleports.
pub const MAX_INTERP_DISTANCE: i32 = 64;

/// Largest scene scroll accepted from the motion-shift vote, in pixels.
pub const MAX_SHIFT: i32 = 64;
