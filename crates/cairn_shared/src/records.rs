//! # Scene Records
//!
//! The decoded contents of one draw-state frame.
//!
//! ```text
//! descriptors  index -> appearance       (persist until reassigned)
//! pictures     background placements     (rebuilt every frame)
//! mobiles      index -> position + pose  (rebuilt every frame)
//! bubbles      transient speech          (expire after a few seconds)
//! ```
//!
//! Positions are centre-relative playfield pixels: `(0, 0)` is the middle of
//! the field, which is where the player's own character stands.

use crate::time::Timestamp;

/// Appearance of one renderable entity, keyed by a small index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DescriptorRecord {
    /// Index the mobiles refer to (0-255).
    pub index: u8,
    /// Entity kind (player, monster, ...). Opaque to the decoder.
    pub kind: u8,
    /// Base sprite.
    pub sprite_id: u16,
    /// Display name, may be empty.
    pub name: String,
    /// Color customization bytes.
    pub colors: Vec<u8>,
}

/// One background sprite placement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PictureRecord {
    /// Sprite ID (14 bits on the wire).
    pub sprite_id: u16,
    /// Horizontal position.
    pub h: i16,
    /// Vertical position.
    pub v: i16,
    /// Whether the picture moved relative to the scrolled scene.
    pub moving: bool,
    /// Horizontal position in the previous frame.
    pub prev_h: i16,
    /// Vertical position in the previous frame.
    pub prev_v: i16,
}

impl PictureRecord {
    /// Creates a stationary picture.
    #[inline]
    #[must_use]
    pub const fn new(sprite_id: u16, h: i16, v: i16) -> Self {
        Self {
            sprite_id,
            h,
            v,
            moving: false,
            prev_h: h,
            prev_v: v,
        }
    }

    /// The same placement, stationary. Used when a picture is replayed.
    #[inline]
    #[must_use]
    pub const fn replayed(self) -> Self {
        Self::new(self.sprite_id, self.h, self.v)
    }
}

/// A moving actor's position and pose for the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MobileRecord {
    /// Descriptor index.
    pub index: u8,
    /// Animation pose.
    pub pose: u8,
    /// Horizontal position.
    pub h: i16,
    /// Vertical position.
    pub v: i16,
    /// Color byte (health/balance tint).
    pub color: u8,
}

/// What a bubble represents. Bits 0-5 of the wire type byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BubbleKind {
    /// Plain speech.
    #[default]
    Normal,
    /// Whisper.
    Whisper,
    /// Yell.
    Yell,
    /// Thought.
    Thought,
    /// Server-described action.
    RealAction,
    /// Monster noise.
    Monster,
    /// Player emote.
    PlayerAction,
    /// Ponder.
    Ponder,
    /// Narration.
    Narrate,
    /// A kind this client does not know.
    Other(u8),
}

impl BubbleKind {
    /// Decodes a 6-bit kind value.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Self::Normal,
            1 => Self::Whisper,
            2 => Self::Yell,
            3 => Self::Thought,
            4 => Self::RealAction,
            5 => Self::Monster,
            6 => Self::PlayerAction,
            7 => Self::Ponder,
            8 => Self::Narrate,
            other => Self::Other(other),
        }
    }

    /// Encodes back to the 6-bit value.
    #[must_use]
    pub const fn to_bits(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Whisper => 1,
            Self::Yell => 2,
            Self::Thought => 3,
            Self::RealAction => 4,
            Self::Monster => 5,
            Self::PlayerAction => 6,
            Self::Ponder => 7,
            Self::Narrate => 8,
            Self::Other(bits) => bits,
        }
    }
}

/// A speech bubble attached to an entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BubbleRecord {
    /// Entity the bubble belongs to.
    pub entity_index: u8,
    /// Horizontal anchor.
    pub h: i16,
    /// Vertical anchor.
    pub v: i16,
    /// Anchored at an absolute position instead of the entity.
    pub far: bool,
    /// Bubble kind.
    pub kind: BubbleKind,
    /// Display text.
    pub text: String,
    /// Speaker name as resolved by the text collaborator.
    pub speaker: String,
    /// When the bubble disappears.
    pub expires_at: Timestamp,
}

impl BubbleRecord {
    /// Returns true once `now` has reached the expiry.
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// Status bars carried in every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatBars {
    /// Current health.
    pub hp: u8,
    /// Maximum health.
    pub hp_max: u8,
    /// Current spirit.
    pub sp: u8,
    /// Maximum spirit.
    pub sp_max: u8,
    /// Current balance.
    pub balance: u8,
    /// Maximum balance.
    pub balance_max: u8,
}

/// Lighting flags for the external lighting collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightingFlags(u8);

impl LightingFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// The area is darker than the ambient level.
    pub const AREA_DARKER: Self = Self(1 << 0);
    /// Shadows are disabled.
    pub const NO_SHADOWS: Self = Self(1 << 1);
    /// Brighten by 25%.
    pub const ADJUST_25: Self = Self(1 << 2);
    /// Brighten by 50%.
    pub const ADJUST_50: Self = Self(1 << 3);
    /// Force full brightness.
    pub const FORCE_FULL: Self = Self(1 << 6);
    /// Ignore the night cycle.
    pub const NO_NIGHT: Self = Self(1 << 7);

    /// Creates flags from the raw wire byte.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Checks if a specific flag is set.
    #[inline]
    #[must_use]
    pub const fn has(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }
}

/// Frame counters from the packet header.
///
/// Used by the sender for flow control and retransmission. The decoder
/// only extracts them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameCounters {
    /// Ack command byte.
    pub ack_command: u8,
    /// Last frame the server saw acknowledged.
    pub ack_frame: i32,
    /// Frame the server asks to resend from.
    pub resend_frame: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bubble_kind_bits() {
        for bits in 0..64u8 {
            assert_eq!(BubbleKind::from_bits(bits).to_bits(), bits);
        }
        assert_eq!(BubbleKind::from_bits(2), BubbleKind::Yell);
        assert_eq!(BubbleKind::from_bits(40), BubbleKind::Other(40));
    }

    #[test]
    fn test_replayed_picture_is_stationary() {
        let moving = PictureRecord {
            sprite_id: 7,
            h: 10,
            v: -4,
            moving: true,
            prev_h: 2,
            prev_v: -4,
        };
        let replay = moving.replayed();
        assert!(!replay.moving);
        assert_eq!((replay.prev_h, replay.prev_v), (10, -4));
    }

    #[test]
    fn test_lighting_flags() {
        let flags = LightingFlags::from_raw(0b1000_0010);
        assert!(flags.has(LightingFlags::NO_SHADOWS));
        assert!(flags.has(LightingFlags::NO_NIGHT));
        assert!(!flags.has(LightingFlags::FORCE_FULL));
    }

    #[test]
    fn test_bubble_expiry() {
        let bubble = BubbleRecord {
            entity_index: 1,
            h: 0,
            v: 0,
            far: false,
            kind: BubbleKind::Normal,
            text: "hi".into(),
            speaker: String::new(),
            expires_at: Timestamp::from_millis(4_000),
        };
        assert!(!bubble.is_expired(Timestamp::from_millis(3_999)));
        assert!(bubble.is_expired(Timestamp::from_millis(4_000)));
    }
}
