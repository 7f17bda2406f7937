//! # Draw-State Wire Types
//!
//! Layout of one draw-state payload (big-endian, header already stripped by
//! the framing layer):
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ ack cmd (1) │ ack frame (4) │ resend frame (4)              │
//! ├──────────────────────────────────────────────────────────────┤
//! │ n (1) │ n × { idx, kind, sprite(2), name\0, ncolors, colors } │
//! ├──────────────────────────────────────────────────────────────┤
//! │ hp │ hpmax │ sp │ spmax │ bal │ balmax │ light               │
//! ├──────────────────────────────────────────────────────────────┤
//! │ n (1) | 255 again n │ n × 36 bits { id:14 h:11 v:11 }      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ n (1) │ n × { idx, pose, h(2), v(2), color }                 │
//! ├──────────────────────────────────────────────────────────────┤
//! │ info\0 ... \0 │ bubbles │ sounds │ inventory                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use bytemuck::{Pod, Zeroable};
use cairn_shared::{BubbleKind, MobileRecord};

/// Picture count value announcing the extended `(again, count)` header.
pub const PICTURE_EXTENDED_SENTINEL: u8 = 255;

/// Width of a packed sprite ID.
pub const PICTURE_ID_BITS: u8 = 14;

/// Width of a packed coordinate.
pub const PICTURE_COORD_BITS: u8 = 11;

/// Bits per packed picture.
pub const PICTURE_BITS: usize = PICTURE_ID_BITS as usize + 2 * PICTURE_COORD_BITS as usize;

/// Size of the stats block.
pub const STATS_SIZE: usize = 7;

/// Bytes needed to hold `count` packed pictures.
#[inline]
#[must_use]
pub const fn packed_pictures_len(count: usize) -> usize {
    (count * PICTURE_BITS + 7) / 8
}

// ============================================================================
// PICTURES
// ============================================================================

/// Shape of the picture section header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PictureHeader {
    /// A single count byte; nothing is replayed.
    Simple {
        /// New pictures that follow.
        count: u8,
    },
    /// Sentinel followed by a replay length and a count.
    Extended {
        /// Leading pictures copied from the previous frame.
        again: u8,
        /// New pictures that follow.
        count: u8,
    },
}

impl Default for PictureHeader {
    fn default() -> Self {
        Self::Simple { count: 0 }
    }
}

impl PictureHeader {
    /// Pictures replayed from the previous frame.
    #[inline]
    #[must_use]
    pub const fn again(self) -> usize {
        match self {
            Self::Simple { .. } => 0,
            Self::Extended { again, .. } => again as usize,
        }
    }

    /// New pictures carried in this packet.
    #[inline]
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Self::Simple { count } | Self::Extended { count, .. } => count as usize,
        }
    }

    /// Length of the resulting picture list.
    #[inline]
    #[must_use]
    pub const fn total(self) -> usize {
        self.again() + self.count()
    }

    /// The smallest header that encodes `again` and `count`.
    #[must_use]
    pub const fn for_counts(again: u8, count: u8) -> Self {
        if again == 0 && count != PICTURE_EXTENDED_SENTINEL {
            Self::Simple { count }
        } else {
            Self::Extended { again, count }
        }
    }
}

// ============================================================================
// MOBILES
// ============================================================================

/// A mobile record exactly as it sits on the wire.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct WireMobile {
    /// Descriptor index.
    pub index: u8,
    /// Pose byte.
    pub pose: u8,
    /// Big-endian H.
    pub h: [u8; 2],
    /// Big-endian V.
    pub v: [u8; 2],
    /// Color byte.
    pub color: u8,
}

/// Size of a wire mobile.
pub const MOBILE_RECORD_SIZE: usize = std::mem::size_of::<WireMobile>();

impl WireMobile {
    /// Converts to the scene record.
    #[inline]
    #[must_use]
    pub const fn to_record(self) -> MobileRecord {
        MobileRecord {
            index: self.index,
            pose: self.pose,
            h: i16::from_be_bytes(self.h),
            v: i16::from_be_bytes(self.v),
            color: self.color,
        }
    }

    /// Converts from the scene record.
    #[inline]
    #[must_use]
    pub const fn from_record(record: &MobileRecord) -> Self {
        Self {
            index: record.index,
            pose: record.pose,
            h: record.h.to_be_bytes(),
            v: record.v.to_be_bytes(),
            color: record.color,
        }
    }
}

// ============================================================================
// BUBBLES
// ============================================================================

/// Bubble type bits holding the [`BubbleKind`].
pub const BUBBLE_KIND_MASK: u8 = 0x3F;
/// Bubble type bit: a language byte follows.
pub const BUBBLE_NOT_COMMON: u8 = 0x40;
/// Bubble type bit: an absolute position follows.
pub const BUBBLE_FAR: u8 = 0x80;

/// Language byte bits holding the [`Language`].
pub const LANGUAGE_MASK: u8 = 0x3F;
/// Language byte bits holding the [`Knowledge`] code.
pub const KNOWLEDGE_MASK: u8 = 0xC0;

/// Presence flags from the bubble type byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BubbleFlags {
    /// Spoken in something other than the common tongue.
    pub not_common: bool,
    /// Anchored at an absolute position.
    pub far: bool,
}

impl BubbleFlags {
    /// Splits the flag bits out of a type byte.
    #[inline]
    #[must_use]
    pub const fn from_type_byte(byte: u8) -> Self {
        Self {
            not_common: byte & BUBBLE_NOT_COMMON != 0,
            far: byte & BUBBLE_FAR != 0,
        }
    }

    /// The flag bits as they sit in the type byte.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        let mut bits = 0;
        if self.not_common {
            bits |= BUBBLE_NOT_COMMON;
        }
        if self.far {
            bits |= BUBBLE_FAR;
        }
        bits
    }
}

/// Spoken language of a bubble.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Language {
    Halfling,
    Sylvan,
    People,
    Thoom,
    Dwarven,
    GhorakZo,
    Ancient,
    Magic,
    Common,
    ThievesCant,
    Mystic,
    Monster,
    Unknown,
    Orga,
    Sirrush,
    Azcatl,
    Lepori,
    /// A language code this client does not know.
    Other(u8),
}

impl Language {
    /// Decodes the 6-bit language value.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & LANGUAGE_MASK {
            0 => Self::Halfling,
            1 => Self::Sylvan,
            2 => Self::People,
            3 => Self::Thoom,
            4 => Self::Dwarven,
            5 => Self::GhorakZo,
            6 => Self::Ancient,
            7 => Self::Magic,
            8 => Self::Common,
            9 => Self::ThievesCant,
            10 => Self::Mystic,
            11 => Self::Monster,
            12 => Self::Unknown,
            13 => Self::Orga,
            14 => Self::Sirrush,
            15 => Self::Azcatl,
            16 => Self::Lepori,
            other => Self::Other(other),
        }
    }

    /// Encodes back to the 6-bit value.
    #[must_use]
    pub const fn to_bits(self) -> u8 {
        match self {
            Self::Halfling => 0,
            Self::Sylvan => 1,
            Self::People => 2,
            Self::Thoom => 3,
            Self::Dwarven => 4,
            Self::GhorakZo => 5,
            Self::Ancient => 6,
            Self::Magic => 7,
            Self::Common => 8,
            Self::ThievesCant => 9,
            Self::Mystic => 10,
            Self::Monster => 11,
            Self::Unknown => 12,
            Self::Orga => 13,
            Self::Sirrush => 14,
            Self::Azcatl => 15,
            Self::Lepori => 16,
            Self::Other(bits) => bits & LANGUAGE_MASK,
        }
    }
}

/// How well the listener understands the language.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Knowledge {
    /// Understood.
    #[default]
    Known,
    /// Not understood; short utterance.
    UnknownShort,
    /// Not understood; medium utterance.
    UnknownMedium,
    /// Not understood; long utterance.
    UnknownLong,
}

impl Knowledge {
    /// Decodes bits 6-7 of the language byte.
    #[must_use]
    pub const fn from_language_byte(byte: u8) -> Self {
        match (byte & KNOWLEDGE_MASK) >> 6 {
            0 => Self::Known,
            1 => Self::UnknownShort,
            2 => Self::UnknownMedium,
            _ => Self::UnknownLong,
        }
    }

    /// Bits 6-7 of the language byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        let code: u8 = match self {
            Self::Known => 0,
            Self::UnknownShort => 1,
            Self::UnknownMedium => 2,
            Self::UnknownLong => 3,
        };
        code << 6
    }
}

/// The optional language byte of a bubble.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BubbleLanguage {
    /// Spoken language.
    pub language: Language,
    /// Listener's comprehension.
    pub knowledge: Knowledge,
}

impl BubbleLanguage {
    /// Decodes a language byte.
    #[inline]
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            language: Language::from_bits(byte),
            knowledge: Knowledge::from_language_byte(byte),
        }
    }

    /// Encodes back to the language byte.
    #[inline]
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self.language.to_bits() | self.knowledge.bits()
    }
}

/// Everything about a bubble except its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BubbleHeader {
    /// Speaking entity.
    pub entity_index: u8,
    /// Bubble kind.
    pub kind: BubbleKind,
    /// Language byte, present when not in the common tongue.
    pub language: Option<BubbleLanguage>,
    /// Absolute anchor, present for far bubbles.
    pub position: Option<(i16, i16)>,
}

impl BubbleHeader {
    /// Flags implied by the optional parts.
    #[inline]
    #[must_use]
    pub const fn flags(&self) -> BubbleFlags {
        BubbleFlags {
            not_common: self.language.is_some(),
            far: self.position.is_some(),
        }
    }

    /// The wire type byte.
    #[inline]
    #[must_use]
    pub const fn type_byte(&self) -> u8 {
        (self.kind.to_bits() & BUBBLE_KIND_MASK) | self.flags().bits()
    }
}

/// A bubble as decoded, payload still raw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BubbleEntry<'a> {
    /// Fixed part.
    pub header: BubbleHeader,
    /// Text payload, without its NUL.
    pub payload: &'a [u8],
}

// ============================================================================
// INVENTORY
// ============================================================================

/// Inventory command codes (low 7 bits of the command byte).
pub mod inventory_codes {
    /// End of stream.
    pub const NONE: u8 = 0;
    /// Full replacement.
    pub const FULL: u8 = 1;
    /// Add an item.
    pub const ADD: u8 = 2;
    /// Add an item, equipped.
    pub const ADD_EQUIP: u8 = 3;
    /// Remove an item.
    pub const DELETE: u8 = 4;
    /// Equip an item.
    pub const EQUIP: u8 = 5;
    /// Unequip an item.
    pub const UNEQUIP: u8 = 6;
    /// A counted batch of commands.
    pub const MULTIPLE: u8 = 7;
    /// Rename an item.
    pub const NAME: u8 = 8;
    /// Flag bit: an index byte follows the item ID.
    pub const INDEX_FLAG: u8 = 0x80;
}

/// One entry of a full inventory replacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InventoryItem {
    /// Item type.
    pub id: u16,
    /// Whether it is worn.
    pub equipped: bool,
}

/// Addresses one item instance: its type and, for duplicates, which one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemRef {
    /// Item type.
    pub id: u16,
    /// Instance index among items of the same type.
    pub index: Option<u8>,
}

/// A decoded inventory command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InventoryCommand {
    /// Replace the whole inventory.
    Full {
        /// New contents, in order.
        items: Vec<InventoryItem>,
    },
    /// Add an item.
    Add {
        /// Item added.
        item: ItemRef,
        /// Custom name, possibly empty.
        name: String,
    },
    /// Add an item already equipped.
    AddEquip {
        /// Item added.
        item: ItemRef,
        /// Custom name, possibly empty.
        name: String,
    },
    /// Remove an item.
    Delete {
        /// Item removed.
        item: ItemRef,
    },
    /// Equip an item.
    Equip {
        /// Item equipped.
        item: ItemRef,
    },
    /// Unequip an item.
    Unequip {
        /// Item unequipped.
        item: ItemRef,
    },
    /// Rename an item.
    Name {
        /// Item renamed.
        item: ItemRef,
        /// New name.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_mobile_is_seven_bytes() {
        assert_eq!(MOBILE_RECORD_SIZE, 7);
    }

    #[test]
    fn test_wire_mobile_conversion() {
        let wire = WireMobile {
            index: 3,
            pose: 9,
            h: [0xFF, 0x9C],
            v: [0x00, 0x64],
            color: 2,
        };
        let record = wire.to_record();
        assert_eq!((record.h, record.v), (-100, 100));
        assert_eq!(WireMobile::from_record(&record), wire);
    }

    #[test]
    fn test_picture_header_shapes() {
        assert_eq!(PictureHeader::for_counts(0, 4), PictureHeader::Simple { count: 4 });
        assert_eq!(
            PictureHeader::for_counts(0, 255),
            PictureHeader::Extended { again: 0, count: 255 }
        );
        let ext = PictureHeader::for_counts(3, 2);
        assert_eq!((ext.again(), ext.count(), ext.total()), (3, 2, 5));
        assert_eq!(packed_pictures_len(1), 5);
        assert_eq!(packed_pictures_len(2), 9);
    }

    #[test]
    fn test_bubble_type_byte_bits() {
        let header = BubbleHeader {
            entity_index: 1,
            kind: BubbleKind::Yell,
            language: Some(BubbleLanguage {
                language: Language::Thoom,
                knowledge: Knowledge::UnknownMedium,
            }),
            position: Some((5, -5)),
        };
        assert_eq!(header.type_byte(), 0x80 | 0x40 | 2);
        assert_eq!(BubbleFlags::from_type_byte(0xC2), header.flags());
        assert_eq!(BubbleFlags::from_type_byte(0x02), BubbleFlags::default());
    }

    #[test]
    fn test_language_byte() {
        let lang = BubbleLanguage::from_byte(0b1000_0011);
        assert_eq!(lang.language, Language::Thoom);
        assert_eq!(lang.knowledge, Knowledge::UnknownMedium);
        assert_eq!(lang.to_byte(), 0b1000_0011);
        assert_eq!(Language::from_bits(40), Language::Other(40));
    }
}
