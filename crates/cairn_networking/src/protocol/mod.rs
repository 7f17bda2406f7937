//! # Draw-State Protocol
//!
//! Wire format of the per-frame draw-state payload.
//!
//! ## Payload Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header: ack cmd (1) │ ack frame (4) │ resend frame (4)      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Descriptors: count (1), then index/kind/sprite/name/colors   │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Stats: 6 bar bytes │ lighting (1)                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Pictures: count (1) or 255/again/count, then 36 bits each    │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Mobiles: count (1), then 7-byte records                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Info strings: NUL-terminated, ended by an empty string       │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Bubbles: count (1), then variable entries                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Sounds: count (1), then u16 IDs                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Inventory: optional command stream                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Multi-byte integers are big-endian. Pictures are bit-packed with no
//! alignment between entries; the section is padded to a whole byte.

mod bits;
mod builder;
mod packets;
mod parser;
mod reader;

pub use bits::{sign_extend, BitReader, BitWriter};
pub use builder::FrameBuilder;
pub use packets::{
    inventory_codes, packed_pictures_len, BubbleEntry, BubbleFlags, BubbleHeader, BubbleLanguage,
    InventoryCommand, InventoryItem, ItemRef, Knowledge, Language, PictureHeader, WireMobile,
    MOBILE_RECORD_SIZE, PICTURE_BITS, PICTURE_EXTENDED_SENTINEL, STATS_SIZE,
};
pub use parser::{decode_frame, DecodedFrame, DecodedScene, DecodedTail, FrameDecoder};
pub use reader::{latin1, ByteReader};
