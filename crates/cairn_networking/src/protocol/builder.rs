//! # Frame Builder
//!
//! Writes draw-state payloads in wire order. The mirror of the parser, used
//! by tests, benches and the capture tooling to produce packets by hand.
//!
//! Sections are appended in the order the methods are called; the builder
//! does not reorder or validate. Counts above 255 saturate, which makes an
//! intentionally malformed packet easy to write.

use cairn_shared::{DescriptorRecord, LightingFlags, MobileRecord, PictureRecord, StatBars};

use super::bits::BitWriter;
use super::packets::{
    inventory_codes, BubbleHeader, InventoryCommand, ItemRef, PictureHeader, WireMobile,
    PICTURE_COORD_BITS, PICTURE_EXTENDED_SENTINEL, PICTURE_ID_BITS,
};

#[inline]
fn count_byte(len: usize) -> u8 {
    u8::try_from(len).unwrap_or(u8::MAX)
}

/// Encodes text as single bytes; characters above U+00FF become `?`.
fn latin1_bytes(text: &str) -> impl Iterator<Item = u8> + '_ {
    text.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
}

/// Chainable payload writer.
#[derive(Clone, Debug, Default)]
pub struct FrameBuilder {
    buffer: Vec<u8>,
}

impl FrameBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Bytes written so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing has been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Ack command and frame counters.
    #[must_use]
    pub fn header(mut self, ack_command: u8, ack_frame: i32, resend_frame: i32) -> Self {
        self.buffer.push(ack_command);
        self.buffer.extend_from_slice(&ack_frame.to_be_bytes());
        self.buffer.extend_from_slice(&resend_frame.to_be_bytes());
        self
    }

    /// Descriptor table.
    #[must_use]
    pub fn descriptors(mut self, descriptors: &[DescriptorRecord]) -> Self {
        self.buffer.push(count_byte(descriptors.len()));
        for d in descriptors {
            self.buffer.push(d.index);
            self.buffer.push(d.kind);
            self.buffer.extend_from_slice(&d.sprite_id.to_be_bytes());
            self.put_cstr(&d.name);
            self.buffer.push(count_byte(d.colors.len()));
            self.buffer.extend_from_slice(&d.colors);
        }
        self
    }

    /// Bars and lighting.
    #[must_use]
    pub fn stats(mut self, bars: StatBars, lighting: LightingFlags) -> Self {
        self.buffer.extend_from_slice(&[
            bars.hp,
            bars.hp_max,
            bars.sp,
            bars.sp_max,
            bars.balance,
            bars.balance_max,
            lighting.raw(),
        ]);
        self
    }

    /// Picture header plus packed new pictures. `again` leading pictures are
    /// replayed from the previous frame.
    #[must_use]
    pub fn pictures(mut self, again: u8, pictures: &[PictureRecord]) -> Self {
        match PictureHeader::for_counts(again, count_byte(pictures.len())) {
            PictureHeader::Simple { count } => self.buffer.push(count),
            PictureHeader::Extended { again, count } => {
                self.buffer
                    .extend_from_slice(&[PICTURE_EXTENDED_SENTINEL, again, count]);
            }
        }

        let mut bits = BitWriter::new();
        for p in pictures {
            bits.write_bits(u32::from(p.sprite_id), PICTURE_ID_BITS);
            bits.write_signed(p.h, PICTURE_COORD_BITS);
            bits.write_signed(p.v, PICTURE_COORD_BITS);
        }
        self.buffer.extend_from_slice(bits.as_slice());
        self
    }

    /// Mobile table.
    #[must_use]
    pub fn mobiles(mut self, mobiles: &[MobileRecord]) -> Self {
        self.buffer.push(count_byte(mobiles.len()));
        for m in mobiles {
            self.buffer
                .extend_from_slice(bytemuck::bytes_of(&WireMobile::from_record(m)));
        }
        self
    }

    /// Info strings plus the empty terminator.
    #[must_use]
    pub fn info_strings(mut self, strings: &[&str]) -> Self {
        for s in strings {
            self.put_cstr(s);
        }
        self.buffer.push(0);
        self
    }

    /// Bubble list.
    #[must_use]
    pub fn bubbles(mut self, bubbles: &[(BubbleHeader, &str)]) -> Self {
        self.buffer.push(count_byte(bubbles.len()));
        for (header, text) in bubbles {
            self.buffer.push(header.entity_index);
            self.buffer.push(header.type_byte());
            if let Some(language) = header.language {
                self.buffer.push(language.to_byte());
            }
            if let Some((h, v)) = header.position {
                self.buffer.extend_from_slice(&h.to_be_bytes());
                self.buffer.extend_from_slice(&v.to_be_bytes());
            }
            self.put_cstr(text);
        }
        self
    }

    /// Sound list.
    #[must_use]
    pub fn sounds(mut self, sounds: &[u16]) -> Self {
        self.buffer.push(count_byte(sounds.len()));
        for id in sounds {
            self.buffer.extend_from_slice(&id.to_be_bytes());
        }
        self
    }

    /// Inventory commands. One command is written bare, several as a batch,
    /// none as a no-op command.
    #[must_use]
    pub fn inventory(mut self, commands: &[InventoryCommand]) -> Self {
        match commands {
            [] => self.buffer.push(inventory_codes::NONE),
            [single] => self.put_inventory(single),
            many => {
                self.buffer.push(inventory_codes::MULTIPLE);
                self.buffer.push(count_byte(many.len()));
                for command in many {
                    self.put_inventory(command);
                }
            }
        }
        self
    }

    /// Empty info, bubble and sound sections with no inventory byte.
    #[must_use]
    pub fn empty_tail(self) -> Self {
        self.info_strings(&[]).bubbles(&[]).sounds(&[])
    }

    /// Arbitrary bytes.
    #[must_use]
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    /// Returns the payload.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }

    fn put_cstr(&mut self, text: &str) {
        self.buffer.extend(latin1_bytes(text).filter(|&b| b != 0));
        self.buffer.push(0);
    }

    fn put_item(&mut self, code: u8, item: ItemRef) {
        match item.index {
            Some(index) => {
                self.buffer.push(code | inventory_codes::INDEX_FLAG);
                self.buffer.extend_from_slice(&item.id.to_be_bytes());
                self.buffer.push(index);
            }
            None => {
                self.buffer.push(code);
                self.buffer.extend_from_slice(&item.id.to_be_bytes());
            }
        }
    }

    fn put_inventory(&mut self, command: &InventoryCommand) {
        match command {
            InventoryCommand::Full { items } => {
                self.buffer.push(inventory_codes::FULL);
                self.buffer.push(count_byte(items.len()));
                let items = &items[..usize::from(count_byte(items.len()))];
                let mut mask = vec![0u8; (items.len() + 7) / 8];
                for (i, item) in items.iter().enumerate() {
                    if item.equipped {
                        mask[i / 8] |= 0x80 >> (i % 8);
                    }
                }
                self.buffer.extend_from_slice(&mask);
                for item in items {
                    self.buffer.extend_from_slice(&item.id.to_be_bytes());
                }
            }
            InventoryCommand::Add { item, name } => {
                self.put_item(inventory_codes::ADD, *item);
                self.put_cstr(name);
            }
            InventoryCommand::AddEquip { item, name } => {
                self.put_item(inventory_codes::ADD_EQUIP, *item);
                self.put_cstr(name);
            }
            InventoryCommand::Name { item, name } => {
                self.put_item(inventory_codes::NAME, *item);
                self.put_cstr(name);
            }
            InventoryCommand::Delete { item } => self.put_item(inventory_codes::DELETE, *item),
            InventoryCommand::Equip { item } => self.put_item(inventory_codes::EQUIP, *item),
            InventoryCommand::Unequip { item } => self.put_item(inventory_codes::UNEQUIP, *item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let bytes = FrameBuilder::new().header(2, 0x0102_0304, -1).finish();
        assert_eq!(bytes, vec![2, 1, 2, 3, 4, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_simple_and_extended_picture_headers() {
        let simple = FrameBuilder::new().pictures(0, &[]).finish();
        assert_eq!(simple, vec![0]);

        let extended = FrameBuilder::new().pictures(4, &[]).finish();
        assert_eq!(extended, vec![PICTURE_EXTENDED_SENTINEL, 4, 0]);
    }

    #[test]
    fn test_picture_packing_length() {
        let pictures = [PictureRecord::new(1, 2, 3), PictureRecord::new(4, 5, 6)];
        let bytes = FrameBuilder::new().pictures(0, &pictures).finish();
        // count byte + 72 bits
        assert_eq!(bytes.len(), 1 + 9);
    }

    #[test]
    fn test_empty_inventory_is_none_command() {
        let bytes = FrameBuilder::new().inventory(&[]).finish();
        assert_eq!(bytes, vec![inventory_codes::NONE]);
    }

    #[test]
    fn test_empty_tail() {
        let builder = FrameBuilder::new().empty_tail();
        assert_eq!(builder.len(), 3);
        assert_eq!(builder.finish(), vec![0, 0, 0]);
    }

    #[test]
    fn test_wide_characters_are_replaced() {
        let bytes = FrameBuilder::new().info_strings(&["é✓"]).finish();
        assert_eq!(bytes, vec![0xE9, b'?', 0, 0]);
    }
}
