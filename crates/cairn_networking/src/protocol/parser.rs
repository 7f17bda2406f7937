//! # Stage-Tracked Parser
//!
//! Decodes one draw-state payload section by section. Each section method
//! consumes exactly its bytes and tags any failure with its [`Stage`], so a
//! dropped packet in the logs says where it broke.
//!
//! Decoding here is pure: nothing touches shared state. The split into
//! [`FrameDecoder::decode_scene`] and [`FrameDecoder::decode_tail`] lets the
//! caller commit the scene before or after the tail is decoded, depending on
//! its [`cairn_shared::CommitPolicy`].

use cairn_shared::{
    BubbleKind, DescriptorRecord, FrameCounters, LightingFlags, Limits, MobileRecord,
    PictureRecord, StatBars,
};

use super::bits::BitReader;
use super::packets::{
    inventory_codes, packed_pictures_len, BubbleEntry, BubbleFlags, BubbleHeader, BubbleLanguage,
    InventoryCommand, InventoryItem, ItemRef, PictureHeader, WireMobile, BUBBLE_KIND_MASK,
    MOBILE_RECORD_SIZE, PICTURE_COORD_BITS, PICTURE_EXTENDED_SENTINEL, PICTURE_ID_BITS,
    STATS_SIZE,
};
use super::reader::{latin1, ByteReader};
use crate::error::{DecodeResult, Stage, StageError, StageErrorKind};

/// Scene sections: everything the commit step needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedScene {
    /// Header counters.
    pub counters: FrameCounters,
    /// Descriptor table entries in wire order.
    pub descriptors: Vec<DescriptorRecord>,
    /// Status bars.
    pub bars: StatBars,
    /// Lighting flags.
    pub lighting: LightingFlags,
    /// Picture section shape.
    pub picture_header: PictureHeader,
    /// Newly packed pictures (the suffix after the replayed prefix).
    pub new_pictures: Vec<PictureRecord>,
    /// Mobiles in wire order.
    pub mobiles: Vec<MobileRecord>,
}

/// Tail sections, borrowed from the packet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedTail<'a> {
    /// Non-empty info strings.
    pub info: Vec<&'a [u8]>,
    /// Bubbles, payloads still raw.
    pub bubbles: Vec<BubbleEntry<'a>>,
    /// Sound IDs.
    pub sounds: Vec<u16>,
    /// Inventory commands, flattened.
    pub inventory: Vec<InventoryCommand>,
}

/// A fully decoded payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    /// Scene sections.
    pub scene: DecodedScene,
    /// Tail sections.
    pub tail: DecodedTail<'a>,
}

/// Decodes a whole payload without touching any state.
///
/// # Errors
///
/// Returns the first [`StageError`] encountered.
pub fn decode_frame<'a>(data: &'a [u8], limits: &Limits) -> DecodeResult<DecodedFrame<'a>> {
    let mut decoder = FrameDecoder::new(data, *limits);
    let scene = decoder.decode_scene()?;
    let tail = decoder.decode_tail()?;
    Ok(DecodedFrame { scene, tail })
}

trait OrStage<T> {
    fn or_stage(self, stage: Stage) -> DecodeResult<T>;
}

impl<T> OrStage<T> for Option<T> {
    #[inline]
    fn or_stage(self, stage: Stage) -> DecodeResult<T> {
        self.ok_or(StageError::truncated(stage))
    }
}

#[inline]
fn check_bound(stage: Stage, count: usize, max: usize) -> DecodeResult<()> {
    if count > max {
        return Err(StageError::bounds(stage, count, max));
    }
    Ok(())
}

/// Section-by-section decoder over one payload.
#[derive(Clone, Debug)]
pub struct FrameDecoder<'a> {
    reader: ByteReader<'a>,
    limits: Limits,
}

impl<'a> FrameDecoder<'a> {
    /// Creates a decoder at the start of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8], limits: Limits) -> Self {
        Self {
            reader: ByteReader::new(data),
            limits,
        }
    }

    /// Byte offset of the next section.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.reader.position()
    }

    /// Decodes header, descriptors, stats, pictures and mobiles.
    ///
    /// # Errors
    ///
    /// Returns the first [`StageError`] in those sections.
    pub fn decode_scene(&mut self) -> DecodeResult<DecodedScene> {
        let counters = self.header()?;
        let descriptors = self.descriptors()?;
        let (bars, lighting) = self.stats()?;
        let picture_header = self.picture_header()?;
        let new_pictures = self.pictures(picture_header)?;
        let mobiles = self.mobiles()?;

        Ok(DecodedScene {
            counters,
            descriptors,
            bars,
            lighting,
            picture_header,
            new_pictures,
            mobiles,
        })
    }

    /// Decodes info strings, bubbles, sounds and inventory.
    ///
    /// # Errors
    ///
    /// Returns the first [`StageError`] in those sections.
    pub fn decode_tail(&mut self) -> DecodeResult<DecodedTail<'a>> {
        Ok(DecodedTail {
            info: self.info_strings()?,
            bubbles: self.bubbles()?,
            sounds: self.sounds()?,
            inventory: self.inventory()?,
        })
    }

    // ========================================================================
    // SCENE SECTIONS
    // ========================================================================

    /// Ack command plus the two frame counters.
    ///
    /// # Errors
    ///
    /// [`Stage::Header`] if the packet is shorter than nine bytes.
    pub fn header(&mut self) -> DecodeResult<FrameCounters> {
        let ack_command = self.reader.read_u8().or_stage(Stage::Header)?;
        let ack_frame = self.reader.read_i32().or_stage(Stage::Header)?;
        let resend_frame = self.reader.read_i32().or_stage(Stage::Header)?;
        Ok(FrameCounters {
            ack_command,
            ack_frame,
            resend_frame,
        })
    }

    /// The descriptor table.
    ///
    /// # Errors
    ///
    /// [`Stage::DescriptorCount`] for a missing or oversized count,
    /// [`Stage::Descriptor`] for a truncated entry.
    pub fn descriptors(&mut self) -> DecodeResult<Vec<DescriptorRecord>> {
        let count = usize::from(self.reader.read_u8().or_stage(Stage::DescriptorCount)?);
        check_bound(Stage::DescriptorCount, count, self.limits.max_descriptors)?;

        let mut descriptors = Vec::with_capacity(count);
        for _ in 0..count {
            let index = self.reader.read_u8().or_stage(Stage::Descriptor)?;
            let kind = self.reader.read_u8().or_stage(Stage::Descriptor)?;
            let sprite_id = self.reader.read_u16().or_stage(Stage::Descriptor)?;
            let name = self.reader.read_cstr().or_stage(Stage::Descriptor)?;
            let color_count = self.reader.read_u8().or_stage(Stage::Descriptor)?;
            let colors = self
                .reader
                .read_bytes(usize::from(color_count))
                .or_stage(Stage::Descriptor)?;

            descriptors.push(DescriptorRecord {
                index,
                kind,
                sprite_id,
                name: latin1(name),
                colors: colors.to_vec(),
            });
        }
        Ok(descriptors)
    }

    /// The seven-byte stats block.
    ///
    /// # Errors
    ///
    /// [`Stage::Stats`] if fewer than seven bytes remain.
    pub fn stats(&mut self) -> DecodeResult<(StatBars, LightingFlags)> {
        let b = self.reader.read_bytes(STATS_SIZE).or_stage(Stage::Stats)?;
        let bars = StatBars {
            hp: b[0],
            hp_max: b[1],
            sp: b[2],
            sp_max: b[3],
            balance: b[4],
            balance_max: b[5],
        };
        Ok((bars, LightingFlags::from_raw(b[6])))
    }

    /// The picture count, expanding the sentinel form.
    ///
    /// # Errors
    ///
    /// [`Stage::PictureCount`] for a missing or oversized simple count,
    /// [`Stage::PictureHeader`] for a truncated or oversized extended header.
    pub fn picture_header(&mut self) -> DecodeResult<PictureHeader> {
        let first = self.reader.read_u8().or_stage(Stage::PictureCount)?;
        let (header, stage) = if first == PICTURE_EXTENDED_SENTINEL {
            let again = self.reader.read_u8().or_stage(Stage::PictureHeader)?;
            let count = self.reader.read_u8().or_stage(Stage::PictureHeader)?;
            (PictureHeader::Extended { again, count }, Stage::PictureHeader)
        } else {
            (PictureHeader::Simple { count: first }, Stage::PictureCount)
        };
        check_bound(stage, header.total(), self.limits.max_pictures)?;
        Ok(header)
    }

    /// The bit-packed picture suffix announced by `header`.
    ///
    /// # Errors
    ///
    /// [`Stage::Pictures`] if the packed bytes are not all present.
    pub fn pictures(&mut self, header: PictureHeader) -> DecodeResult<Vec<PictureRecord>> {
        let count = header.count();
        if self.reader.remaining() < packed_pictures_len(count) {
            return Err(StageError::truncated(Stage::Pictures));
        }

        let mut bits = BitReader::new(self.reader.rest());
        let mut pictures = Vec::with_capacity(count);
        for _ in 0..count {
            // 14 bits always fit.
            let sprite_id = bits.read_bits(PICTURE_ID_BITS) as u16;
            let h = bits.read_signed(PICTURE_COORD_BITS);
            let v = bits.read_signed(PICTURE_COORD_BITS);
            pictures.push(PictureRecord::new(sprite_id, h, v));
        }
        self.reader
            .advance(bits.bytes_consumed())
            .or_stage(Stage::Pictures)?;
        Ok(pictures)
    }

    /// The mobile table.
    ///
    /// # Errors
    ///
    /// [`Stage::MobileCount`] for a missing or oversized count,
    /// [`Stage::Mobiles`] for truncated records.
    pub fn mobiles(&mut self) -> DecodeResult<Vec<MobileRecord>> {
        let count = usize::from(self.reader.read_u8().or_stage(Stage::MobileCount)?);
        check_bound(Stage::MobileCount, count, self.limits.max_mobiles)?;
        if self.reader.remaining() < count * MOBILE_RECORD_SIZE {
            return Err(StageError::truncated(Stage::Mobiles));
        }

        let mut mobiles = Vec::with_capacity(count);
        for _ in 0..count {
            let wire: WireMobile = self.reader.read_pod().or_stage(Stage::Mobiles)?;
            mobiles.push(wire.to_record());
        }
        Ok(mobiles)
    }

    // ========================================================================
    // TAIL SECTIONS
    // ========================================================================

    /// Info strings up to the empty terminator.
    ///
    /// # Errors
    ///
    /// [`Stage::InfoStrings`] if a string or the terminator is missing.
    pub fn info_strings(&mut self) -> DecodeResult<Vec<&'a [u8]>> {
        let mut strings = Vec::new();
        loop {
            let text = self.reader.read_cstr().or_stage(Stage::InfoStrings)?;
            if text.is_empty() {
                return Ok(strings);
            }
            strings.push(text);
        }
    }

    /// The bubble list.
    ///
    /// # Errors
    ///
    /// [`Stage::BubbleCount`] for a missing or oversized count,
    /// [`Stage::Bubble`] for a truncated entry.
    pub fn bubbles(&mut self) -> DecodeResult<Vec<BubbleEntry<'a>>> {
        let count = usize::from(self.reader.read_u8().or_stage(Stage::BubbleCount)?);
        check_bound(Stage::BubbleCount, count, self.limits.max_bubbles)?;

        let mut bubbles = Vec::with_capacity(count);
        for _ in 0..count {
            bubbles.push(self.bubble()?);
        }
        Ok(bubbles)
    }

    fn bubble(&mut self) -> DecodeResult<BubbleEntry<'a>> {
        let entity_index = self.reader.read_u8().or_stage(Stage::Bubble)?;
        let type_byte = self.reader.read_u8().or_stage(Stage::Bubble)?;
        let flags = BubbleFlags::from_type_byte(type_byte);

        let language = if flags.not_common {
            let byte = self.reader.read_u8().or_stage(Stage::Bubble)?;
            Some(BubbleLanguage::from_byte(byte))
        } else {
            None
        };
        let position = if flags.far {
            let h = self.reader.read_i16().or_stage(Stage::Bubble)?;
            let v = self.reader.read_i16().or_stage(Stage::Bubble)?;
            Some((h, v))
        } else {
            None
        };
        let payload = self.reader.read_cstr().or_stage(Stage::Bubble)?;

        Ok(BubbleEntry {
            header: BubbleHeader {
                entity_index,
                kind: BubbleKind::from_bits(type_byte & BUBBLE_KIND_MASK),
                language,
                position,
            },
            payload,
        })
    }

    /// The sound list.
    ///
    /// # Errors
    ///
    /// [`Stage::SoundCount`] for a missing or oversized count,
    /// [`Stage::Sounds`] for truncated IDs.
    pub fn sounds(&mut self) -> DecodeResult<Vec<u16>> {
        let count = usize::from(self.reader.read_u8().or_stage(Stage::SoundCount)?);
        check_bound(Stage::SoundCount, count, self.limits.max_sounds)?;

        let mut sounds = Vec::with_capacity(count);
        for _ in 0..count {
            sounds.push(self.reader.read_u16().or_stage(Stage::Sounds)?);
        }
        Ok(sounds)
    }

    /// The inventory command stream. An exhausted packet means no change.
    ///
    /// # Errors
    ///
    /// [`Stage::Inventory`] for truncated, unknown or too many commands.
    pub fn inventory(&mut self) -> DecodeResult<Vec<InventoryCommand>> {
        let mut commands = Vec::new();
        if let Some(code) = self.reader.read_u8() {
            self.inventory_command(code, &mut commands, true)?;
        }
        Ok(commands)
    }

    fn inventory_command(
        &mut self,
        code: u8,
        out: &mut Vec<InventoryCommand>,
        allow_batch: bool,
    ) -> DecodeResult<()> {
        use inventory_codes::{
            ADD, ADD_EQUIP, DELETE, EQUIP, FULL, INDEX_FLAG, MULTIPLE, NAME, NONE, UNEQUIP,
        };

        let indexed = code & INDEX_FLAG != 0;
        match code & !INDEX_FLAG {
            NONE => {}
            FULL => {
                let count = usize::from(self.reader.read_u8().or_stage(Stage::Inventory)?);
                let equip_bits = self
                    .reader
                    .read_bytes((count + 7) / 8)
                    .or_stage(Stage::Inventory)?;
                let mut items = Vec::with_capacity(count);
                for i in 0..count {
                    let id = self.reader.read_u16().or_stage(Stage::Inventory)?;
                    let equipped = equip_bits[i / 8] & (0x80 >> (i % 8)) != 0;
                    items.push(InventoryItem { id, equipped });
                }
                out.push(InventoryCommand::Full { items });
            }
            MULTIPLE if allow_batch => {
                let count = usize::from(self.reader.read_u8().or_stage(Stage::Inventory)?);
                check_bound(Stage::Inventory, count, self.limits.max_inventory_commands)?;
                for _ in 0..count {
                    let code = self.reader.read_u8().or_stage(Stage::Inventory)?;
                    self.inventory_command(code, out, false)?;
                }
            }
            MULTIPLE => {
                return Err(StageError::new(
                    Stage::Inventory,
                    StageErrorKind::Malformed("nested inventory batch"),
                ))
            }
            ADD | ADD_EQUIP | NAME => {
                let item = self.item_ref(indexed)?;
                let name = latin1(self.reader.read_cstr().or_stage(Stage::Inventory)?);
                out.push(match code & !INDEX_FLAG {
                    ADD => InventoryCommand::Add { item, name },
                    ADD_EQUIP => InventoryCommand::AddEquip { item, name },
                    _ => InventoryCommand::Name { item, name },
                });
            }
            DELETE => out.push(InventoryCommand::Delete {
                item: self.item_ref(indexed)?,
            }),
            EQUIP => out.push(InventoryCommand::Equip {
                item: self.item_ref(indexed)?,
            }),
            UNEQUIP => out.push(InventoryCommand::Unequip {
                item: self.item_ref(indexed)?,
            }),
            _ => {
                return Err(StageError::new(
                    Stage::Inventory,
                    StageErrorKind::Malformed("unknown inventory command"),
                ))
            }
        }
        check_bound(Stage::Inventory, out.len(), self.limits.max_inventory_commands)
    }

    fn item_ref(&mut self, indexed: bool) -> DecodeResult<ItemRef> {
        let id = self.reader.read_u16().or_stage(Stage::Inventory)?;
        let index = if indexed {
            Some(self.reader.read_u8().or_stage(Stage::Inventory)?)
        } else {
            None
        };
        Ok(ItemRef { id, index })
    }
}
