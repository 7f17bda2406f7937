//! # Draw-State Client
//!
//! Decode, commit and dispatch of draw-state payloads.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DRAW-STATE CLIENT                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐       │
//! │  │ FrameDecoder │─►│ commit_scene │─►│ Collaborator │       │
//! │  │ (no lock)    │  │ (locked)     │  │ dispatch     │       │
//! │  └──────────────┘  └──────────────┘  └──────────────┘       │
//! │                          │                                  │
//! │              ┌───────────▼───────────┐                      │
//! │              │  SharedDrawState      │◄── capture / blend   │
//! │              └───────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Commit Policy
//!
//! - `Partial`: the scene is committed as soon as the mobiles are decoded;
//!   the tail is then decoded and dispatched one section at a time. A tail
//!   failure leaves the scene committed.
//! - `Atomic`: the whole payload is decoded first. Nothing is committed or
//!   dispatched unless every section decodes.
//!
//! Either way an inventory collaborator rejection arrives after the commit.

use std::sync::Arc;

use parking_lot::Mutex;

use cairn_shared::{CommitPolicy, DecoderConfig, FrameCounters, Timestamp};

use crate::error::{DecodeResult, Stage, StageError, StageErrorKind};
use crate::integration::{BubbleTarget, FrameCollaborator, NullCollaborator};
use crate::interpolation::{blend, BlendedFrame};
use crate::protocol::{BubbleEntry, DecodedScene, FrameDecoder, InventoryCommand};
use crate::snapshot::DrawSnapshot;
use crate::state::{CommitSummary, PendingBubble, SharedDrawState};

/// Counters over the client's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Payloads fully handled.
    pub frames_decoded: u64,
    /// Payloads dropped.
    pub frames_dropped: u64,
    /// Drops by failing stage, indexed by [`Stage::index`].
    pub drops_by_stage: [u64; Stage::ALL.len()],
    /// Bubbles added to the scene.
    pub bubbles: u64,
    /// Sounds handed to the collaborator.
    pub sounds: u64,
}

impl DecoderStats {
    /// Drops recorded at `stage`.
    #[inline]
    #[must_use]
    pub const fn dropped_at(&self, stage: Stage) -> u64 {
        self.drops_by_stage[stage.index()]
    }
}

/// What one handled payload produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameReport {
    /// Header counters, for the sender's flow control.
    pub counters: FrameCounters,
    /// Result of the scene commit.
    pub commit: CommitSummary,
    /// Info strings the collaborator chose to display.
    pub info: Vec<String>,
    /// Bubbles added to the scene.
    pub bubbles: usize,
    /// Sounds played.
    pub sounds: usize,
    /// Inventory commands applied.
    pub inventory_commands: usize,
}

struct TailReport {
    info: Vec<String>,
    bubbles: usize,
    sounds: usize,
    inventory_commands: usize,
}

/// Decodes draw-state payloads into shared scene state.
///
/// All methods take `&self`; one client may be fed from several receive
/// paths at once.
pub struct DrawStateClient<C: FrameCollaborator = NullCollaborator> {
    state: Arc<SharedDrawState>,
    collaborator: C,
    stats: Mutex<DecoderStats>,
}

impl DrawStateClient<NullCollaborator> {
    /// Creates a client with no collaborator.
    #[must_use]
    pub fn new(config: DecoderConfig) -> Self {
        Self::with_collaborator(config, NullCollaborator)
    }
}

impl<C: FrameCollaborator> DrawStateClient<C> {
    /// Creates a client that dispatches to `collaborator`.
    #[must_use]
    pub fn with_collaborator(config: DecoderConfig, collaborator: C) -> Self {
        Self::with_state(SharedDrawState::shared(config), collaborator)
    }

    /// Creates a client over existing shared state.
    #[must_use]
    pub fn with_state(state: Arc<SharedDrawState>, collaborator: C) -> Self {
        Self {
            state,
            collaborator,
            stats: Mutex::new(DecoderStats::default()),
        }
    }

    /// The shared state this client writes.
    #[must_use]
    pub fn state(&self) -> &Arc<SharedDrawState> {
        &self.state
    }

    /// The collaborator.
    #[must_use]
    pub fn collaborator(&self) -> &C {
        &self.collaborator
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> DecoderStats {
        *self.stats.lock()
    }

    /// Handles one payload at the current clock reading.
    ///
    /// # Errors
    ///
    /// Returns the [`StageError`] that dropped the payload.
    pub fn handle_packet(&self, payload: &[u8]) -> DecodeResult<FrameReport> {
        self.handle_packet_at(payload, self.state.now())
    }

    /// Handles one payload as if it arrived at `now`.
    ///
    /// # Errors
    ///
    /// Returns the [`StageError`] that dropped the payload.
    pub fn handle_packet_at(&self, payload: &[u8], now: Timestamp) -> DecodeResult<FrameReport> {
        let result = self.process(payload, now);

        let mut stats = self.stats.lock();
        match &result {
            Ok(report) => {
                stats.frames_decoded += 1;
                stats.bubbles += report.bubbles as u64;
                stats.sounds += report.sounds as u64;
            }
            Err(err) => {
                stats.frames_dropped += 1;
                stats.drops_by_stage[err.stage.index()] += 1;
                drop(stats);
                tracing::warn!(
                    stage = %err.stage,
                    error = %err.kind,
                    len = payload.len(),
                    "dropped draw-state packet"
                );
            }
        }
        result
    }

    /// Captures the scene and blends it for rendering now.
    #[must_use]
    pub fn render_frame(&self) -> (DrawSnapshot, BlendedFrame) {
        let now = self.state.now();
        let snapshot = self.state.capture(now);
        let frame = blend(&snapshot, now, &self.state.blend_settings());
        (snapshot, frame)
    }

    fn process(&self, payload: &[u8], now: Timestamp) -> DecodeResult<FrameReport> {
        let config = self.state.config();
        let mut decoder = FrameDecoder::new(payload, config.limits);
        let scene = decoder.decode_scene()?;
        let counters = scene.counters;

        let (commit, tail) = match config.commit_policy {
            CommitPolicy::Partial => {
                let commit = self.commit(scene, now)?;
                let info = self.dispatch_info(&decoder.info_strings()?);
                let bubbles = self.dispatch_bubbles(&decoder.bubbles()?, now);
                let sounds = self.dispatch_sounds(&decoder.sounds()?);
                let inventory_commands = self.dispatch_inventory(&decoder.inventory()?)?;
                let tail = TailReport {
                    info,
                    bubbles,
                    sounds,
                    inventory_commands,
                };
                (commit, tail)
            }
            CommitPolicy::Atomic => {
                let decoded = decoder.decode_tail()?;
                let commit = self.commit(scene, now)?;
                let tail = TailReport {
                    info: self.dispatch_info(&decoded.info),
                    bubbles: self.dispatch_bubbles(&decoded.bubbles, now),
                    sounds: self.dispatch_sounds(&decoded.sounds),
                    inventory_commands: self.dispatch_inventory(&decoded.inventory)?,
                };
                (commit, tail)
            }
        };

        Ok(FrameReport {
            counters,
            commit,
            info: tail.info,
            bubbles: tail.bubbles,
            sounds: tail.sounds,
            inventory_commands: tail.inventory_commands,
        })
    }

    fn commit(&self, scene: DecodedScene, now: Timestamp) -> DecodeResult<CommitSummary> {
        for descriptor in &scene.descriptors {
            self.collaborator.remember_appearance(descriptor);
        }
        self.collaborator.lighting(scene.lighting);
        self.state.commit_scene(scene, now)
    }

    fn dispatch_info(&self, strings: &[&[u8]]) -> Vec<String> {
        strings
            .iter()
            .filter_map(|raw| self.collaborator.info_text(raw))
            .filter(|text| !text.is_empty())
            .collect()
    }

    fn dispatch_bubbles(&self, entries: &[BubbleEntry<'_>], now: Timestamp) -> usize {
        if entries.is_empty() {
            return 0;
        }
        let pending: Vec<PendingBubble> = entries
            .iter()
            .filter_map(|entry| {
                let resolved = self.collaborator.bubble_text(&entry.header, entry.payload);
                tracing::trace!(
                    entity = entry.header.entity_index,
                    kind = ?entry.header.kind,
                    target = ?resolved.target,
                    "bubble"
                );
                if resolved.target == BubbleTarget::Hidden {
                    return None;
                }
                Some(PendingBubble {
                    entity_index: entry.header.entity_index,
                    kind: entry.header.kind,
                    position: entry.header.position,
                    text: resolved.text,
                    speaker: resolved.speaker,
                })
            })
            .collect();
        self.state.append_bubbles(pending, now)
    }

    fn dispatch_sounds(&self, sounds: &[u16]) -> usize {
        for &id in sounds {
            tracing::trace!(id, "sound");
            self.collaborator.play_sound(id);
        }
        sounds.len()
    }

    fn dispatch_inventory(&self, commands: &[InventoryCommand]) -> DecodeResult<usize> {
        if commands.is_empty() {
            return Ok(0);
        }
        self.collaborator.apply_inventory(commands).map_err(|err| {
            StageError::new(Stage::Inventory, StageErrorKind::Collaborator(err.to_string()))
        })?;
        Ok(commands.len())
    }
}

impl Default for DrawStateClient<NullCollaborator> {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}
