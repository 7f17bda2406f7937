//! # Shared Draw State
//!
//! The one mutable aggregate of scene data, written by the decoder and copied
//! by the render tick.
//!
//! ```text
//! network thread(s)                       render thread
//! ─────────────────                       ─────────────
//! decode (no lock)
//!     │
//!     ▼
//! commit_scene ──► [ Mutex<DrawState> ] ◄── capture ──► blend (no lock)
//! append_bubbles ─┘
//! ```
//!
//! Every access goes through a method on [`SharedDrawState`]; no reference
//! into the locked state ever leaves this crate. "Previous" data is moved
//! aside in the same critical section that overwrites "current", so a
//! capture never sees one without the other. Picture linking runs on a copy
//! taken before the commit lock and is redone only if another commit won.

use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard, RwLock};

use cairn_shared::{
    BlendSettings, BubbleKind, BubbleRecord, DecoderConfig, DescriptorRecord, FrameCounters,
    LightingFlags, MobileRecord, PictureRecord, PlayfieldBounds, StatBars, Timestamp,
};

use crate::error::{DecodeResult, Stage, StageError, StageErrorKind};
use crate::motion::{estimate_shift, link_pictures};
use crate::protocol::DecodedScene;

/// Scene data behind the lock.
#[derive(Clone, Debug, Default)]
pub(crate) struct DrawState {
    pub(crate) descriptors: BTreeMap<u8, DescriptorRecord>,
    pub(crate) pictures: Vec<PictureRecord>,
    pub(crate) pict_again: usize,
    pub(crate) mobiles: BTreeMap<u8, MobileRecord>,
    pub(crate) prev_mobiles: BTreeMap<u8, MobileRecord>,
    pub(crate) prev_descriptors: BTreeMap<u8, DescriptorRecord>,
    pub(crate) picture_shift: Option<(i16, i16)>,
    pub(crate) prev_time: Timestamp,
    pub(crate) cur_time: Timestamp,
    pub(crate) bubbles: Vec<BubbleRecord>,
    pub(crate) bars: StatBars,
    pub(crate) prev_bars: StatBars,
    pub(crate) lighting: LightingFlags,
    pub(crate) frame: FrameCounters,
    pub(crate) last_arrival: Option<Timestamp>,
    pub(crate) generation: u64,
}

/// What one commit changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitSummary {
    /// State generation after the commit.
    pub generation: u64,
    /// Descriptors written this frame.
    pub descriptors: usize,
    /// Pictures replayed from the previous frame.
    pub replayed: usize,
    /// Pictures in the new list.
    pub pictures: usize,
    /// Mobiles in the new table.
    pub mobiles: usize,
    /// Estimated scroll between the two picture lists.
    pub shift: Option<(i16, i16)>,
    /// Interpolation interval chosen for this frame.
    pub interval: Duration,
}

/// A decoded bubble whose text has already been resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingBubble {
    /// Speaking entity.
    pub entity_index: u8,
    /// Bubble style.
    pub kind: BubbleKind,
    /// Absolute position for far bubbles.
    pub position: Option<(i16, i16)>,
    /// Display text.
    pub text: String,
    /// Speaker name.
    pub speaker: String,
}

/// Picture list linked against the state at generation `base`.
#[derive(Debug)]
struct ResolvedPictures {
    base: u64,
    result: DecodeResult<(Vec<PictureRecord>, Option<(i16, i16)>)>,
}

/// Replays `again` pictures from `prev`, appends `new` and links the suffix.
fn build_pictures(
    prev: &[PictureRecord],
    again: usize,
    new: &[PictureRecord],
    playfield: &PlayfieldBounds,
    max_shift: i32,
) -> DecodeResult<(Vec<PictureRecord>, Option<(i16, i16)>)> {
    if again > prev.len() {
        return Err(StageError::new(
            Stage::Pictures,
            StageErrorKind::MissingDeltaBase {
                again,
                available: prev.len(),
            },
        ));
    }

    let mut pictures = Vec::with_capacity(again + new.len());
    pictures.extend(prev[..again].iter().map(|p| p.replayed()));
    pictures.extend_from_slice(new);

    let shift = estimate_shift(prev, &pictures, playfield, max_shift);
    link_pictures(prev, &mut pictures[again..], shift);
    Ok((pictures, shift))
}

/// Lock-guarded scene state plus the settings that shape it.
#[derive(Debug)]
pub struct SharedDrawState {
    state: Mutex<DrawState>,
    config: RwLock<DecoderConfig>,
    epoch: Instant,
}

impl SharedDrawState {
    /// Creates empty state.
    #[must_use]
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            state: Mutex::new(DrawState::default()),
            config: RwLock::new(config),
            epoch: Instant::now(),
        }
    }

    /// Creates empty state behind an [`Arc`].
    #[must_use]
    pub fn shared(config: DecoderConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> DecoderConfig {
        *self.config.read()
    }

    /// Current blend settings.
    #[must_use]
    pub fn blend_settings(&self) -> BlendSettings {
        self.config.read().blend
    }

    /// Replaces the blend settings. Takes effect on the next commit or capture.
    pub fn set_blend_settings(&self, blend: BlendSettings) {
        self.config.write().blend = blend;
        tracing::debug!(?blend, "blend settings changed");
    }

    /// Reads the decoder clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        Timestamp::since(self.epoch, Instant::now())
    }

    /// Number of commits so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, DrawState> {
        self.state.lock()
    }

    /// Replaces live scene data with a decoded frame.
    ///
    /// The replay prefix is resolved against the picture list already held,
    /// so a replay longer than that list fails before anything changes.
    ///
    /// # Errors
    ///
    /// [`StageErrorKind::MissingDeltaBase`] at [`Stage::Pictures`].
    pub fn commit_scene(&self, scene: DecodedScene, now: Timestamp) -> DecodeResult<CommitSummary> {
        let resolved = self.resolve_pictures(&scene);
        self.install_scene(scene, resolved, now)
    }

    /// Links the frame's pictures against a copy of the current list.
    ///
    /// The shift vote and the nearest-match scans run without the lock held.
    fn resolve_pictures(&self, scene: &DecodedScene) -> ResolvedPictures {
        let (base, prev) = {
            let state = self.state.lock();
            (state.generation, state.pictures.clone())
        };
        let (playfield, max_shift) = {
            let config = self.config.read();
            (config.playfield, config.blend.max_shift)
        };
        ResolvedPictures {
            base,
            result: build_pictures(
                &prev,
                scene.picture_header.again(),
                &scene.new_pictures,
                &playfield,
                max_shift,
            ),
        }
    }

    fn install_scene(
        &self,
        scene: DecodedScene,
        resolved: ResolvedPictures,
        now: Timestamp,
    ) -> DecodeResult<CommitSummary> {
        let (blend, timing, playfield) = {
            let config = self.config.read();
            (config.blend, config.timing, config.playfield)
        };
        let again = scene.picture_header.again();

        let mut guard = self.state.lock();
        let state = &mut *guard;

        // Another commit landed since the copy; link against its list instead.
        let (pictures, shift) = if state.generation == resolved.base {
            resolved.result?
        } else {
            build_pictures(
                &state.pictures,
                again,
                &scene.new_pictures,
                &playfield,
                blend.max_shift,
            )?
        };

        // Previous before current.
        if blend.keeps_previous() {
            state.prev_mobiles = mem::take(&mut state.mobiles);
            state.prev_descriptors.clone_from(&state.descriptors);
        } else {
            state.prev_mobiles.clear();
            state.prev_descriptors.clear();
        }

        let descriptor_count = scene.descriptors.len();
        for descriptor in scene.descriptors {
            state.descriptors.insert(descriptor.index, descriptor);
        }
        state.mobiles = scene.mobiles.into_iter().map(|m| (m.index, m)).collect();
        state.pictures = pictures;
        state.pict_again = again;
        state.picture_shift = shift;

        state.prev_bars = state.bars;
        state.bars = scene.bars;
        state.lighting = scene.lighting;
        state.frame = scene.counters;

        let measured = state.last_arrival.map(|last| now - last);
        let interval = timing.frame_interval(measured);
        state.prev_time = now;
        state.cur_time = now + interval;
        state.last_arrival = Some(now);
        state.generation += 1;

        let summary = CommitSummary {
            generation: state.generation,
            descriptors: descriptor_count,
            replayed: again,
            pictures: state.pictures.len(),
            mobiles: state.mobiles.len(),
            shift,
            interval,
        };
        drop(guard);

        tracing::debug!(
            generation = summary.generation,
            ack_frame = scene.counters.ack_frame,
            pictures = summary.pictures,
            replayed = summary.replayed,
            mobiles = summary.mobiles,
            ?shift,
            interval_ms = summary.interval.as_millis(),
            "committed draw state"
        );
        Ok(summary)
    }

    /// Adds resolved bubbles. Bubbles with empty text are skipped.
    ///
    /// Near bubbles sit on the speaker's current mobile, or at the field
    /// centre if the speaker has none. Returns how many were added.
    pub fn append_bubbles(
        &self,
        bubbles: impl IntoIterator<Item = PendingBubble>,
        now: Timestamp,
    ) -> usize {
        let expires_at = now + self.config.read().timing.bubble_lifetime();

        let mut state = self.state.lock();
        state.bubbles.retain(|b| !b.is_expired(now));

        let mut added = 0;
        for bubble in bubbles {
            if bubble.text.is_empty() {
                continue;
            }
            let (h, v, far) = match bubble.position {
                Some((h, v)) => (h, v, true),
                None => state
                    .mobiles
                    .get(&bubble.entity_index)
                    .map_or((0, 0, false), |m| (m.h, m.v, false)),
            };
            state.bubbles.push(BubbleRecord {
                entity_index: bubble.entity_index,
                h,
                v,
                far,
                kind: bubble.kind,
                text: bubble.text,
                speaker: bubble.speaker,
                expires_at,
            });
            added += 1;
        }
        added
    }
}

impl Default for SharedDrawState {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}
