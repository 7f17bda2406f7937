//! # Snapshot Capture
//!
//! Copies shared draw state for one render pass.
//!
//! ```text
//! Packets:     [f1]        [f2]        [f3]
//!                │           │           │
//! DrawState:  ───●───────────●───────────●────
//!                  │  │  │  │  │  │  │
//! Render ticks:    ▼  ▼  ▼  ▼  ▼  ▼  ▼
//!                  capture → blend → draw
//! ```
//!
//! A capture holds the state lock only while it copies. Expired bubbles are
//! pruned and duplicate bubbles per speaker are dropped in the shared list
//! too, so the list does not grow between frames.

use std::collections::BTreeMap;

use cairn_shared::{
    BubbleRecord, DescriptorRecord, FrameCounters, LightingFlags, MobileRecord, PictureRecord,
    StatBars, Timestamp,
};

use crate::state::SharedDrawState;

/// Immutable copy of the scene for one render pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrawSnapshot {
    /// Descriptor table.
    pub descriptors: BTreeMap<u8, DescriptorRecord>,
    /// Picture list, replayed prefix first.
    pub pictures: Vec<PictureRecord>,
    /// Length of the replayed prefix of `pictures`.
    pub pict_again: usize,
    /// Mobiles by index.
    pub mobiles: BTreeMap<u8, MobileRecord>,
    /// Previous frame's mobiles; empty unless a blend mode needs them.
    pub prev_mobiles: BTreeMap<u8, MobileRecord>,
    /// Previous frame's descriptors; empty unless a blend mode needs them.
    pub prev_descriptors: BTreeMap<u8, DescriptorRecord>,
    /// Live bubbles, at most one per speaker.
    pub bubbles: Vec<BubbleRecord>,
    /// Current bars.
    pub bars: StatBars,
    /// Bars of the frame before.
    pub prev_bars: StatBars,
    /// Scroll between the last two picture lists.
    pub shift: Option<(i16, i16)>,
    /// Header counters of the last frame.
    pub frame: FrameCounters,
    /// Lighting flags of the last frame.
    pub lighting: LightingFlags,
    /// Start of the interpolation interval.
    pub prev_time: Timestamp,
    /// End of the interpolation interval.
    pub cur_time: Timestamp,
    /// State generation this copy was taken from.
    pub generation: u64,
}

impl DrawSnapshot {
    /// Returns true if no frame has been committed yet.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.generation == 0
    }
}

/// Drops expired bubbles, then keeps only the newest bubble of each speaker.
pub fn prune_bubbles(bubbles: &mut Vec<BubbleRecord>, now: Timestamp) {
    bubbles.retain(|b| !b.is_expired(now));

    let mut seen = [false; 256];
    let mut keep = vec![false; bubbles.len()];
    for (i, bubble) in bubbles.iter().enumerate().rev() {
        let slot = &mut seen[usize::from(bubble.entity_index)];
        keep[i] = !*slot;
        *slot = true;
    }

    let mut keep = keep.into_iter();
    bubbles.retain(|_| keep.next().unwrap_or(false));
}

impl SharedDrawState {
    /// Copies the scene for rendering at `now`.
    #[must_use]
    pub fn capture(&self, now: Timestamp) -> DrawSnapshot {
        let needs_previous = self.blend_settings().snapshot_needs_previous();

        let mut guard = self.lock_state();
        let state = &mut *guard;
        prune_bubbles(&mut state.bubbles, now);

        DrawSnapshot {
            descriptors: state.descriptors.clone(),
            pictures: state.pictures.clone(),
            pict_again: state.pict_again,
            mobiles: state.mobiles.clone(),
            prev_mobiles: if needs_previous {
                state.prev_mobiles.clone()
            } else {
                BTreeMap::new()
            },
            prev_descriptors: if needs_previous {
                state.prev_descriptors.clone()
            } else {
                BTreeMap::new()
            },
            bubbles: state.bubbles.clone(),
            bars: state.bars,
            prev_bars: state.prev_bars,
            shift: state.picture_shift,
            frame: state.frame,
            lighting: state.lighting,
            prev_time: state.prev_time,
            cur_time: state.cur_time,
            generation: state.generation,
        }
    }
}
