//! # CAIRN Networking - Draw-State Decoder
//!
//! Client-side decoding of the per-frame draw-state payload, and the
//! interpolation that makes a 5 Hz scene look continuous.
//!
//! ## Architecture
//!
//! - **Protocol**: stage-tracked parser over a bit-packed, delta-compressed
//!   payload, plus a builder that writes the same format
//! - **State**: one lock-guarded scene, committed by the decoder and copied
//!   by the render tick
//! - **Motion**: majority-vote scroll estimate between two picture lists
//! - **Interpolation**: alpha/fade factors, anti-jump guard, bar blending
//! - **Integration**: collaborator trait for everything the decoder does not
//!   own (text, audio, inventory, appearance cache)
//!
//! ## Data Flow
//!
//! ```text
//! framing layer                                   renderer
//!   |                                                |
//!   |-- payload --> DrawStateClient                  |
//!   |                  | decode (no lock)            |
//!   |                  | commit ---> SharedDrawState |
//!   |                  | dispatch --> collaborator   |
//!   |                                  |             |
//!   |                                  +-- capture --+--> blend --> draw
//! ```
//!
//! Every failure is per-packet: the payload is dropped with a
//! [`StageError`] naming where decoding stopped, and the client is ready
//! for the next one.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cairn_networking::{DrawStateClient, DecoderConfig};
//!
//! let client = DrawStateClient::new(DecoderConfig::default());
//! client.handle_packet(&payload)?;
//! let (snapshot, frame) = client.render_frame();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod client;
pub mod error;
pub mod integration;
pub mod interpolation;
pub mod motion;
pub mod protocol;
pub mod snapshot;
pub mod state;

// Re-exports for convenience
pub use cairn_shared::{BlendSettings, CommitPolicy, DecoderConfig, Limits, Timestamp};
pub use client::{DecoderStats, DrawStateClient, FrameReport};
pub use error::{DecodeResult, InventoryError, Stage, StageError, StageErrorKind};
pub use integration::{
    BubbleTarget, BubbleText, ChannelCollaborator, ClientEvent, EventChannel, FrameCollaborator,
    NullCollaborator,
};
pub use interpolation::{
    blend, compute_interpolation, lerp_bar, BarBlend, BlendedFrame, MobileBlend, PictureBlend,
};
pub use motion::{estimate_shift, link_pictures};
pub use protocol::{decode_frame, DecodedFrame, FrameBuilder, FrameDecoder, PictureHeader};
pub use snapshot::{prune_bubbles, DrawSnapshot};
pub use state::{CommitSummary, PendingBubble, SharedDrawState};
