//! # CAIRN Shared
//!
//! Types shared by the decode path and the render path.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER know about the wire format. Bit widths, sentinels
//! and stage names live in `cairn_networking`. What lives here is what a
//! renderer needs to read a scene: records, timestamps and configuration.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod constants;
pub mod error;
pub mod records;
pub mod time;

pub use config::{
    BlendSettings, CommitPolicy, DecoderConfig, Limits, PlayfieldBounds, TimingSettings,
};
pub use constants::{BUBBLE_LIFETIME_MS, DEFAULT_FRAME_INTERVAL_MS, FIELD_HEIGHT, FIELD_WIDTH};
pub use error::{ConfigError, ConfigResult};
pub use records::{
    BubbleKind, BubbleRecord, DescriptorRecord, FrameCounters, LightingFlags, MobileRecord,
    PictureRecord, StatBars,
};
pub use time::Timestamp;
