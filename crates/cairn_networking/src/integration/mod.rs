//! # Host Integration Layer
//!
//! How decoded frames reach the rest of the client.
//!
//! ## Data Flow Architecture
//!
//! ```text
//! payload → DrawStateClient ──► SharedDrawState ──► capture ──► renderer
//!                 │
//!                 └──► FrameCollaborator (appearance, lighting, text,
//!                                         sound, inventory)
//! ```

pub mod events;
pub mod traits;

pub use events::{ChannelCollaborator, ClientEvent, EventChannel};
pub use traits::{BubbleTarget, BubbleText, FrameCollaborator, NullCollaborator};
