//! # Collaborator Traits
//!
//! The decoder hands everything it does not own to a collaborator: appearance
//! caching, lighting, text formatting, audio and inventory.
//!
//! ```text
//! decoder defines:            host implements:
//! ┌──────────────────────┐    ┌──────────────────────────┐
//! │ trait FrameCollab... │ ←─ │ impl FrameCollaborator   │
//! └──────────────────────┘    └──────────────────────────┘
//! ```
//!
//! Every method has a default, so a host implements only what it uses.
//! Methods take `&self`: the decoder may be driven from more than one
//! thread at once.

use cairn_shared::{BubbleKind, DescriptorRecord, LightingFlags};

use crate::error::InventoryError;
use crate::protocol::{latin1, BubbleHeader, BubbleLanguage, InventoryCommand};

/// Where a bubble's text should be shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BubbleTarget {
    /// Drawn over the playfield.
    #[default]
    Field,
    /// Shown in the text log only.
    TextLog,
    /// Suppressed by the host (ignored speaker, filtered text).
    Hidden,
}

/// A bubble payload resolved by the text collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BubbleText {
    /// Speech verb ("says", "yells").
    pub verb: String,
    /// Display text. Empty text means no bubble is drawn.
    pub text: String,
    /// Speaker name.
    pub speaker: String,
    /// Language, when not common.
    pub language: Option<BubbleLanguage>,
    /// Display target.
    pub target: BubbleTarget,
}

impl BubbleText {
    /// The resolution used when the host does no formatting of its own.
    #[must_use]
    pub fn plain(header: &BubbleHeader, payload: &[u8]) -> Self {
        Self {
            verb: default_verb(header.kind).to_owned(),
            text: latin1(payload),
            speaker: String::new(),
            language: header.language,
            target: BubbleTarget::Field,
        }
    }
}

const fn default_verb(kind: BubbleKind) -> &'static str {
    match kind {
        BubbleKind::Whisper => "whispers",
        BubbleKind::Yell => "yells",
        BubbleKind::Thought => "thinks",
        BubbleKind::Ponder => "ponders",
        BubbleKind::Narrate | BubbleKind::RealAction | BubbleKind::PlayerAction => "",
        _ => "says",
    }
}

/// Host services the decoder calls while dispatching a frame.
pub trait FrameCollaborator: Send + Sync {
    /// A descriptor was decoded; remember how its entity looks.
    fn remember_appearance(&self, _descriptor: &DescriptorRecord) {}

    /// The frame's lighting flags.
    fn lighting(&self, _flags: LightingFlags) {}

    /// Formats an info string. `None` shows nothing.
    fn info_text(&self, raw: &[u8]) -> Option<String> {
        Some(latin1(raw))
    }

    /// Resolves a bubble payload.
    fn bubble_text(&self, header: &BubbleHeader, payload: &[u8]) -> BubbleText {
        BubbleText::plain(header, payload)
    }

    /// Plays a sound.
    fn play_sound(&self, _id: u16) {}

    /// Applies inventory changes.
    ///
    /// # Errors
    ///
    /// Returns an [`InventoryError`] if the commands do not fit the host's
    /// inventory; the decoder reports it at the inventory stage.
    fn apply_inventory(&self, _commands: &[InventoryCommand]) -> Result<(), InventoryError> {
        Ok(())
    }
}

/// Accepts everything and does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullCollaborator;

impl FrameCollaborator for NullCollaborator {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Knowledge, Language};

    #[test]
    fn test_plain_bubble_text() {
        let header = BubbleHeader {
            entity_index: 2,
            kind: BubbleKind::Yell,
            language: Some(BubbleLanguage {
                language: Language::Dwarven,
                knowledge: Knowledge::UnknownShort,
            }),
            position: None,
        };
        let text = NullCollaborator.bubble_text(&header, b"Oi!");
        assert_eq!(text.verb, "yells");
        assert_eq!(text.text, "Oi!");
        assert_eq!(text.language, header.language);
        assert_eq!(text.target, BubbleTarget::Field);
    }

    #[test]
    fn test_null_collaborator_accepts_inventory() {
        assert!(NullCollaborator.apply_inventory(&[]).is_ok());
        assert_eq!(NullCollaborator.info_text(b"hello"), Some("hello".into()));
    }
}
