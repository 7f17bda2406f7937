//! # Client Events
//!
//! A channel-backed collaborator for hosts that consume decoder output on
//! another thread.
//!
//! ## Event Flow
//! ```text
//! 1. Network thread: DrawStateClient::handle_packet
//! 2. Decoder → ChannelCollaborator: appearance, lighting, text, sound, inventory
//! 3. ChannelCollaborator → EventChannel: ClientEvent
//! 4. UI / audio thread: EventChannel::try_recv
//! ```

use cairn_shared::{DescriptorRecord, LightingFlags};

use super::traits::{BubbleText, FrameCollaborator};
use crate::error::InventoryError;
use crate::protocol::{latin1, BubbleHeader, InventoryCommand};

/// Everything the decoder hands to the host, as data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    /// A descriptor arrived.
    Appearance(DescriptorRecord),
    /// Lighting flags of a frame.
    Lighting(LightingFlags),
    /// An info string.
    Info(String),
    /// A resolved bubble.
    Bubble {
        /// Speaking entity.
        entity_index: u8,
        /// Resolved text.
        text: BubbleText,
    },
    /// A sound to play.
    Sound(u16),
    /// Inventory commands of a frame.
    Inventory(Vec<InventoryCommand>),
}

// ============================================================================
// EVENT CHANNEL
// ============================================================================

/// Channel for client events.
///
/// Uses crossbeam for lock-free communication.
#[derive(Clone, Debug)]
pub struct EventChannel<T> {
    sender: crossbeam_channel::Sender<T>,
    receiver: crossbeam_channel::Receiver<T>,
}

impl<T> EventChannel<T> {
    /// Creates a new bounded event channel.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a new unbounded event channel.
    #[must_use]
    pub fn unbounded() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// Tries to send an event (returns immediately).
    ///
    /// # Errors
    ///
    /// Fails if the channel is full or every receiver is gone.
    pub fn try_send(&self, event: T) -> Result<(), crossbeam_channel::TrySendError<T>> {
        self.sender.try_send(event)
    }

    /// Tries to receive an event (non-blocking).
    ///
    /// # Errors
    ///
    /// Fails if the channel is empty or every sender is gone.
    pub fn try_recv(&self) -> Result<T, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drains every queued event.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Gets a clone of the sender for another thread.
    #[must_use]
    pub fn sender(&self) -> crossbeam_channel::Sender<T> {
        self.sender.clone()
    }

    /// Gets a clone of the receiver for another thread.
    #[must_use]
    pub fn receiver(&self) -> crossbeam_channel::Receiver<T> {
        self.receiver.clone()
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ============================================================================
// CHANNEL COLLABORATOR
// ============================================================================

/// Forwards every collaborator call as a [`ClientEvent`].
///
/// Events that do not fit in the channel are dropped and logged. Inventory
/// commands are the exception: losing them would desync the host, so a full
/// or closed channel rejects the frame's inventory instead.
#[derive(Clone, Debug)]
pub struct ChannelCollaborator {
    sender: crossbeam_channel::Sender<ClientEvent>,
}

impl ChannelCollaborator {
    /// Creates a collaborator that sends into `channel`.
    #[must_use]
    pub fn new(channel: &EventChannel<ClientEvent>) -> Self {
        Self {
            sender: channel.sender(),
        }
    }

    fn forward(&self, event: ClientEvent) {
        if let Err(err) = self.sender.try_send(event) {
            tracing::warn!(error = %err, "client event dropped");
        }
    }
}

impl FrameCollaborator for ChannelCollaborator {
    fn remember_appearance(&self, descriptor: &DescriptorRecord) {
        self.forward(ClientEvent::Appearance(descriptor.clone()));
    }

    fn lighting(&self, flags: LightingFlags) {
        self.forward(ClientEvent::Lighting(flags));
    }

    fn info_text(&self, raw: &[u8]) -> Option<String> {
        let text = latin1(raw);
        self.forward(ClientEvent::Info(text.clone()));
        Some(text)
    }

    fn bubble_text(&self, header: &BubbleHeader, payload: &[u8]) -> BubbleText {
        let text = BubbleText::plain(header, payload);
        self.forward(ClientEvent::Bubble {
            entity_index: header.entity_index,
            text: text.clone(),
        });
        text
    }

    fn play_sound(&self, id: u16) {
        self.forward(ClientEvent::Sound(id));
    }

    fn apply_inventory(&self, commands: &[InventoryCommand]) -> Result<(), InventoryError> {
        if commands.is_empty() {
            return Ok(());
        }
        self.sender
            .try_send(ClientEvent::Inventory(commands.to_vec()))
            .map_err(|err| InventoryError::Rejected(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ItemRef;
    use cairn_shared::BubbleKind;

    #[test]
    fn test_events_arrive_in_call_order() {
        let channel = EventChannel::unbounded();
        let collab = ChannelCollaborator::new(&channel);

        collab.lighting(LightingFlags::NO_NIGHT);
        collab.play_sound(12);
        assert_eq!(collab.info_text(b"You feel rested."), Some("You feel rested.".into()));

        let events = channel.drain();
        assert_eq!(
            events,
            vec![
                ClientEvent::Lighting(LightingFlags::NO_NIGHT),
                ClientEvent::Sound(12),
                ClientEvent::Info("You feel rested.".into()),
            ]
        );
    }

    #[test]
    fn test_bubble_event() {
        let channel = EventChannel::unbounded();
        let collab = ChannelCollaborator::new(&channel);
        let header = BubbleHeader {
            entity_index: 5,
            kind: BubbleKind::Thought,
            language: None,
            position: None,
        };
        let text = collab.bubble_text(&header, b"hmm");
        assert_eq!(text.text, "hmm");
        match channel.try_recv() {
            Ok(ClientEvent::Bubble { entity_index, text }) => {
                assert_eq!(entity_index, 5);
                assert_eq!(text.verb, "thinks");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_full_channel_rejects_inventory() {
        let channel = EventChannel::new(1);
        let collab = ChannelCollaborator::new(&channel);
        collab.play_sound(1);
        // Dropped, not blocking.
        collab.play_sound(2);

        let commands = [InventoryCommand::Equip {
            item: ItemRef { id: 4, index: None },
        }];
        assert!(matches!(
            collab.apply_inventory(&commands),
            Err(InventoryError::Rejected(_))
        ));
        assert!(collab.apply_inventory(&[]).is_ok());
        assert_eq!(channel.drain(), vec![ClientEvent::Sound(1)]);
    }
}
