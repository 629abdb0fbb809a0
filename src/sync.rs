//! Fan-out of note changes between views showing the same note.
//!
//! Views never hold references to each other. Each one subscribes to the ids
//! it displays and drains its queue once per event-loop turn.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::store::Note;

pub type SubscriberId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum NoteEvent {
    /// The persisted record after a change.
    Updated(Note),
    Deleted,
}

pub struct Subscription {
    id: SubscriberId,
    note_id: String,
    receiver: Receiver<NoteEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    /// Pending events, oldest first.
    pub fn drain(&self) -> Vec<NoteEvent> {
        self.receiver.try_iter().collect()
    }
}

#[derive(Default)]
pub struct NoteBus {
    next_id: SubscriberId,
    subscribers: HashMap<String, Vec<(SubscriberId, Sender<NoteEvent>)>>,
}

impl NoteBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, note_id: &str) -> Subscription {
        self.next_id += 1;
        let (sender, receiver) = mpsc::channel();
        self.subscribers
            .entry(note_id.to_string())
            .or_default()
            .push((self.next_id, sender));
        Subscription { id: self.next_id, note_id: note_id.to_string(), receiver }
    }

    pub fn unsubscribe(&mut self, subscription: &Subscription) {
        if let Some(list) = self.subscribers.get_mut(&subscription.note_id) {
            list.retain(|(id, _)| *id != subscription.id);
            if list.is_empty() {
                self.subscribers.remove(&subscription.note_id);
            }
        }
    }

    /// Sends `event` to every subscriber of `note_id` except `origin`.
    /// Subscriptions that were dropped are pruned. Returns the number of
    /// views notified.
    pub fn publish(&mut self, note_id: &str, origin: Option<SubscriberId>, event: NoteEvent) -> usize {
        let Some(list) = self.subscribers.get_mut(note_id) else { return 0 };

        let mut delivered = 0;
        list.retain(|(id, sender)| {
            if Some(*id) == origin {
                return true;
            }
            match sender.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        if list.is_empty() {
            self.subscribers.remove(note_id);
        }
        tracing::trace!(note_id, delivered, "note event published");
        delivered
    }

    pub fn subscriber_count(&self, note_id: &str) -> usize {
        self.subscribers.get(note_id).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NoteDraft;

    fn note(id: &str) -> Note {
        Note::from_draft(id.to_string(), NoteDraft::with_content("x")).unwrap()
    }

    #[test]
    fn test_publish_skips_origin_and_other_notes() {
        let mut bus = NoteBus::new();
        let preview = bus.subscribe("a");
        let window = bus.subscribe("a");
        let other = bus.subscribe("b");

        let record = note("a");
        let sent = bus.publish("a", Some(window.id()), NoteEvent::Updated(record.clone()));
        assert_eq!(sent, 1);
        assert_eq!(preview.drain(), vec![NoteEvent::Updated(record)]);
        assert!(window.drain().is_empty());
        assert!(other.drain().is_empty());
    }

    #[test]
    fn test_dropped_subscriptions_are_pruned() {
        let mut bus = NoteBus::new();
        let kept = bus.subscribe("a");
        let dropped = bus.subscribe("a");
        drop(dropped);

        assert_eq!(bus.publish("a", None, NoteEvent::Deleted), 1);
        assert_eq!(bus.subscriber_count("a"), 1);
        assert_eq!(kept.drain(), vec![NoteEvent::Deleted]);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = NoteBus::new();
        let sub = bus.subscribe("a");
        bus.unsubscribe(&sub);
        assert_eq!(bus.subscriber_count("a"), 0);
        assert_eq!(bus.publish("a", None, NoteEvent::Deleted), 0);
        assert!(sub.drain().is_empty());
    }
}
