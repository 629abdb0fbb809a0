use std::time::{Duration, Instant};

use crate::editor::Editor;
use crate::store::Note;
use crate::sync::{NoteBus, NoteEvent, SubscriberId, Subscription};

/// An editable view of one note: the text being edited, the content last
/// written to disk, and the bus subscription that keeps it in step with the
/// other views of the same note.
pub struct NoteBuffer {
    pub editor: Editor,
    subscription: Subscription,
    saved: String,
    last_edit: Option<Instant>,
}

impl NoteBuffer {
    pub fn open(bus: &mut NoteBus, note: &Note, tab_width: u16) -> Self {
        let mut editor = Editor::from_text(&note.content);
        editor.set_tab_width(tab_width);
        Self {
            editor,
            subscription: bus.subscribe(&note.id),
            saved: note.content.clone(),
            last_edit: None,
        }
    }

    pub fn note_id(&self) -> &str {
        self.subscription.note_id()
    }

    pub fn subscriber(&self) -> SubscriberId {
        self.subscription.id()
    }

    /// Called after every key that changed the text. Editing back to the
    /// saved content leaves the buffer clean.
    pub fn mark_edited(&mut self, at: Instant) {
        self.last_edit = if self.editor.text() == self.saved { None } else { Some(at) };
    }

    pub fn is_dirty(&self) -> bool {
        self.last_edit.is_some()
    }

    pub fn is_due(&self, now: Instant, debounce: Duration) -> bool {
        self.last_edit
            .is_some_and(|at| now.saturating_duration_since(at) >= debounce)
    }

    /// Time left before the pending edit should be written.
    pub fn time_until_due(&self, now: Instant, debounce: Duration) -> Option<Duration> {
        self.last_edit
            .map(|at| debounce.saturating_sub(now.saturating_duration_since(at)))
    }

    /// Text waiting to be written, if any.
    pub fn pending_text(&self) -> Option<String> {
        self.is_dirty().then(|| self.editor.text())
    }

    pub fn mark_saved(&mut self, content: &str) {
        self.saved = content.to_string();
        if self.editor.text() == self.saved {
            self.last_edit = None;
        }
    }

    /// Drops the pending edit without writing it.
    pub fn discard_pending(&mut self) {
        self.last_edit = None;
    }

    pub fn drain(&self) -> Vec<NoteEvent> {
        self.subscription.drain()
    }

    /// Applies a change made elsewhere. A dirty buffer keeps its own text and
    /// will overwrite the record on its next flush. Returns whether the
    /// visible text changed.
    pub fn apply_remote(&mut self, note: &Note) -> bool {
        if self.saved == note.content {
            return false;
        }
        // Track the stored text even while dirty, so that editing back to an
        // older version is still a pending change.
        self.saved = note.content.clone();
        if self.is_dirty() {
            if self.editor.text() == self.saved {
                self.last_edit = None;
            }
            return false;
        }
        self.editor.set_text(&note.content);
        true
    }

    pub fn close(self, bus: &mut NoteBus) {
        bus.unsubscribe(&self.subscription);
    }
}
