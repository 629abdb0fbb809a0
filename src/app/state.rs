use std::time::{Duration, Instant};

use ratatui::{layout::Rect, widgets::ListState};

use super::buffer::NoteBuffer;
use super::floating::{clamp_to_area, DragKind, DragState, FloatingWindows};
use crate::clipboard;
use crate::config::{Config, Theme};
use crate::store::{note, DataManager, Geometry, Note, NoteDraft, NoteUpdate, StoreError};
use crate::sync::{NoteBus, NoteEvent};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Normal,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DialogState {
    None,
    DeleteConfirm,
    DeleteTemplateConfirm,
    SaveAsTemplate,
    RenameTemplate,
    EditTitle,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Focus {
    Notes,
    Templates,
    Preview,
    Floating,
}

/// Note list filter. Rendering receives it explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// The search box has keyboard focus.
    pub active: bool,
    pub query: String,
}

impl SearchState {
    pub fn is_filtering(&self) -> bool {
        !self.query.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
}

/// Screen regions from the last frame, used to route mouse events.
#[derive(Debug, Clone, Copy, Default)]
pub struct Areas {
    pub desktop: Rect,
    pub notes: Rect,
    pub templates: Rect,
    pub preview: Rect,
}

pub struct App {
    pub config: Config,
    pub theme: Theme,
    pub store: DataManager,
    pub bus: NoteBus,
    pub focus: Focus,
    pub mode: Mode,
    pub dialog: DialogState,
    pub input_buffer: String,
    pub dialog_error: Option<String>,
    /// Note whose title the title dialog edits.
    pub title_target: Option<String>,
    pub help_scroll: u16,
    pub search: SearchState,
    /// Ids of the notes in the list, in display order.
    pub visible_notes: Vec<String>,
    pub selected_note: usize,
    pub note_list_state: ListState,
    pub selected_template: usize,
    pub template_list_state: ListState,
    /// Buffer behind the preview pane, bound to the selected note.
    pub preview: Option<NoteBuffer>,
    pub windows: FloatingWindows,
    pub drag: Option<DragState>,
    pub status: Option<StatusMessage>,
    pub areas: Areas,
}

impl App {
    pub fn new(config: Config, store: DataManager) -> Self {
        let theme = Theme::from_name(&config.theme);

        let mut app = Self {
            config,
            theme,
            store,
            bus: NoteBus::new(),
            focus: Focus::Notes,
            mode: Mode::Normal,
            dialog: DialogState::None,
            input_buffer: String::new(),
            dialog_error: None,
            title_target: None,
            help_scroll: 0,
            search: SearchState::default(),
            visible_notes: Vec::new(),
            selected_note: 0,
            note_list_state: ListState::default(),
            selected_template: 0,
            template_list_state: ListState::default(),
            preview: None,
            windows: FloatingWindows::new(),
            drag: None,
            status: None,
            areas: Areas::default(),
        };

        app.refresh_notes();
        app.report_load_warnings();
        app
    }

    fn autosave(&self) -> Duration {
        Duration::from_millis(self.config.autosave_ms)
    }

    fn tab_width(&self) -> u16 {
        self.config.editor.tab_width
    }

    // ---------------------------------------------------------------------
    // Status bar
    // ---------------------------------------------------------------------

    pub fn set_info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage { text: text.into(), level: StatusLevel::Info });
    }

    pub fn set_warning(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!("{text}");
        self.status = Some(StatusMessage { text, level: StatusLevel::Warning });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::error!("{text}");
        self.status = Some(StatusMessage { text, level: StatusLevel::Error });
    }

    fn report_load_warnings(&mut self) {
        let warnings = self.store.take_load_warnings();
        match warnings.as_slice() {
            [] => {}
            [only] => self.set_warning(only.clone()),
            [first, rest @ ..] => self.set_warning(format!("{first} (+{} more)", rest.len())),
        }
    }

    // ---------------------------------------------------------------------
    // Note list
    // ---------------------------------------------------------------------

    /// Rebuilds the visible list from the store and the search filter,
    /// keeping the selected note selected when it is still listed.
    pub fn refresh_notes(&mut self) {
        let selected_id = self.selected_note_id().map(str::to_string);

        self.visible_notes = self
            .store
            .search_notes(&self.search.query)
            .into_iter()
            .map(|n| n.id.clone())
            .collect();

        // The note being edited stays listed even if it stops matching.
        if self.mode == Mode::Edit {
            if let Some(id) = self.preview.as_ref().map(|p| p.note_id().to_string()) {
                if !self.visible_notes.contains(&id) {
                    self.visible_notes.insert(0, id);
                }
            }
        }

        self.selected_note = selected_id
            .and_then(|id| self.visible_notes.iter().position(|v| *v == id))
            .unwrap_or_else(|| self.selected_note.min(self.visible_notes.len().saturating_sub(1)));
        self.sync_preview();
    }

    pub fn selected_note_id(&self) -> Option<&str> {
        self.visible_notes.get(self.selected_note).map(String::as_str)
    }

    pub fn current_note(&self) -> Option<&Note> {
        self.selected_note_id().and_then(|id| self.store.note(id))
    }

    pub fn select_note_id(&mut self, id: &str) {
        if let Some(index) = self.visible_notes.iter().position(|v| v == id) {
            self.selected_note = index;
            self.sync_preview();
        }
    }

    pub fn select_note_index(&mut self, index: usize) {
        if index < self.visible_notes.len() {
            self.selected_note = index;
            self.sync_preview();
        }
    }

    pub fn next_note(&mut self) {
        if self.visible_notes.is_empty() {
            return;
        }
        self.selected_note = (self.selected_note + 1) % self.visible_notes.len();
        self.sync_preview();
    }

    pub fn previous_note(&mut self) {
        if self.visible_notes.is_empty() {
            return;
        }
        self.selected_note = if self.selected_note == 0 {
            self.visible_notes.len() - 1
        } else {
            self.selected_note - 1
        };
        self.sync_preview();
    }

    pub fn goto_first_note(&mut self) {
        self.select_note_index(0);
    }

    pub fn goto_last_note(&mut self) {
        self.select_note_index(self.visible_notes.len().saturating_sub(1));
    }

    /// Rebinds the preview buffer to the selected note.
    fn sync_preview(&mut self) {
        let target = self.selected_note_id().map(str::to_string);
        if self.preview.as_ref().map(|p| p.note_id()) == target.as_deref() {
            return;
        }

        if let Some(mut buffer) = self.preview.take() {
            if let Err(e) = flush_buffer(&mut self.store, &mut self.bus, &mut buffer) {
                self.set_error(format!("Save failed: {e}"));
            }
            buffer.close(&mut self.bus);
        }

        let tab_width = self.tab_width();
        self.preview = target
            .and_then(|id| self.store.note(&id))
            .map(|note| NoteBuffer::open(&mut self.bus, note, tab_width));

        if self.mode == Mode::Edit {
            self.mode = Mode::Normal;
        }
    }

    // ---------------------------------------------------------------------
    // Search
    // ---------------------------------------------------------------------

    pub fn start_search(&mut self) {
        self.search.active = true;
        self.focus = Focus::Notes;
    }

    pub fn push_search_char(&mut self, c: char) {
        self.search.query.push(c);
        self.selected_note = 0;
        self.refresh_notes();
        self.goto_first_note();
    }

    pub fn pop_search_char(&mut self) {
        self.search.query.pop();
        self.refresh_notes();
    }

    /// Leaves the search box, keeping the filter.
    pub fn finish_search(&mut self) {
        self.search.active = false;
    }

    pub fn clear_search(&mut self) {
        self.search = SearchState::default();
        self.refresh_notes();
    }

    // ---------------------------------------------------------------------
    // Focus and modes
    // ---------------------------------------------------------------------

    pub fn toggle_focus(&mut self, backwards: bool) {
        let mut order = vec![Focus::Notes, Focus::Templates, Focus::Preview];
        if !self.windows.is_empty() {
            order.push(Focus::Floating);
        }
        let current = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if backwards {
            (current + order.len() - 1) % order.len()
        } else {
            (current + 1) % order.len()
        };
        self.focus = order[next];
    }

    pub fn enter_edit_mode(&mut self) {
        if self.preview.is_some() {
            self.mode = Mode::Edit;
            self.focus = Focus::Preview;
        }
    }

    pub fn exit_edit_mode(&mut self) {
        self.flush_preview();
        self.mode = Mode::Normal;
    }

    // ---------------------------------------------------------------------
    // Creating and deleting notes
    // ---------------------------------------------------------------------

    fn blank_draft(&self) -> NoteDraft {
        NoteDraft {
            color: Some(self.config.default_color.clone()),
            font_size: Some(self.config.default_font_size),
            ..NoteDraft::default()
        }
    }

    /// Creates an empty note, selects it and starts editing it.
    pub fn create_blank_note(&mut self) -> Option<String> {
        match self.store.create_note(self.blank_draft()) {
            Ok(note) => {
                self.show_new_note(&note.id);
                self.set_info("New note");
                Some(note.id)
            }
            Err(e) => {
                self.set_error(format!("Could not create note: {e}"));
                None
            }
        }
    }

    /// Creates a note from a template. If the template is unavailable a blank
    /// note is created instead and a warning is shown.
    pub fn create_note_from_template(&mut self, template_id: &str) -> Option<String> {
        match self.store.create_note_from_template(template_id) {
            Ok(note) => {
                self.show_new_note(&note.id);
                let name = self.store.template(template_id).map(|t| t.name.clone()).unwrap_or_default();
                self.set_info(format!("New note from \"{name}\""));
                Some(note.id)
            }
            Err(e) => {
                let id = self.create_blank_note()?;
                self.set_warning(format!("Template unavailable ({e}); created a blank note"));
                Some(id)
            }
        }
    }

    pub fn create_from_selected_template(&mut self) -> Option<String> {
        let id = self.selected_template_id()?;
        self.create_note_from_template(&id)
    }

    /// Number-key shortcut: 1 is the first template in the panel.
    pub fn create_from_template_shortcut(&mut self, number: usize) -> Option<String> {
        let id = self.store.templates().get(number.checked_sub(1)?)?.id.clone();
        self.create_note_from_template(&id)
    }

    fn show_new_note(&mut self, id: &str) {
        if self.mode == Mode::Edit {
            self.exit_edit_mode();
        }
        self.search = SearchState::default();
        self.refresh_notes();
        self.select_note_id(id);
        self.enter_edit_mode();
    }

    pub fn request_delete_note(&mut self) {
        if self.selected_note_id().is_some() {
            self.dialog = DialogState::DeleteConfirm;
        }
    }

    pub fn delete_selected_note(&mut self) -> bool {
        match self.selected_note_id().map(str::to_string) {
            Some(id) => self.delete_note(&id),
            None => false,
        }
    }

    /// Deletes a note and tells every view of it. Deleting a note that no
    /// longer exists does nothing.
    pub fn delete_note(&mut self, id: &str) -> bool {
        match self.store.delete_note(id) {
            Ok(true) => {
                self.bus.publish(id, None, NoteEvent::Deleted);
                if self.drag.as_ref().is_some_and(|d| d.note_id == id) {
                    self.drag = None;
                }
                self.pump_sync();
                self.refresh_notes();
                self.set_info("Note deleted");
                true
            }
            Ok(false) => false,
            Err(e) => {
                self.set_error(format!("Could not delete note: {e}"));
                false
            }
        }
    }

    // ---------------------------------------------------------------------
    // Persistence and sync
    // ---------------------------------------------------------------------

    pub fn has_pending_edits(&self) -> bool {
        self.preview.as_ref().is_some_and(NoteBuffer::is_dirty)
            || self.windows.iter().any(|w| w.buffer.is_dirty())
    }

    /// Time until the earliest pending edit is due to be written.
    pub fn next_flush_in(&self, now: Instant) -> Option<Duration> {
        let debounce = self.autosave();
        self.preview
            .iter()
            .chain(self.windows.iter().map(|w| &w.buffer))
            .filter_map(|b| b.time_until_due(now, debounce))
            .min()
    }

    /// Writes every buffer whose quiet period has elapsed.
    pub fn flush_due(&mut self, now: Instant) -> bool {
        let debounce = self.autosave();
        self.flush_where(|buffer| buffer.is_due(now, debounce))
    }

    /// Writes every dirty buffer. Used before closing, reloading and quitting.
    pub fn flush_all(&mut self) -> bool {
        self.flush_where(NoteBuffer::is_dirty)
    }

    pub fn flush_preview(&mut self) -> bool {
        let Some(buffer) = self.preview.as_mut() else { return false };
        let result = flush_buffer(&mut self.store, &mut self.bus, buffer);
        self.after_flush(result.map_err(|e| vec![e]))
    }

    fn flush_where(&mut self, mut predicate: impl FnMut(&NoteBuffer) -> bool) -> bool {
        let mut wrote = false;
        let mut errors = Vec::new();
        let Self { store, bus, preview, windows, .. } = self;
        let buffers = preview.iter_mut().chain(windows.iter_mut().map(|w| &mut w.buffer));
        for buffer in buffers {
            if !predicate(&*buffer) {
                continue;
            }
            match flush_buffer(store, bus, buffer) {
                Ok(written) => wrote |= written,
                Err(e) => {
                    // Retry after another quiet period instead of on every tick.
                    buffer.mark_edited(Instant::now());
                    errors.push(e);
                }
            }
        }
        let result = if errors.is_empty() { Ok(wrote) } else { Err(errors) };
        self.after_flush(result)
    }

    fn after_flush(&mut self, result: Result<bool, Vec<StoreError>>) -> bool {
        match result {
            Ok(true) => {
                self.refresh_notes();
                true
            }
            Ok(false) => false,
            Err(errors) => {
                if let Some(e) = errors.first() {
                    self.set_error(format!("Save failed: {e}"));
                }
                false
            }
        }
    }

    /// Delivers queued bus events to the preview and the floating windows.
    /// Returns whether anything changed.
    pub fn pump_sync(&mut self) -> bool {
        let mut changed = false;

        let mut preview_deleted = false;
        if let Some(buffer) = self.preview.as_mut() {
            for event in buffer.drain() {
                changed = true;
                match event {
                    NoteEvent::Updated(note) => {
                        buffer.apply_remote(&note);
                    }
                    NoteEvent::Deleted => preview_deleted = true,
                }
            }
        }
        if preview_deleted {
            if let Some(buffer) = self.preview.take() {
                buffer.close(&mut self.bus);
            }
            self.mode = Mode::Normal;
        }

        let dragging = self.drag.as_ref().map(|d| d.note_id.clone());
        let mut closed = Vec::new();
        for window in self.windows.iter_mut() {
            for event in window.buffer.drain() {
                changed = true;
                match event {
                    NoteEvent::Updated(note) => {
                        window.buffer.apply_remote(&note);
                        if dragging.as_deref() != Some(note.id.as_str()) {
                            window.geometry = note.geometry();
                        }
                    }
                    NoteEvent::Deleted => closed.push(window.note_id().to_string()),
                }
            }
        }
        for id in closed {
            self.windows.close(&mut self.bus, &id);
        }
        if self.windows.is_empty() && self.focus == Focus::Floating {
            self.focus = Focus::Notes;
        }

        if changed {
            self.refresh_notes();
        }
        changed
    }

    /// Writes a metadata change and notifies every view of the note.
    fn update_and_publish(&mut self, id: &str, update: NoteUpdate) -> Option<Note> {
        let origin = match &update {
            NoteUpdate::Geometry(_) => self.windows.get(id).map(|w| w.buffer.subscriber()),
            _ => None,
        };
        match self.store.update_note(id, update) {
            Ok(note) => {
                let note = note.clone();
                self.bus.publish(id, origin, NoteEvent::Updated(note.clone()));
                self.pump_sync();
                Some(note)
            }
            Err(e) => {
                self.set_error(format!("Could not update note: {e}"));
                None
            }
        }
    }

    pub fn reload(&mut self) {
        self.flush_all();
        if let Err(e) = self.store.reload() {
            self.set_error(format!("Reload failed: {e}"));
            return;
        }

        for id in self.windows.note_ids() {
            match self.store.note(&id).cloned() {
                Some(note) => {
                    if let Some(window) = self.windows.get_mut(&id) {
                        window.buffer.apply_remote(&note);
                        window.geometry = note.geometry();
                    }
                }
                None => {
                    self.windows.close(&mut self.bus, &id);
                }
            }
        }
        if let Some(buffer) = self.preview.as_mut() {
            if let Some(note) = self.store.note(buffer.note_id()) {
                buffer.apply_remote(note);
            }
        }
        if self.windows.is_empty() && self.focus == Focus::Floating {
            self.focus = Focus::Notes;
        }

        self.refresh_notes();
        self.set_info(format!("Reloaded {} notes", self.store.note_count()));
        self.report_load_warnings();
    }

    // ---------------------------------------------------------------------
    // Appearance and clipboard
    // ---------------------------------------------------------------------

    pub fn cycle_color(&mut self, id: &str) {
        let Some(current) = self.store.note(id).map(|n| n.color.clone()) else { return };
        let color = note::next_palette_color(&current).to_string();
        if let Some(note) = self.update_and_publish(id, NoteUpdate::Appearance { color: Some(color), font_size: None }) {
            self.set_info(format!("Color: {}", note::color_name(&note.color)));
        }
    }

    pub fn change_font_size(&mut self, id: &str, larger: bool) {
        let Some(current) = self.store.note(id).map(|n| n.font_size) else { return };
        let next = if larger { note::next_font_size(current) } else { note::prev_font_size(current) };
        let Some(size) = next else {
            self.set_info(if larger { "Largest font size" } else { "Smallest font size" });
            return;
        };
        if self.update_and_publish(id, NoteUpdate::Appearance { color: None, font_size: Some(size) }).is_some() {
            self.set_info(format!("Font size: {size}"));
        }
    }

    /// Opens the title prompt for a note, prefilled with its current title.
    pub fn request_edit_title(&mut self, id: &str) {
        let Some(title) = self.store.note(id).map(|n| n.title.clone()) else { return };
        self.input_buffer = title;
        self.dialog_error = None;
        self.title_target = Some(id.to_string());
        self.dialog = DialogState::EditTitle;
    }

    /// Stores the prompt's text as the title. The next content edit derives
    /// the title from the first line again.
    pub fn confirm_edit_title(&mut self) {
        let Some(id) = self.title_target.clone() else {
            self.close_dialog();
            return;
        };
        let title = self.input_buffer.clone();
        self.close_dialog();
        if let Some(note) = self.update_and_publish(&id, NoteUpdate::Title(title)) {
            self.set_info(format!("Title: {}", note.title));
        }
    }

    /// Text of a note as currently shown, including unsaved edits.
    pub fn live_text(&self, id: &str) -> Option<String> {
        if let Some(window) = self.windows.get(id) {
            return Some(window.buffer.editor.text());
        }
        if let Some(buffer) = self.preview.as_ref().filter(|b| b.note_id() == id) {
            return Some(buffer.editor.text());
        }
        self.store.note(id).map(|n| n.content.clone())
    }

    pub fn copy_note(&mut self, id: &str) {
        let Some(text) = self.live_text(id) else { return };
        if text.is_empty() {
            self.set_info("Nothing to copy");
            return;
        }
        match clipboard::copy_text(&text) {
            Ok(()) => self.set_info(format!("Copied {} characters", text.chars().count())),
            Err(e) => self.set_error(format!("Clipboard unavailable: {e}")),
        }
    }

    /// Inserts text into whichever editor has focus.
    pub fn paste_text(&mut self, text: &str) {
        let now = Instant::now();
        let buffer = match (self.focus, self.mode) {
            (Focus::Floating, _) => self.windows.top_mut().map(|w| &mut w.buffer),
            (Focus::Preview, Mode::Edit) => self.preview.as_mut(),
            _ => None,
        };
        if let Some(buffer) = buffer {
            buffer.editor.insert_str(text);
            buffer.mark_edited(now);
        }
    }

    // ---------------------------------------------------------------------
    // Floating windows
    // ---------------------------------------------------------------------

    pub fn open_selected_in_window(&mut self) {
        if let Some(id) = self.selected_note_id().map(str::to_string) {
            self.open_window(&id);
        }
    }

    pub fn open_window(&mut self, id: &str) {
        // The window starts from the latest text.
        if self.preview.as_ref().is_some_and(|p| p.note_id() == id) {
            self.flush_preview();
        }
        let Some(note) = self.store.note(id).cloned() else { return };
        let tab_width = self.tab_width();
        self.windows.open_or_focus(&mut self.bus, &note, tab_width);
        if self.mode == Mode::Edit {
            self.exit_edit_mode();
        }
        self.focus = Focus::Floating;
    }

    /// Flushes and closes a window.
    pub fn close_window(&mut self, id: &str) {
        if let Some(window) = self.windows.get_mut(id) {
            let result = flush_buffer(&mut self.store, &mut self.bus, &mut window.buffer);
            self.after_flush(result.map_err(|e| vec![e]));
        }
        self.windows.close(&mut self.bus, id);
        if self.windows.is_empty() && self.focus == Focus::Floating {
            self.focus = Focus::Notes;
        }
    }

    pub fn close_top_window(&mut self) {
        if let Some(id) = self.windows.top().map(|w| w.note_id().to_string()) {
            self.close_window(&id);
        }
    }

    pub fn focus_window(&mut self, id: &str) {
        if self.windows.raise(id) {
            if self.mode == Mode::Edit {
                self.exit_edit_mode();
            }
            self.focus = Focus::Floating;
        }
    }

    pub fn cycle_windows(&mut self) {
        self.windows.cycle();
    }

    pub fn move_window(&mut self, id: &str, dx: i32, dy: i32) {
        let desktop = self.areas.desktop;
        if let Some(window) = self.windows.get_mut(id) {
            window.geometry = clamp_to_area(window.geometry.moved_by(dx, dy), desktop);
            self.commit_geometry(id);
        }
    }

    pub fn resize_window(&mut self, id: &str, dw: i32, dh: i32) {
        if let Some(window) = self.windows.get_mut(id) {
            window.geometry = window.geometry.resized_by(dw, dh);
            self.commit_geometry(id);
        }
    }

    /// Persists a window's current geometry.
    fn commit_geometry(&mut self, id: &str) {
        let Some(geometry) = self.windows.get(id).map(|w| w.geometry) else { return };
        let unchanged = self.store.note(id).map(Note::geometry) == Some(geometry);
        if !unchanged {
            self.update_and_publish(id, NoteUpdate::Geometry(geometry));
        }
    }

    pub fn begin_drag(&mut self, id: &str, kind: DragKind, column: u16, row: u16) {
        let Some(start) = self.windows.get(id).map(|w| w.geometry) else { return };
        self.drag = Some(DragState { note_id: id.to_string(), kind, origin: (column, row), start });
    }

    pub fn drag_to(&mut self, column: u16, row: u16) {
        let Some(drag) = self.drag.as_ref() else { return };
        let mut geometry: Geometry = drag.geometry_at(column, row);
        if drag.kind == DragKind::Move {
            geometry = clamp_to_area(geometry, self.areas.desktop);
        }
        let id = drag.note_id.clone();
        if let Some(window) = self.windows.get_mut(&id) {
            window.geometry = geometry;
        }
    }

    /// Ends a drag and persists where the window landed.
    pub fn end_drag(&mut self, column: u16, row: u16) {
        self.drag_to(column, row);
        if let Some(drag) = self.drag.take() {
            self.commit_geometry(&drag.note_id);
        }
    }

    // ---------------------------------------------------------------------
    // Templates
    // ---------------------------------------------------------------------

    pub fn selected_template_id(&self) -> Option<String> {
        self.store.templates().get(self.selected_template).map(|t| t.id.clone())
    }

    pub fn next_template(&mut self) {
        let count = self.store.templates().len();
        if count > 0 {
            self.selected_template = (self.selected_template + 1) % count;
        }
    }

    pub fn previous_template(&mut self) {
        let count = self.store.templates().len();
        if count > 0 {
            self.selected_template = (self.selected_template + count - 1) % count;
        }
    }

    fn select_template_id(&mut self, id: &str) {
        if let Some(index) = self.store.templates().iter().position(|t| t.id == id) {
            self.selected_template = index;
        }
    }

    fn clamp_template_selection(&mut self) {
        let count = self.store.templates().len();
        self.selected_template = self.selected_template.min(count.saturating_sub(1));
    }

    pub fn request_save_as_template(&mut self) {
        if let Some(title) = self.current_note().map(|n| n.title.clone()) {
            self.flush_preview();
            self.input_buffer = title;
            self.dialog_error = None;
            self.dialog = DialogState::SaveAsTemplate;
        }
    }

    pub fn confirm_save_as_template(&mut self) {
        let Some(note_id) = self.selected_note_id().map(str::to_string) else {
            self.dialog = DialogState::None;
            return;
        };
        match self.store.save_note_as_template(&note_id, &self.input_buffer) {
            Ok(template) => {
                self.select_template_id(&template.id);
                self.close_dialog();
                self.set_info(format!("Saved template \"{}\"", template.name));
            }
            Err(e) => self.dialog_error = Some(e.to_string()),
        }
    }

    pub fn request_rename_template(&mut self) {
        let Some(template) = self.store.templates().get(self.selected_template).map(|t| (*t).clone()) else {
            return;
        };
        if template.is_builtin() {
            self.set_warning("Built-in templates cannot be renamed");
            return;
        }
        self.input_buffer = template.name;
        self.dialog_error = None;
        self.dialog = DialogState::RenameTemplate;
    }

    pub fn confirm_rename_template(&mut self) {
        let Some(id) = self.selected_template_id() else {
            self.dialog = DialogState::None;
            return;
        };
        match self.store.rename_template(&id, &self.input_buffer) {
            Ok(template) => {
                let name = template.name.clone();
                self.select_template_id(&id);
                self.close_dialog();
                self.set_info(format!("Renamed template to \"{name}\""));
            }
            Err(e) => self.dialog_error = Some(e.to_string()),
        }
    }

    pub fn request_delete_template(&mut self) {
        let Some(id) = self.selected_template_id() else { return };
        if crate::store::template::is_builtin(&id) {
            self.set_warning("Built-in templates cannot be deleted");
            return;
        }
        self.dialog = DialogState::DeleteTemplateConfirm;
    }

    pub fn delete_selected_template(&mut self) -> bool {
        let Some(id) = self.selected_template_id() else { return false };
        match self.store.delete_template(&id) {
            Ok(removed) => {
                self.clamp_template_selection();
                if removed {
                    self.set_info("Template deleted");
                }
                removed
            }
            Err(e) => {
                self.set_warning(e.to_string());
                false
            }
        }
    }

    pub fn close_dialog(&mut self) {
        self.dialog = DialogState::None;
        self.input_buffer.clear();
        self.dialog_error = None;
        self.title_target = None;
    }

    // ---------------------------------------------------------------------
    // Mouse hit testing
    // ---------------------------------------------------------------------

    /// Index of the note list entry under the cursor. Entries are two rows tall.
    pub fn note_index_at(&self, column: u16, row: u16) -> Option<usize> {
        let index = list_row_at(self.areas.notes, column, row)? / 2 + self.note_list_state.offset();
        (index < self.visible_notes.len()).then_some(index)
    }

    pub fn template_index_at(&self, column: u16, row: u16) -> Option<usize> {
        let index = list_row_at(self.areas.templates, column, row)? + self.template_list_state.offset();
        (index < self.store.templates().len()).then_some(index)
    }
}

/// Row inside a bordered list, or `None` outside its inner area.
fn list_row_at(area: Rect, column: u16, row: u16) -> Option<usize> {
    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    let inside = column >= inner.x && column < inner.right() && row >= inner.y && row < inner.bottom();
    inside.then(|| (row - inner.y) as usize)
}

/// Writes a dirty buffer through the store and publishes the stored record
/// to the other views of the note. Returns whether anything was written.
fn flush_buffer(store: &mut DataManager, bus: &mut NoteBus, buffer: &mut NoteBuffer) -> Result<bool, StoreError> {
    let Some(text) = buffer.pending_text() else { return Ok(false) };
    match store.update_note(buffer.note_id(), NoteUpdate::Content(text)) {
        Ok(note) => {
            let note = note.clone();
            let note_id = note.id.clone();
            buffer.mark_saved(&note.content);
            bus.publish(&note_id, Some(buffer.subscriber()), NoteEvent::Updated(note));
            Ok(true)
        }
        Err(e) if e.is_not_found() => {
            // Deleted underneath us; nothing left to save into.
            buffer.discard_pending();
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn app() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let store = DataManager::open(dir.path()).unwrap();
        let config = Config { autosave_ms: 400, ..Config::default() };
        (dir, App::new(config, store))
    }

    fn type_into(buffer: &mut NoteBuffer, text: &str) {
        buffer.editor.insert_str(text);
        buffer.mark_edited(Instant::now());
    }

    #[test]
    fn test_create_blank_note_starts_editing() {
        let (_dir, mut app) = app();
        let id = app.create_blank_note().unwrap();
        assert_eq!(app.selected_note_id(), Some(id.as_str()));
        assert_eq!(app.mode, Mode::Edit);
        assert_eq!(app.focus, Focus::Preview);
        assert_eq!(app.current_note().map(|n| n.title.as_str()), Some("Untitled Note"));
    }

    #[test]
    fn test_preview_edits_are_debounced() {
        let (_dir, mut app) = app();
        let id = app.create_blank_note().unwrap();
        let start = Instant::now();
        let preview = app.preview.as_mut().unwrap();
        preview.editor.insert_str("Buy milk");
        preview.mark_edited(start);

        assert!(!app.flush_due(start));
        assert_eq!(app.store.note(&id).unwrap().content, "");
        assert!(app.flush_due(start + Duration::from_millis(400)));
        assert_eq!(app.store.note(&id).unwrap().content, "Buy milk");
        assert_eq!(app.store.note(&id).unwrap().title, "Buy milk");
        assert!(!app.has_pending_edits());
    }

    #[test]
    fn test_window_edits_reach_preview_and_back() {
        let (_dir, mut app) = app();
        let id = app.create_blank_note().unwrap();
        app.exit_edit_mode();
        app.open_window(&id);
        assert_eq!(app.focus, Focus::Floating);

        type_into(&mut app.windows.get_mut(&id).unwrap().buffer, "from window");
        app.flush_all();
        app.pump_sync();
        assert_eq!(app.preview.as_ref().unwrap().editor.text(), "from window");

        app.enter_edit_mode();
        let preview = app.preview.as_mut().unwrap();
        preview.editor.move_cursor(crate::editor::CursorMove::Bottom);
        type_into(preview, "!");
        app.flush_all();
        app.pump_sync();
        assert_eq!(app.windows.get(&id).unwrap().buffer.editor.text(), "from window!");
    }

    #[test]
    fn test_dirty_window_keeps_its_text_and_wins() {
        let (_dir, mut app) = app();
        let id = app.create_blank_note().unwrap();
        app.open_window(&id);
        app.enter_edit_mode();

        type_into(&mut app.windows.get_mut(&id).unwrap().buffer, "window");
        type_into(app.preview.as_mut().unwrap(), "preview");
        app.flush_preview();
        app.pump_sync();
        assert_eq!(app.windows.get(&id).unwrap().buffer.editor.text(), "window");

        app.flush_all();
        app.pump_sync();
        assert_eq!(app.store.note(&id).unwrap().content, "window");
    }

    #[test]
    fn test_window_edited_back_to_older_text_still_converges() {
        let (_dir, mut app) = app();
        let id = app.create_blank_note().unwrap();
        type_into(app.preview.as_mut().unwrap(), "A");
        app.flush_all();
        app.open_window(&id);

        type_into(&mut app.windows.get_mut(&id).unwrap().buffer, "x");
        let preview = app.preview.as_mut().unwrap();
        preview.editor.set_text("B");
        preview.mark_edited(Instant::now());
        app.flush_preview();
        app.pump_sync();
        assert_eq!(app.store.note(&id).unwrap().content, "B");

        let window = &mut app.windows.get_mut(&id).unwrap().buffer;
        window.editor.set_cursor(0, 1);
        window.editor.delete_newline();
        window.mark_edited(Instant::now());
        assert_eq!(window.editor.text(), "A");
        assert!(window.is_dirty());

        app.flush_all();
        app.pump_sync();
        assert_eq!(app.store.note(&id).unwrap().content, "A");
        assert_eq!(app.preview.as_ref().unwrap().editor.text(), "A");
        assert!(!app.has_pending_edits());
    }

    #[test]
    fn test_title_edit_persists_and_reaches_windows() {
        let (_dir, mut app) = app();
        let id = app.create_blank_note().unwrap();
        type_into(app.preview.as_mut().unwrap(), "groceries\nmilk");
        app.flush_all();
        app.open_window(&id);
        type_into(&mut app.windows.get_mut(&id).unwrap().buffer, "eggs ");

        app.request_edit_title(&id);
        assert_eq!(app.dialog, DialogState::EditTitle);
        assert_eq!(app.input_buffer, "groceries");

        app.input_buffer = "Weekend shopping".to_string();
        app.confirm_edit_title();
        assert_eq!(app.dialog, DialogState::None);
        assert!(app.title_target.is_none());
        assert_eq!(app.store.note(&id).unwrap().title, "Weekend shopping");
        // The pending window edit is not disturbed by the title change.
        assert_eq!(app.windows.get(&id).unwrap().buffer.editor.text(), "eggs groceries\nmilk");
        assert!(app.has_pending_edits());

        let reopened = DataManager::open(app.store.root()).unwrap();
        assert_eq!(reopened.note(&id).unwrap().title, "Weekend shopping");

        app.request_edit_title(&id);
        app.input_buffer.clear();
        app.confirm_edit_title();
        assert_eq!(app.store.note(&id).unwrap().title, "Untitled Note");
    }

    #[test]
    fn test_appearance_changes_persist_and_reach_windows() {
        let (_dir, mut app) = app();
        let id = app.create_blank_note().unwrap();
        app.open_window(&id);

        app.cycle_color(&id);
        assert_eq!(app.store.note(&id).unwrap().color, "#C8E6C9");
        app.change_font_size(&id, true);
        assert_eq!(app.store.note(&id).unwrap().font_size, 14);
        app.change_font_size(&id, false);
        app.change_font_size(&id, false);
        assert_eq!(app.store.note(&id).unwrap().font_size, 10);
        assert!(app.windows.is_open(&id));
    }

    #[test]
    fn test_delete_closes_window_and_removes_file() {
        let (_dir, mut app) = app();
        let id = app.create_blank_note().unwrap();
        app.open_window(&id);
        let path = app.store.note_file(&id);
        assert!(path.exists());

        assert!(app.delete_note(&id));
        assert!(!path.exists());
        assert!(!app.windows.is_open(&id));
        assert!(app.preview.is_none());
        assert_eq!(app.focus, Focus::Notes);
        assert_eq!(app.bus.subscriber_count(&id), 0);
        assert!(!app.delete_note(&id));
    }

    #[test]
    fn test_missing_template_falls_back_to_blank_note() {
        let (_dir, mut app) = app();
        let id = app.create_note_from_template("no-such-template").unwrap();
        assert_eq!(app.store.note(&id).unwrap().content, "");
        assert_eq!(app.status.as_ref().map(|s| s.level), Some(StatusLevel::Warning));
    }

    #[test]
    fn test_template_shortcut_copies_template() {
        let (_dir, mut app) = app();
        let id = app.create_from_template_shortcut(1).unwrap();
        let template = app.store.template("todo").unwrap().clone();
        let note = app.store.note(&id).unwrap();
        assert_eq!(note.content, template.content);
        assert_eq!(note.color, template.color);
        assert!(app.create_from_template_shortcut(0).is_none());
    }

    #[test]
    fn test_search_filters_and_clears() {
        let (_dir, mut app) = app();
        let milk = app.store.create_note(NoteDraft::with_content("Buy milk")).unwrap().id;
        app.store.create_note(NoteDraft::with_content("Call mom")).unwrap();
        app.refresh_notes();
        assert_eq!(app.visible_notes.len(), 2);

        app.start_search();
        for c in "MILK".chars() {
            app.push_search_char(c);
        }
        assert_eq!(app.visible_notes, vec![milk.clone()]);
        assert_eq!(app.selected_note_id(), Some(milk.as_str()));

        app.clear_search();
        assert_eq!(app.visible_notes.len(), 2);
        assert!(!app.search.active);
    }

    #[test]
    fn test_keyboard_move_persists_geometry() {
        let (_dir, mut app) = app();
        let id = app.create_blank_note().unwrap();
        app.open_window(&id);
        app.areas.desktop = Rect::new(0, 0, 120, 40);

        app.move_window(&id, 5, -1);
        app.resize_window(&id, 10, 2);
        let stored = app.store.note(&id).unwrap().geometry();
        assert_eq!(stored, Geometry::new(15, 2, 52, 18));
        assert_eq!(app.windows.get(&id).unwrap().geometry, stored);
    }

    #[test]
    fn test_mouse_drag_persists_on_release() {
        let (_dir, mut app) = app();
        let id = app.create_blank_note().unwrap();
        app.open_window(&id);
        app.areas.desktop = Rect::new(0, 0, 120, 40);

        app.begin_drag(&id, DragKind::Move, 12, 3);
        app.drag_to(20, 6);
        assert_eq!(app.store.note(&id).unwrap().geometry(), Geometry::default());
        app.end_drag(22, 7);
        assert_eq!(app.store.note(&id).unwrap().geometry(), Geometry::new(20, 7, 42, 16));
        assert!(app.drag.is_none());
    }

    #[test]
    fn test_custom_template_lifecycle() {
        let (_dir, mut app) = app();
        app.create_blank_note();
        app.request_save_as_template();
        assert_eq!(app.dialog, DialogState::SaveAsTemplate);
        app.input_buffer = "Weekly review".to_string();
        app.confirm_save_as_template();
        assert_eq!(app.dialog, DialogState::None);
        assert_eq!(app.selected_template_id().as_deref(), Some("weekly-review"));

        app.request_rename_template();
        app.input_buffer = "Weekly".to_string();
        app.confirm_rename_template();
        assert_eq!(app.store.template("weekly-review").unwrap().name, "Weekly");

        app.request_delete_template();
        assert_eq!(app.dialog, DialogState::DeleteTemplateConfirm);
        assert!(app.delete_selected_template());
        assert!(app.store.template("weekly-review").is_none());
    }

    #[test]
    fn test_builtin_templates_are_protected() {
        let (_dir, mut app) = app();
        app.selected_template = 0;
        app.request_delete_template();
        assert_eq!(app.dialog, DialogState::None);
        assert!(!app.delete_selected_template());
        assert!(app.store.template("todo").is_some());

        app.request_rename_template();
        assert_eq!(app.dialog, DialogState::None);
    }

    #[test]
    fn test_empty_template_name_keeps_dialog_open() {
        let (_dir, mut app) = app();
        app.create_blank_note();
        app.request_save_as_template();
        app.input_buffer = "  ".to_string();
        app.confirm_save_as_template();
        assert_eq!(app.dialog, DialogState::SaveAsTemplate);
        assert!(app.dialog_error.is_some());
    }

    #[test]
    fn test_close_window_flushes_pending_edits() {
        let (_dir, mut app) = app();
        let id = app.create_blank_note().unwrap();
        app.open_window(&id);
        type_into(&mut app.windows.get_mut(&id).unwrap().buffer, "keep me");
        app.close_window(&id);
        assert_eq!(app.store.note(&id).unwrap().content, "keep me");
        assert!(app.windows.is_empty());
        assert_eq!(app.focus, Focus::Notes);
    }

    #[test]
    fn test_note_list_hit_testing() {
        let (_dir, mut app) = app();
        for text in ["a", "b", "c"] {
            app.store.create_note(NoteDraft::with_content(text)).unwrap();
        }
        app.refresh_notes();
        app.areas.notes = Rect::new(0, 0, 30, 10);
        assert_eq!(app.note_index_at(5, 1), Some(0));
        assert_eq!(app.note_index_at(5, 4), Some(1));
        assert_eq!(app.note_index_at(5, 7), None);
        assert_eq!(app.note_index_at(0, 1), None);
    }
}
