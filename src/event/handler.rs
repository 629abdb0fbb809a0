use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};

use crate::app::{App, DialogState, DragKind, Focus, Mode, NoteBuffer, WindowHit};
use crate::clipboard;
use crate::editor::{process_key, InputAction};
use crate::ui;

const MOVE_STEP: i32 = 2;
const RESIZE_STEP: i32 = 2;

pub fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> io::Result<()> {
    let mut needs_render = true;

    loop {
        if app.flush_due(Instant::now()) {
            needs_render = true;
        }
        if app.pump_sync() {
            needs_render = true;
        }

        if needs_render {
            terminal.draw(|f| ui::render(f, app))?;
            needs_render = false;
        }

        let has_background_work = app.has_pending_edits() || app.drag.is_some();

        if has_background_work {
            let timeout = if app.drag.is_some() {
                Duration::from_millis(33)
            } else {
                app.next_flush_in(Instant::now())
                    .unwrap_or(Duration::from_millis(100))
                    .max(Duration::from_millis(5))
            };

            if event::poll(timeout)? && process_events(app, &mut needs_render)? {
                return Ok(());
            }
        } else {
            // idle block until event to avoid unnecessary cpu usage
            if process_events(app, &mut needs_render)? {
                return Ok(());
            }
        }
    }
}

// Drain a burst of events before the next frame so fast typing and mouse
// drags do not render once per event.
fn process_events(app: &mut App, needs_render: &mut bool) -> io::Result<bool> {
    const MAX_EVENTS_PER_BATCH: u8 = 8;
    let mut count = 0u8;

    loop {
        let event = event::read()?;
        count += 1;
        *needs_render = true;

        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if handle_key_event(app, key) {
                    return Ok(true);
                }
            }
            Event::Mouse(mouse) => handle_mouse_event(app, mouse),
            Event::Paste(text) => app.paste_text(&text),
            _ => {}
        }

        if count >= MAX_EVENTS_PER_BATCH || !event::poll(Duration::ZERO)? {
            break;
        }
    }

    Ok(false)
}

/// Returns `true` when the application should quit.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    // Handle dialogs first
    match app.dialog {
        DialogState::DeleteConfirm => {
            handle_delete_confirm_dialog(app, key);
            return false;
        }
        DialogState::DeleteTemplateConfirm => {
            handle_delete_template_dialog(app, key);
            return false;
        }
        DialogState::SaveAsTemplate | DialogState::RenameTemplate | DialogState::EditTitle => {
            handle_name_dialog(app, key);
            return false;
        }
        DialogState::Help => {
            handle_help_dialog(app, key);
            return false;
        }
        DialogState::None => {}
    }

    if app.search.active {
        handle_search_input(app, key);
        return false;
    }

    if app.mode == Mode::Edit {
        handle_edit_mode(app, key);
        return false;
    }

    if app.focus == Focus::Floating && !app.windows.is_empty() {
        handle_window_keys(app, key);
        return false;
    }

    handle_normal_mode(app, key)
}

fn handle_delete_confirm_dialog(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.delete_selected_note();
            app.close_dialog();
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.close_dialog(),
        _ => {}
    }
}

fn handle_delete_template_dialog(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.delete_selected_template();
            app.close_dialog();
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.close_dialog(),
        _ => {}
    }
}

fn handle_name_dialog(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => match app.dialog {
            DialogState::SaveAsTemplate => app.confirm_save_as_template(),
            DialogState::RenameTemplate => app.confirm_rename_template(),
            DialogState::EditTitle => app.confirm_edit_title(),
            _ => {}
        },
        KeyCode::Esc => app.close_dialog(),
        KeyCode::Char(c) => {
            app.dialog_error = None;
            app.input_buffer.push(c);
        }
        KeyCode::Backspace => {
            app.dialog_error = None;
            app.input_buffer.pop();
        }
        _ => {}
    }
}

fn handle_help_dialog(app: &mut App, key: KeyEvent) {
    const MAX_HELP_LINES: u16 = 40;

    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.help_scroll = 0;
            app.dialog = DialogState::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll = app.help_scroll.saturating_add(1).min(MAX_HELP_LINES);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll = app.help_scroll.saturating_sub(1);
        }
        KeyCode::Char('g') => app.help_scroll = 0,
        KeyCode::Char('G') => app.help_scroll = MAX_HELP_LINES,
        _ => {}
    }
}

fn handle_search_input(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.clear_search(),
        KeyCode::Enter => app.finish_search(),
        KeyCode::Backspace => app.pop_search_char(),
        KeyCode::Down => app.next_note(),
        KeyCode::Up => app.previous_note(),
        KeyCode::Char('j') | KeyCode::Char('n') if ctrl => app.next_note(),
        KeyCode::Char('k') | KeyCode::Char('p') if ctrl => app.previous_note(),
        KeyCode::Char(c) if !ctrl => app.push_search_char(c),
        _ => {}
    }
}

/// Shared editing keys for the preview editor and floating windows.
/// Returns `false` when the key was not for the editor.
fn edit_buffer(buffer: &mut NoteBuffer, key: KeyEvent) -> bool {
    match process_key(&mut buffer.editor, key) {
        InputAction::Edited => {
            buffer.mark_edited(Instant::now());
            true
        }
        InputAction::Moved => true,
        InputAction::Ignored => false,
    }
}

fn paste_from_clipboard(app: &mut App) {
    match clipboard::paste_text() {
        Some(text) => app.paste_text(&text),
        None => app.set_warning("Clipboard is empty or unavailable"),
    }
}

fn handle_edit_mode(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.exit_edit_mode(),
        KeyCode::Char('s') if ctrl => {
            if app.flush_preview() {
                app.set_info("Saved");
            }
        }
        KeyCode::Char('v') if ctrl => paste_from_clipboard(app),
        _ => {
            if let Some(buffer) = app.preview.as_mut() {
                edit_buffer(buffer, key);
            }
        }
    }
}

fn handle_window_keys(app: &mut App, key: KeyEvent) {
    let Some(id) = app.windows.top().map(|w| w.note_id().to_string()) else { return };
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    if alt {
        let (dx, dy) = match key.code {
            KeyCode::Left => (-1, 0),
            KeyCode::Right => (1, 0),
            KeyCode::Up => (0, -1),
            KeyCode::Down => (0, 1),
            _ => return,
        };
        if shift {
            app.resize_window(&id, dx * RESIZE_STEP, dy);
        } else {
            app.move_window(&id, dx * MOVE_STEP, dy);
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.focus = Focus::Notes,
        KeyCode::F(6) => app.cycle_windows(),
        KeyCode::BackTab => app.toggle_focus(true),
        KeyCode::Char('w') if ctrl => app.close_top_window(),
        KeyCode::Char('r') if ctrl => app.request_edit_title(&id),
        KeyCode::Char('s') if ctrl => {
            if app.flush_all() {
                app.set_info("Saved");
            }
        }
        KeyCode::Char('l') if ctrl => app.cycle_color(&id),
        KeyCode::Up if ctrl => app.change_font_size(&id, true),
        KeyCode::Down if ctrl => app.change_font_size(&id, false),
        KeyCode::Char('y') if ctrl => app.copy_note(&id),
        KeyCode::Char('v') if ctrl => paste_from_clipboard(app),
        _ => {
            if let Some(window) = app.windows.top_mut() {
                edit_buffer(&mut window.buffer, key);
            }
        }
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => app.dialog = DialogState::Help,
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Tab => app.toggle_focus(false),
        KeyCode::BackTab => app.toggle_focus(true),
        KeyCode::Esc => {
            if app.search.is_filtering() {
                app.clear_search();
            }
        }
        KeyCode::Char('n') => {
            app.create_blank_note();
        }
        KeyCode::Char(c @ '1'..='9') => {
            app.create_from_template_shortcut(c as usize - '0' as usize);
        }
        KeyCode::Char('R') => app.reload(),
        _ if app.focus == Focus::Templates => handle_templates_keys(app, key),
        _ => handle_notes_keys(app, key),
    }
    false
}

fn handle_notes_keys(app: &mut App, key: KeyEvent) {
    let selected = app.selected_note_id().map(str::to_string);
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.next_note(),
        KeyCode::Char('k') | KeyCode::Up => app.previous_note(),
        KeyCode::Char('g') | KeyCode::Home => app.goto_first_note(),
        KeyCode::Char('G') | KeyCode::End => app.goto_last_note(),
        KeyCode::Enter => app.open_selected_in_window(),
        KeyCode::Char('e') => app.enter_edit_mode(),
        KeyCode::Char('d') => app.request_delete_note(),
        KeyCode::Char('t') => app.request_save_as_template(),
        _ => {
            let Some(id) = selected else { return };
            match key.code {
                KeyCode::Char('r') => app.request_edit_title(&id),
                KeyCode::Char('c') => app.cycle_color(&id),
                KeyCode::Char('+') | KeyCode::Char('=') => app.change_font_size(&id, true),
                KeyCode::Char('-') => app.change_font_size(&id, false),
                KeyCode::Char('y') => app.copy_note(&id),
                _ => {}
            }
        }
    }
}

fn handle_templates_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.next_template(),
        KeyCode::Char('k') | KeyCode::Up => app.previous_template(),
        KeyCode::Enter => {
            app.create_from_selected_template();
        }
        KeyCode::Char('r') => app.request_rename_template(),
        KeyCode::Char('d') => app.request_delete_template(),
        _ => {}
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.right() && row >= area.y && row < area.bottom()
}

/// Moves an editor cursor to a click inside `text_area`.
fn click_editor(buffer: &mut NoteBuffer, text_area: Rect, line_numbers: bool, column: u16, row: u16) {
    if !contains(text_area, column, row) {
        return;
    }
    let gutter = if line_numbers { ui::gutter_width(buffer.editor.line_count()) } else { 0 };
    let offset = column - text_area.x;
    if offset < gutter {
        return;
    }
    buffer
        .editor
        .click((row - text_area.y) as usize, (offset - gutter) as usize);
}

fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    let (column, row) = (mouse.column, mouse.row);

    if app.dialog != DialogState::None {
        if app.dialog == DialogState::Help {
            match mouse.kind {
                MouseEventKind::ScrollDown => app.help_scroll = app.help_scroll.saturating_add(1),
                MouseEventKind::ScrollUp => app.help_scroll = app.help_scroll.saturating_sub(1),
                _ => {}
            }
        }
        return;
    }

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            app.search.active = false;
            let desktop = app.areas.desktop;

            if let Some((id, hit)) = app.windows.hit_test(desktop, column, row) {
                app.focus_window(&id);
                match hit {
                    WindowHit::TitleBar => app.begin_drag(&id, DragKind::Move, column, row),
                    WindowHit::ResizeHandle => app.begin_drag(&id, DragKind::Resize, column, row),
                    WindowHit::Body => {
                        let line_numbers = app.config.editor.line_numbers;
                        if let Some(window) = app.windows.get_mut(&id) {
                            let rect = window.rect(desktop);
                            let inner = Rect {
                                x: rect.x + 1,
                                y: rect.y + 1,
                                width: rect.width.saturating_sub(2),
                                height: rect.height.saturating_sub(2),
                            };
                            click_editor(&mut window.buffer, inner, line_numbers, column, row);
                        }
                    }
                }
                return;
            }

            if let Some(index) = app.note_index_at(column, row) {
                if app.mode == Mode::Edit {
                    app.exit_edit_mode();
                }
                app.focus = Focus::Notes;
                app.select_note_index(index);
            } else if let Some(index) = app.template_index_at(column, row) {
                if app.mode == Mode::Edit {
                    app.exit_edit_mode();
                }
                app.focus = Focus::Templates;
                app.selected_template = index;
            } else if contains(app.areas.preview, column, row) {
                app.focus = Focus::Preview;
                if app.mode == Mode::Edit {
                    let (area, line_numbers) = (app.areas.preview, app.config.editor.line_numbers);
                    if let Some(buffer) = app.preview.as_mut() {
                        click_editor(buffer, area, line_numbers, column, row);
                    }
                }
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => app.drag_to(column, row),
        MouseEventKind::Up(MouseButton::Left) => {
            if app.drag.is_some() {
                app.end_drag(column, row);
            }
        }
        MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
            let down = mouse.kind == MouseEventKind::ScrollDown;
            if contains(app.areas.notes, column, row) && app.mode == Mode::Normal {
                if down { app.next_note() } else { app.previous_note() }
            } else if contains(app.areas.templates, column, row) {
                if down { app.next_template() } else { app.previous_template() }
            }
        }
        _ => {}
    }
}
