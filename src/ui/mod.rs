mod dialogs;
mod editor;
mod floating;
mod preview;
mod sidebar;
mod status_bar;
mod templates;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Frame,
};

use crate::app::{App, DialogState, Focus, Mode};
use crate::store::Note;

pub use dialogs::{
    render_delete_confirm_dialog, render_delete_template_dialog, render_help_dialog, render_name_dialog,
};
pub use editor::gutter_width;
pub use floating::render_floating_windows;
pub use preview::{render_preview, PreviewView};
pub use sidebar::{render_sidebar, NoteListView};
pub use status_bar::render_status_bar;
pub use templates::render_templates;

pub fn render(f: &mut Frame, app: &mut App) {
    f.render_widget(Block::default().style(Style::default().bg(app.theme.background)), f.area());

    // Main area + status bar
    let vertical_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());
    let desktop = vertical_chunks[0];

    // Left column (notes over templates) and preview
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(desktop);

    let template_rows = (app.store.templates().len() as u16 + 2).min(chunks[0].height / 2);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(template_rows)])
        .split(chunks[0]);

    let floating_focused = app.focus == Focus::Floating;

    let notes: Vec<&Note> = app.visible_notes.iter().filter_map(|id| app.store.note(id)).collect();
    let list_area = render_sidebar(
        f,
        &app.theme,
        &app.search,
        NoteListView {
            notes: &notes,
            total: app.store.note_count(),
            selected: app.selected_note,
            focused: app.focus == Focus::Notes,
        },
        &mut app.note_list_state,
        left[0],
    );

    let templates = app.store.templates();
    render_templates(
        f,
        &app.theme,
        &templates,
        app.selected_template,
        app.focus == Focus::Templates,
        &mut app.template_list_state,
        left[1],
    );

    let selected = app
        .visible_notes
        .get(app.selected_note)
        .and_then(|id| app.store.note(id));
    let preview_body = render_preview(
        f,
        &app.theme,
        PreviewView {
            note: selected,
            buffer: app.preview.as_mut(),
            editing: app.mode == Mode::Edit,
            focused: app.focus == Focus::Preview,
            line_numbers: app.config.editor.line_numbers,
        },
        chunks[1],
    );

    render_floating_windows(
        f,
        desktop,
        &app.theme,
        &mut app.windows,
        &app.store,
        floating_focused && app.dialog == DialogState::None,
        app.config.editor.line_numbers,
    );

    app.areas.desktop = desktop;
    app.areas.notes = list_area;
    app.areas.templates = left[1];
    app.areas.preview = preview_body;

    render_status_bar(f, app, &app.theme, vertical_chunks[1]);

    match app.dialog {
        DialogState::DeleteConfirm => render_delete_confirm_dialog(f, app, &app.theme),
        DialogState::DeleteTemplateConfirm => render_delete_template_dialog(f, app, &app.theme),
        DialogState::SaveAsTemplate => {
            render_name_dialog(f, app, &app.theme, "Save as Template", "Template name:", "Save")
        }
        DialogState::RenameTemplate => {
            render_name_dialog(f, app, &app.theme, "Rename Template", "Template name:", "Rename")
        }
        DialogState::EditTitle => render_name_dialog(f, app, &app.theme, "Edit Title", "Note title:", "Save"),
        DialogState::Help => render_help_dialog(f, app, &app.theme),
        DialogState::None => {}
    }
}
