use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};

use super::editor::{render_editor, EditorStyle};
use super::floating::font_modifier;
use crate::app::NoteBuffer;
use crate::config::{parse_hex_color, Theme};
use crate::store::note::color_name;
use crate::store::Note;

const DATE_FMT: &str = "%b %d %Y %H:%M";

pub struct PreviewView<'a> {
    pub note: Option<&'a Note>,
    pub buffer: Option<&'a mut NoteBuffer>,
    pub editing: bool,
    pub focused: bool,
    pub line_numbers: bool,
}

/// Returns the area holding the note body, used to place clicks.
pub fn render_preview(f: &mut Frame, theme: &Theme, view: PreviewView<'_>, area: Rect) -> Rect {
    let border_color = if view.focused { theme.border_focused } else { theme.border };
    let title = if view.editing { " Editing " } else { " Preview " };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(if view.editing { BorderType::Thick } else { BorderType::Plain })
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(theme.preview.background));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let (Some(note), Some(buffer)) = (view.note, view.buffer) else {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No note selected", Style::default().fg(theme.muted))),
            Line::from(Span::styled("Press n to create one", Style::default().fg(theme.muted))),
        ])
        .alignment(Alignment::Center);
        f.render_widget(empty, inner);
        return inner;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(inner);

    let paper = parse_hex_color(&note.color);
    let header = vec![
        Line::from(vec![
            Span::styled("■ ", Style::default().fg(paper)),
            Span::styled(
                note.title.as_str(),
                Style::default().fg(theme.preview.title).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            format!(
                "{} · {}pt · created {} · updated {}",
                color_name(&note.color),
                note.font_size,
                note.created_at.format(DATE_FMT),
                note.updated_at.format(DATE_FMT),
            ),
            Style::default().fg(theme.preview.meta),
        )),
        Line::from(Span::styled(
            "─".repeat(chunks[0].width as usize),
            Style::default().fg(theme.border),
        )),
    ];
    f.render_widget(Paragraph::new(header), chunks[0]);

    let text_style = Style::default()
        .fg(theme.preview.text)
        .add_modifier(font_modifier(note.font_size));

    if view.editing {
        let style = EditorStyle {
            text: text_style,
            gutter: Style::default().fg(theme.muted),
        };
        if let Some(cursor) = render_editor(f, &mut buffer.editor, chunks[1], style, view.line_numbers) {
            f.set_cursor_position(cursor);
        }
    } else {
        let body = Paragraph::new(buffer.editor.text())
            .style(text_style)
            .wrap(Wrap { trim: false });
        f.render_widget(body, chunks[1]);
    }

    chunks[1]
}
