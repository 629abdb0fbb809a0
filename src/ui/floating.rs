use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};

use super::editor::{render_editor, EditorStyle};
use crate::app::{FloatingWindow, FloatingWindows};
use crate::config::{parse_hex_color, Theme};
use crate::store::note::{color_name, truncate_chars};
use crate::store::{DataManager, Note};

const TITLE_CHARS: usize = 24;

/// Terminal glyphs have one size, so a note's font size maps to emphasis.
pub fn font_modifier(size: u8) -> Modifier {
    if size <= 10 {
        Modifier::DIM
    } else if size >= 18 {
        Modifier::BOLD
    } else {
        Modifier::empty()
    }
}

/// Draws every open window bottom to top over `desktop`. The top window gets
/// the terminal cursor when `focused`.
pub fn render_floating_windows(
    f: &mut Frame,
    desktop: Rect,
    theme: &Theme,
    windows: &mut FloatingWindows,
    store: &DataManager,
    focused: bool,
    line_numbers: bool,
) {
    let top = windows.len().saturating_sub(1);
    for (index, window) in windows.iter_mut().enumerate() {
        let Some(note) = store.note(window.note_id()) else { continue };
        let active = focused && index == top;
        if let Some(cursor) = render_window(f, desktop, theme, window, note, active, line_numbers) {
            if active {
                f.set_cursor_position(cursor);
            }
        }
    }
}

fn render_window(
    f: &mut Frame,
    desktop: Rect,
    theme: &Theme,
    window: &mut FloatingWindow,
    note: &Note,
    active: bool,
    line_numbers: bool,
) -> Option<(u16, u16)> {
    let rect = window.rect(desktop);
    if rect.width < 3 || rect.height < 3 {
        return None;
    }

    let paper = parse_hex_color(&note.color);
    let border_color = if active { theme.border_focused } else { theme.border };
    let unsaved = if window.buffer.is_dirty() { " ●" } else { "" };

    let title = Line::from(vec![
        Span::styled(
            format!(" {}{unsaved} ", truncate_chars(&note.title, TITLE_CHARS)),
            Style::default().fg(theme.floating.title).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("· {}pt · {} ", note.font_size, color_name(&note.color)),
            Style::default().fg(theme.floating.info),
        ),
    ]);
    let editor = &window.buffer.editor;
    let info = Line::from(Span::styled(
        format!(" {} lines · {} chars ", editor.line_count(), editor.char_count()),
        Style::default().fg(theme.floating.info),
    ));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if active { BorderType::Thick } else { BorderType::Rounded })
        .border_style(Style::default().fg(border_color).bg(paper))
        .style(Style::default().bg(paper))
        .title(title)
        .title_bottom(info);

    f.render_widget(Clear, rect);
    let inner = block.inner(rect);
    f.render_widget(block, rect);
    f.render_widget(
        Paragraph::new("◢").style(Style::default().fg(border_color).bg(paper)),
        Rect::new(rect.right() - 1, rect.bottom() - 1, 1, 1),
    );

    let style = EditorStyle {
        text: Style::default()
            .fg(theme.floating.text)
            .bg(paper)
            .add_modifier(font_modifier(note.font_size)),
        gutter: Style::default().fg(theme.floating.gutter).bg(paper),
    };
    render_editor(f, &mut window.buffer.editor, inner, style, line_numbers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_modifier_thresholds() {
        assert_eq!(font_modifier(8), Modifier::DIM);
        assert_eq!(font_modifier(10), Modifier::DIM);
        assert_eq!(font_modifier(12), Modifier::empty());
        assert_eq!(font_modifier(16), Modifier::empty());
        assert_eq!(font_modifier(18), Modifier::BOLD);
        assert_eq!(font_modifier(24), Modifier::BOLD);
    }
}
