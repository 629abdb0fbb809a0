use ratatui::{
    layout::Rect,
    style::Style,
    text::Line,
    widgets::Paragraph,
    Frame,
};

use crate::editor::Editor;

#[derive(Debug, Clone, Copy)]
pub struct EditorStyle {
    pub text: Style,
    pub gutter: Style,
}

/// Draws the visible rows of an editor, with an optional line-number gutter,
/// and returns the screen cell of the cursor when it is in view.
pub fn render_editor(
    f: &mut Frame,
    editor: &mut Editor,
    area: Rect,
    style: EditorStyle,
    line_numbers: bool,
) -> Option<(u16, u16)> {
    if area.width == 0 || area.height == 0 {
        return None;
    }

    let height = area.height as usize;
    editor.set_view_height(height);

    let gutter = if line_numbers {
        gutter_width(editor.line_count()).min(area.width.saturating_sub(1))
    } else {
        0
    };
    let text_area = Rect {
        x: area.x + gutter,
        width: area.width - gutter,
        ..area
    };

    let first = editor.scroll_offset();
    let last = (first + height).min(editor.line_count());

    if gutter > 0 {
        let digits = gutter as usize - 1;
        let numbers: Vec<Line> = (first..last)
            .map(|row| Line::from(format!("{:>digits$} ", row + 1)))
            .collect();
        f.render_widget(
            Paragraph::new(numbers).style(style.gutter),
            Rect { width: gutter, ..area },
        );
    }

    // Horizontal scroll keeps the cursor column on screen.
    let cursor_col = editor.cursor_display_col();
    let h_offset = cursor_col.saturating_sub(text_area.width.saturating_sub(1) as usize);

    let lines: Vec<Line> = editor.lines()[first..last]
        .iter()
        .map(|l| Line::raw(l.as_str()))
        .collect();
    f.render_widget(
        Paragraph::new(lines)
            .style(style.text)
            .scroll((0, h_offset.min(u16::MAX as usize) as u16)),
        text_area,
    );

    let (row, _) = editor.cursor();
    let view_row = row.checked_sub(first).filter(|r| *r < height)?;
    Some((
        text_area.x + (cursor_col - h_offset) as u16,
        text_area.y + view_row as u16,
    ))
}

/// Width of the line-number column, including its trailing space.
pub fn gutter_width(line_count: usize) -> u16 {
    line_count.to_string().len().max(2) as u16 + 1
}
