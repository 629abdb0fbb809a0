mod cursor;
mod input;

pub use cursor::CursorMove;
pub use input::{process_key, InputAction};

use cursor::Cursor;
use unicode_width::UnicodeWidthChar;

/// Plain multi-line text buffer with a cursor and a vertical scroll window.
#[derive(Debug, Clone)]
pub struct Editor {
    lines: Vec<String>,
    cursor: Cursor,
    scroll_offset: usize,
    view_height: usize,
    tab_width: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(vec![String::new()])
    }
}

impl Editor {
    pub fn new(lines: Vec<String>) -> Self {
        let lines = if lines.is_empty() { vec![String::new()] } else { lines };
        Self {
            lines,
            cursor: Cursor::new(),
            scroll_offset: 0,
            view_height: 0,
            tab_width: 4,
        }
    }

    /// Splits on `\n` only, so a trailing newline survives a round trip.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.split('\n').map(String::from).collect())
    }

    pub fn set_tab_width(&mut self, width: u16) {
        self.tab_width = width.max(1) as usize;
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Replaces the whole text, keeping the cursor as close as possible.
    pub fn set_text(&mut self, text: &str) {
        let pos = self.cursor.pos();
        self.lines = text.split('\n').map(String::from).collect();
        let row = pos.row.min(self.lines.len() - 1);
        let col = pos.col.min(self.line_len(row));
        self.cursor.move_to(row, col);
        self.ensure_cursor_visible();
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn char_count(&self) -> usize {
        self.lines.iter().map(|l| l.chars().count()).sum::<usize>() + self.lines.len() - 1
    }

    pub fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map(|l| l.chars().count()).unwrap_or(0)
    }

    pub fn cursor(&self) -> (usize, usize) {
        let pos = self.cursor.pos();
        (pos.row, pos.col)
    }

    /// Display column of the cursor, counting wide characters as two cells.
    pub fn cursor_display_col(&self) -> usize {
        let pos = self.cursor.pos();
        self.lines[pos.row]
            .chars()
            .take(pos.col)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    pub fn set_cursor(&mut self, row: usize, col: usize) {
        let row = row.min(self.lines.len() - 1);
        let col = col.min(self.line_len(row));
        self.cursor.move_to(row, col);
        self.ensure_cursor_visible();
    }

    /// Places the cursor at a screen cell relative to the first visible row.
    pub fn click(&mut self, view_row: usize, display_col: usize) {
        let row = (self.scroll_offset + view_row).min(self.lines.len() - 1);
        let mut width = 0;
        let mut col = 0;
        for c in self.lines[row].chars() {
            let w = c.width().unwrap_or(0);
            if width + w > display_col {
                break;
            }
            width += w;
            col += 1;
        }
        self.set_cursor(row, col);
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn set_view_height(&mut self, height: usize) {
        self.view_height = height;
        self.ensure_cursor_visible();
    }

    fn ensure_cursor_visible(&mut self) {
        let row = self.cursor.pos().row;
        if self.view_height == 0 {
            return;
        }
        if row < self.scroll_offset {
            self.scroll_offset = row;
        } else if row >= self.scroll_offset + self.view_height {
            self.scroll_offset = row + 1 - self.view_height;
        }
    }

    pub fn move_cursor(&mut self, movement: CursorMove) {
        let pos = self.cursor.pos();
        let line_count = self.lines.len();
        let page = self.view_height.max(1);

        match movement {
            CursorMove::Forward => {
                if pos.col < self.line_len(pos.row) {
                    self.cursor.move_to(pos.row, pos.col + 1);
                } else if pos.row + 1 < line_count {
                    self.cursor.move_to(pos.row + 1, 0);
                }
            }
            CursorMove::Back => {
                if pos.col > 0 {
                    self.cursor.move_to(pos.row, pos.col - 1);
                } else if pos.row > 0 {
                    self.cursor.move_to(pos.row - 1, self.line_len(pos.row - 1));
                }
            }
            CursorMove::Up => {
                if pos.row > 0 {
                    self.cursor.set_row(pos.row - 1, self.line_len(pos.row - 1));
                }
            }
            CursorMove::Down => {
                if pos.row + 1 < line_count {
                    self.cursor.set_row(pos.row + 1, self.line_len(pos.row + 1));
                }
            }
            CursorMove::PageUp => {
                let row = pos.row.saturating_sub(page);
                self.cursor.set_row(row, self.line_len(row));
            }
            CursorMove::PageDown => {
                let row = (pos.row + page).min(line_count - 1);
                self.cursor.set_row(row, self.line_len(row));
            }
            CursorMove::Head => self.cursor.move_to(pos.row, 0),
            CursorMove::End => self.cursor.move_to(pos.row, self.line_len(pos.row)),
            CursorMove::Top => self.cursor.move_to(0, 0),
            CursorMove::Bottom => {
                let last = line_count - 1;
                self.cursor.move_to(last, self.line_len(last));
            }
            CursorMove::WordForward => {
                let line_len = self.line_len(pos.row);
                if pos.col >= line_len && pos.row + 1 < line_count {
                    self.cursor.move_to(pos.row + 1, 0);
                } else {
                    let col = cursor::find_word_forward(&self.lines[pos.row], pos.col);
                    self.cursor.move_to(pos.row, col);
                }
            }
            CursorMove::WordBack => {
                if pos.col == 0 && pos.row > 0 {
                    self.cursor.move_to(pos.row - 1, self.line_len(pos.row - 1));
                } else {
                    let col = cursor::find_word_back(&self.lines[pos.row], pos.col);
                    self.cursor.move_to(pos.row, col);
                }
            }
        }
        self.ensure_cursor_visible();
    }

    pub fn insert_char(&mut self, c: char) {
        if c == '\n' {
            self.insert_newline();
            return;
        }
        let pos = self.cursor.pos();
        let line = &mut self.lines[pos.row];
        let at = byte_index(line, pos.col);
        line.insert(at, c);
        self.cursor.move_to(pos.row, pos.col + 1);
        self.ensure_cursor_visible();
    }

    pub fn insert_tab(&mut self) {
        let pos = self.cursor.pos();
        let spaces = self.tab_width - pos.col % self.tab_width;
        self.insert_str(&" ".repeat(spaces));
    }

    /// Inserts text at the cursor; embedded newlines split lines.
    pub fn insert_str(&mut self, s: &str) {
        let text = s.replace("\r\n", "\n").replace('\r', "\n");
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            let pos = self.cursor.pos();
            let line = &mut self.lines[pos.row];
            let at = byte_index(line, pos.col);
            line.insert_str(at, first);
            self.cursor.move_to(pos.row, pos.col + first.chars().count());
        }
        for part in parts {
            self.insert_newline();
            let pos = self.cursor.pos();
            self.lines[pos.row].insert_str(0, part);
            self.cursor.move_to(pos.row, part.chars().count());
        }
        self.ensure_cursor_visible();
    }

    pub fn insert_newline(&mut self) {
        let pos = self.cursor.pos();
        let line = &mut self.lines[pos.row];
        let at = byte_index(line, pos.col);
        let rest = line.split_off(at);
        self.lines.insert(pos.row + 1, rest);
        self.cursor.move_to(pos.row + 1, 0);
        self.ensure_cursor_visible();
    }

    /// Deletes the character under the cursor, joining lines at the end of a line.
    pub fn delete_char(&mut self) -> bool {
        let pos = self.cursor.pos();
        if pos.col < self.line_len(pos.row) {
            let line = &mut self.lines[pos.row];
            let at = byte_index(line, pos.col);
            line.remove(at);
            true
        } else if pos.row + 1 < self.lines.len() {
            let next = self.lines.remove(pos.row + 1);
            self.lines[pos.row].push_str(&next);
            true
        } else {
            false
        }
    }

    /// Backspace.
    pub fn delete_newline(&mut self) -> bool {
        let pos = self.cursor.pos();
        if pos.col > 0 {
            let line = &mut self.lines[pos.row];
            let at = byte_index(line, pos.col - 1);
            line.remove(at);
            self.cursor.move_to(pos.row, pos.col - 1);
        } else if pos.row > 0 {
            let current = self.lines.remove(pos.row);
            let prev_len = self.line_len(pos.row - 1);
            self.lines[pos.row - 1].push_str(&current);
            self.cursor.move_to(pos.row - 1, prev_len);
        } else {
            return false;
        }
        self.ensure_cursor_visible();
        true
    }
}

fn byte_index(line: &str, col: usize) -> usize {
    line.char_indices().nth(col).map(|(i, _)| i).unwrap_or(line.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip_keeps_trailing_newline() {
        let editor = Editor::from_text("a\nb\n");
        assert_eq!(editor.line_count(), 3);
        assert_eq!(editor.text(), "a\nb\n");
        assert_eq!(Editor::from_text("").text(), "");
    }

    #[test]
    fn test_typing_and_backspace() {
        let mut editor = Editor::default();
        for c in "Buy milk".chars() {
            editor.insert_char(c);
        }
        editor.insert_newline();
        editor.insert_char('x');
        assert_eq!(editor.text(), "Buy milk\nx");
        assert_eq!(editor.cursor(), (1, 1));

        editor.delete_newline();
        editor.delete_newline();
        assert_eq!(editor.text(), "Buy milk");
        assert_eq!(editor.cursor(), (0, 8));
        assert_eq!(editor.char_count(), 8);
    }

    #[test]
    fn test_multibyte_editing() {
        let mut editor = Editor::from_text("□ Task");
        editor.set_cursor(0, 1);
        editor.insert_char('!');
        assert_eq!(editor.text(), "□! Task");
        editor.move_cursor(CursorMove::Head);
        assert!(editor.delete_char());
        assert_eq!(editor.text(), "! Task");
    }

    #[test]
    fn test_insert_str_splits_lines() {
        let mut editor = Editor::from_text("ab");
        editor.set_cursor(0, 1);
        editor.insert_str("1\r\n2\n3");
        assert_eq!(editor.text(), "a1\n2\n3b");
        assert_eq!(editor.cursor(), (2, 1));
    }

    #[test]
    fn test_delete_char_joins_lines() {
        let mut editor = Editor::from_text("ab\ncd");
        editor.move_cursor(CursorMove::End);
        assert!(editor.delete_char());
        assert_eq!(editor.text(), "abcd");
        editor.move_cursor(CursorMove::Bottom);
        assert!(!editor.delete_char());
    }

    #[test]
    fn test_set_text_clamps_cursor() {
        let mut editor = Editor::from_text("one\ntwo\nthree");
        editor.move_cursor(CursorMove::Bottom);
        editor.set_text("x");
        assert_eq!(editor.cursor(), (0, 1));
    }

    #[test]
    fn test_scroll_follows_cursor() {
        let mut editor = Editor::from_text(&"line\n".repeat(20));
        editor.set_view_height(5);
        editor.move_cursor(CursorMove::Bottom);
        assert_eq!(editor.scroll_offset(), 16);
        editor.move_cursor(CursorMove::Top);
        assert_eq!(editor.scroll_offset(), 0);
    }

    #[test]
    fn test_tab_and_wide_cursor_column() {
        let mut editor = Editor::default();
        editor.insert_char('a');
        editor.insert_tab();
        assert_eq!(editor.text(), "a   ");
        let mut wide = Editor::from_text("日本");
        wide.move_cursor(CursorMove::End);
        assert_eq!(wide.cursor_display_col(), 4);
    }

    #[test]
    fn test_click_maps_display_columns() {
        let mut editor = Editor::from_text("ab\n日本語\nxyz");
        editor.click(1, 3);
        assert_eq!(editor.cursor(), (1, 1));
        editor.click(0, 40);
        assert_eq!(editor.cursor(), (0, 2));
        editor.click(9, 0);
        assert_eq!(editor.cursor(), (2, 0));
    }
}
