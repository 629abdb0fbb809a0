#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Forward,
    Back,
    Up,
    Down,
    WordForward,
    WordBack,
    Head,
    End,
    Top,
    Bottom,
    PageUp,
    PageDown,
}

#[derive(Debug, Clone, Default)]
pub struct Cursor {
    pub position: Position,
    pub preferred_col: Option<usize>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pos(&self) -> Position {
        self.position
    }

    /// Moves vertically, keeping the column the user last chose horizontally.
    pub fn set_row(&mut self, row: usize, line_len: usize) {
        let preferred = self.preferred_col.unwrap_or(self.position.col);
        self.position = Position::new(row, preferred.min(line_len));
    }

    pub fn move_to(&mut self, row: usize, col: usize) {
        self.position = Position::new(row, col);
        self.preferred_col = Some(col);
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn find_word_forward(line: &str, col: usize) -> usize {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();

    if col >= len {
        return len;
    }

    let mut pos = col;

    while pos < len && is_word_char(chars[pos]) {
        pos += 1;
    }

    while pos < len && !is_word_char(chars[pos]) {
        pos += 1;
    }

    pos
}

pub fn find_word_back(line: &str, col: usize) -> usize {
    let chars: Vec<char> = line.chars().collect();

    if col == 0 {
        return 0;
    }

    let mut pos = col.min(chars.len()).saturating_sub(1);

    while pos > 0 && !is_word_char(chars[pos]) {
        pos -= 1;
    }

    while pos > 0 && is_word_char(chars[pos - 1]) {
        pos -= 1;
    }

    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_forward() {
        assert_eq!(find_word_forward("buy milk", 0), 4);
        assert_eq!(find_word_forward("buy milk", 3), 4);
        assert_eq!(find_word_forward("buy milk", 4), 8);
        assert_eq!(find_word_forward("□ Task 2", 0), 2);
    }

    #[test]
    fn test_word_back() {
        assert_eq!(find_word_back("buy milk", 8), 4);
        assert_eq!(find_word_back("buy milk", 4), 0);
        assert_eq!(find_word_back("buy milk", 0), 0);
    }

    #[test]
    fn test_vertical_moves_keep_preferred_column() {
        let mut cursor = Cursor::new();
        cursor.move_to(0, 10);
        cursor.set_row(1, 3);
        assert_eq!(cursor.pos(), Position::new(1, 3));
        cursor.set_row(2, 20);
        assert_eq!(cursor.pos(), Position::new(2, 10));
    }
}
