use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult};

pub const DEFAULT_NOTE_COLOR: &str = "#FFF9C4";
pub const DEFAULT_FONT_SIZE: u8 = 12;
pub const FONT_SIZES: [u8; 7] = [8, 10, 12, 14, 16, 18, 24];

pub const UNTITLED: &str = "Untitled Note";
const MAX_TITLE_CHARS: usize = 150;
const MAX_DERIVED_TITLE_CHARS: usize = 30;

/// Named pastel palette cycled through by the color controls.
pub const COLOR_PALETTE: [(&str, &str); 8] = [
    ("Yellow", "#FFF9C4"),
    ("Green", "#C8E6C9"),
    ("Blue", "#BBDEFB"),
    ("Purple", "#E1BEE7"),
    ("Red", "#FFCDD2"),
    ("White", "#F5F5F5"),
    ("Orange", "#FFCCBC"),
    ("Light Green", "#DCEDC8"),
];

/// Window geometry limits, in terminal cells.
pub const MIN_WIDTH: u16 = 20;
pub const MIN_HEIGHT: u16 = 6;
pub const MAX_WIDTH: u16 = 120;
pub const MAX_HEIGHT: u16 = 50;

pub const TIME_FMT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Position and size of a note's floating window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub w: u16,
    pub h: u16,
}

impl Default for Geometry {
    fn default() -> Self {
        Self { x: default_x(), y: default_y(), w: default_w(), h: default_h() }
    }
}

impl Geometry {
    pub fn new(x: i32, y: i32, w: u16, h: u16) -> Self {
        Self { x, y, w, h }.clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            x: self.x,
            y: self.y,
            w: self.w.clamp(MIN_WIDTH, MAX_WIDTH),
            h: self.h.clamp(MIN_HEIGHT, MAX_HEIGHT),
        }
    }

    pub fn moved_by(self, dx: i32, dy: i32) -> Self {
        Self { x: self.x.saturating_add(dx), y: self.y.saturating_add(dy), ..self }
    }

    pub fn resized_by(self, dw: i32, dh: i32) -> Self {
        let w = (self.w as i32 + dw).clamp(MIN_WIDTH as i32, MAX_WIDTH as i32) as u16;
        let h = (self.h as i32 + dh).clamp(MIN_HEIGHT as i32, MAX_HEIGHT as i32) as u16;
        Self { w, h, ..self }
    }
}

/// One sticky note as persisted in `<data_dir>/notes/<id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_font_size")]
    pub font_size: u8,
    #[serde(default = "default_x")]
    pub x: i32,
    #[serde(default = "default_y")]
    pub y: i32,
    #[serde(default = "default_w")]
    pub w: u16,
    #[serde(default = "default_h")]
    pub h: u16,
    #[serde(default = "now", with = "timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(default = "now", with = "timestamp")]
    pub updated_at: NaiveDateTime,
}

fn default_color() -> String { DEFAULT_NOTE_COLOR.to_string() }
fn default_font_size() -> u8 { DEFAULT_FONT_SIZE }
fn default_x() -> i32 { 10 }
fn default_y() -> i32 { 3 }
fn default_w() -> u16 { 42 }
fn default_h() -> u16 { 16 }

/// Current local time, truncated to the millisecond precision stored on disk.
pub fn now() -> NaiveDateTime {
    let stamp = Local::now().naive_local();
    let millis = stamp.nanosecond() / 1_000_000;
    stamp.with_nanosecond(millis * 1_000_000).unwrap_or(stamp)
}

/// Fields accepted when creating a note. Everything but the content is optional.
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub title: Option<String>,
    pub content: String,
    pub color: Option<String>,
    pub font_size: Option<u8>,
    pub geometry: Option<Geometry>,
}

impl NoteDraft {
    #[cfg(test)]
    pub fn with_content(content: impl Into<String>) -> Self {
        Self { content: content.into(), ..Self::default() }
    }
}

/// A single mutation applied through the data manager.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteUpdate {
    Content(String),
    Title(String),
    Appearance { color: Option<String>, font_size: Option<u8> },
    Geometry(Geometry),
}

impl Note {
    /// Builds a note from a draft. The caller supplies the id.
    pub fn from_draft(id: String, draft: NoteDraft) -> StoreResult<Self> {
        let color = match draft.color {
            Some(color) => validate_color(&color)?,
            None => default_color(),
        };
        let font_size = match draft.font_size {
            Some(size) => validate_font_size(size)?,
            None => DEFAULT_FONT_SIZE,
        };
        let geometry = draft.geometry.unwrap_or_default().clamped();
        let title = match draft.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => validate_title(title),
            _ => derive_title(&draft.content),
        };
        let stamp = now();

        Ok(Self {
            id,
            title,
            content: draft.content,
            color,
            font_size,
            x: geometry.x,
            y: geometry.y,
            w: geometry.w,
            h: geometry.h,
            created_at: stamp,
            updated_at: stamp,
        })
    }

    pub fn geometry(&self) -> Geometry {
        Geometry { x: self.x, y: self.y, w: self.w, h: self.h }
    }

    /// Applies an update and refreshes `updated_at`. Invalid input leaves the note untouched.
    pub fn apply(&mut self, update: NoteUpdate) -> StoreResult<()> {
        match update {
            NoteUpdate::Content(content) => {
                self.title = derive_title(&content);
                self.content = content;
            }
            NoteUpdate::Title(title) => {
                self.title = validate_title(&title);
            }
            NoteUpdate::Appearance { color, font_size } => {
                let color = color.map(|c| validate_color(&c)).transpose()?;
                let font_size = font_size.map(validate_font_size).transpose()?;
                if let Some(color) = color {
                    self.color = color;
                }
                if let Some(size) = font_size {
                    self.font_size = size;
                }
            }
            NoteUpdate::Geometry(geometry) => {
                let geometry = geometry.clamped();
                self.x = geometry.x;
                self.y = geometry.y;
                self.w = geometry.w;
                self.h = geometry.h;
            }
        }
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) {
        let stamp = now();
        // Keep updated_at monotonic even if the clock steps backwards.
        self.updated_at = stamp.max(self.updated_at);
    }

    /// Repairs fields of a record read from disk instead of rejecting it.
    pub fn normalize(&mut self) {
        if !is_valid_color(&self.color) {
            self.color = default_color();
        }
        self.font_size = snap_font_size(self.font_size);
        let geometry = self.geometry().clamped();
        self.w = geometry.w;
        self.h = geometry.h;
        self.title = if self.title.trim().is_empty() {
            derive_title(&self.content)
        } else {
            validate_title(&self.title)
        };
    }

    /// Single-line preview of the content.
    pub fn preview(&self, max_chars: usize) -> String {
        let flat: String = self
            .content
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        truncate_chars(&flat, max_chars)
    }

    pub fn line_count(&self) -> usize {
        self.content.split('\n').count()
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    pub fn matches(&self, query_lower: &str) -> usize {
        count_matches(&self.content.to_lowercase(), query_lower)
            + count_matches(&self.title.to_lowercase(), query_lower)
    }
}

fn count_matches(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

pub fn generate_note_id(millis: i64) -> String {
    format!("note_{millis}")
}

/// Truncates to `max_chars` characters, ending with "..." when shortened.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

pub fn validate_title(title: &str) -> String {
    if title.is_empty() {
        return UNTITLED.to_string();
    }
    truncate_chars(title, MAX_TITLE_CHARS)
}

/// Title shown for a note: its first non-empty line, shortened.
pub fn derive_title(content: &str) -> String {
    let first_line = content.trim().lines().next().map(str::trim).unwrap_or("");
    if first_line.is_empty() {
        return UNTITLED.to_string();
    }
    validate_title(&truncate_chars(first_line, MAX_DERIVED_TITLE_CHARS))
}

pub fn is_valid_color(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#') else { return false };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn validate_color(color: &str) -> StoreResult<String> {
    let color = color.trim();
    if is_valid_color(color) {
        Ok(color.to_string())
    } else {
        Err(StoreError::Validation(format!("'{color}' is not a #RRGGBB color")))
    }
}

fn validate_font_size(size: u8) -> StoreResult<u8> {
    if FONT_SIZES.contains(&size) {
        Ok(size)
    } else {
        Err(StoreError::Validation(format!(
            "font size {size} is not one of {FONT_SIZES:?}"
        )))
    }
}

pub fn snap_font_size(size: u8) -> u8 {
    FONT_SIZES
        .iter()
        .copied()
        .min_by_key(|allowed| (*allowed as i16 - size as i16).abs())
        .unwrap_or(DEFAULT_FONT_SIZE)
}

pub fn next_font_size(current: u8) -> Option<u8> {
    FONT_SIZES.iter().copied().find(|size| *size > current)
}

pub fn prev_font_size(current: u8) -> Option<u8> {
    FONT_SIZES.iter().rev().copied().find(|size| *size < current)
}

pub fn next_palette_color(current: &str) -> &'static str {
    let idx = COLOR_PALETTE
        .iter()
        .position(|(_, hex)| hex.eq_ignore_ascii_case(current));
    match idx {
        Some(i) => COLOR_PALETTE[(i + 1) % COLOR_PALETTE.len()].1,
        None => COLOR_PALETTE[0].1,
    }
}

pub fn color_name(color: &str) -> &str {
    COLOR_PALETTE
        .iter()
        .find(|(_, hex)| hex.eq_ignore_ascii_case(color))
        .map(|(name, _)| *name)
        .unwrap_or(color)
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.format(super::TIME_FMT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(content: &str) -> Note {
        Note::from_draft("note_1".into(), NoteDraft::with_content(content)).unwrap()
    }

    #[test]
    fn test_derived_title() {
        assert_eq!(derive_title(""), UNTITLED);
        assert_eq!(derive_title("   \n\n  "), UNTITLED);
        assert_eq!(derive_title("\n  Buy milk  \nand eggs"), "Buy milk");

        let long = "a".repeat(40);
        let title = derive_title(&long);
        assert_eq!(title.chars().count(), 30);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_explicit_title_limits() {
        assert_eq!(validate_title(""), UNTITLED);
        let title = validate_title(&"x".repeat(200));
        assert_eq!(title.chars().count(), 150);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_content_update_rederives_title() {
        let mut n = note("first");
        n.updated_at = parse_timestamp("2001-01-01 00:00:00").unwrap();
        n.apply(NoteUpdate::Content("Shopping\nmilk".into())).unwrap();
        assert_eq!(n.title, "Shopping");
        assert!(n.updated_at > parse_timestamp("2001-01-01 00:00:00").unwrap());
    }

    #[test]
    fn test_invalid_appearance_is_rejected_untouched() {
        let mut n = note("x");
        let before = n.clone();
        let err = n
            .apply(NoteUpdate::Appearance { color: Some("#12345".into()), font_size: Some(14) })
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(n, before);

        assert!(n.apply(NoteUpdate::Appearance { color: None, font_size: Some(13) }).is_err());
        n.apply(NoteUpdate::Appearance { color: Some("#bbdefb".into()), font_size: Some(18) })
            .unwrap();
        assert_eq!(n.color, "#bbdefb");
        assert_eq!(n.font_size, 18);
    }

    #[test]
    fn test_geometry_is_clamped() {
        let mut n = note("x");
        n.apply(NoteUpdate::Geometry(Geometry { x: -4, y: 2, w: 5, h: 500 })).unwrap();
        assert_eq!(n.geometry(), Geometry { x: -4, y: 2, w: MIN_WIDTH, h: MAX_HEIGHT });

        let g = Geometry::default().resized_by(-100, 3);
        assert_eq!(g.w, MIN_WIDTH);
        assert_eq!(g.h, Geometry::default().h + 3);
    }

    #[test]
    fn test_font_size_steps() {
        assert_eq!(next_font_size(12), Some(14));
        assert_eq!(next_font_size(24), None);
        assert_eq!(prev_font_size(12), Some(10));
        assert_eq!(prev_font_size(8), None);
        assert_eq!(snap_font_size(13), 12);
        assert_eq!(snap_font_size(40), 24);
    }

    #[test]
    fn test_palette_cycle() {
        assert_eq!(next_palette_color("#FFF9C4"), "#C8E6C9");
        assert_eq!(next_palette_color("#dcedc8"), "#FFF9C4");
        assert_eq!(next_palette_color("#000000"), "#FFF9C4");
        assert_eq!(color_name("#bbdefb"), "Blue");
        assert_eq!(color_name("#010203"), "#010203");
    }

    #[test]
    fn test_legacy_record_loads_with_defaults() {
        let raw = r#"{
            "id": "note_1700000000000",
            "content": "hello",
            "font_size": 11,
            "color": "blue",
            "created_at": "2024-03-01 09:15:00",
            "updated_at": "2024-03-02 10:00:00"
        }"#;
        let mut n: Note = serde_json::from_str(raw).unwrap();
        n.normalize();
        assert_eq!(n.title, "hello");
        assert_eq!(n.color, DEFAULT_NOTE_COLOR);
        assert_eq!(n.font_size, 10);
        assert_eq!(n.geometry(), Geometry::default());
        assert_eq!(n.updated_at, parse_timestamp("2024-03-02 10:00:00").unwrap());
    }

    #[test]
    fn test_record_without_id_is_rejected() {
        assert!(serde_json::from_str::<Note>(r#"{"content":"x"}"#).is_err());
    }

    #[test]
    fn test_preview_flattens_whitespace() {
        let n = note("line one\n\n   line two");
        assert_eq!(n.preview(50), "line one line two");
        assert_eq!(n.preview(8), "line ...");
    }
}
