use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::store::note::{self, DEFAULT_FONT_SIZE, DEFAULT_NOTE_COLOR};

const BUNDLED_THEME: &str = "stickies-dusk";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_theme_name")]
    pub theme: String,
    /// Quiet period after the last keystroke before a buffer is written.
    #[serde(default = "default_autosave_ms")]
    pub autosave_ms: u64,
    #[serde(default = "default_color")]
    pub default_color: String,
    #[serde(default = "default_font_size")]
    pub default_font_size: u8,
    #[serde(default)]
    pub editor: EditorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_line_numbers")]
    pub line_numbers: bool,
    #[serde(default = "default_tab_width")]
    pub tab_width: u16,
}

fn default_line_numbers() -> bool { true }
fn default_tab_width() -> u16 { 4 }

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            line_numbers: default_line_numbers(),
            tab_width: default_tab_width(),
        }
    }
}

fn default_data_dir() -> String { "~/.local/share/stickies".to_string() }
fn default_theme_name() -> String { BUNDLED_THEME.to_string() }
fn default_autosave_ms() -> u64 { 400 }
fn default_color() -> String { DEFAULT_NOTE_COLOR.to_string() }
fn default_font_size() -> u8 { DEFAULT_FONT_SIZE }

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            theme: default_theme_name(),
            autosave_ms: default_autosave_ms(),
            default_color: default_color(),
            default_font_size: default_font_size(),
            editor: EditorConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Reads a config file, falling back to defaults when it is missing or
    /// unreadable. Out-of-range values are repaired rather than rejected.
    pub fn load_from(path: &Path) -> Self {
        let mut config = if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), "failed to parse config: {e}");
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), "failed to read config: {e}");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        config.sanitize();
        config
    }

    pub fn load_or_create() -> Self {
        let config_dir = Self::config_dir();
        let config_path = Self::config_path();
        let themes_dir = Self::themes_dir();

        if !config_dir.exists() { let _ = fs::create_dir_all(&config_dir); }
        if !themes_dir.exists() { let _ = fs::create_dir_all(&themes_dir); }

        let default_theme_path = themes_dir.join(format!("{BUNDLED_THEME}.toml"));
        if !default_theme_path.exists() {
            let _ = fs::write(&default_theme_path, ThemeFile::BUNDLED);
        }

        if !config_path.exists() {
            if let Err(e) = Self::default().save() {
                tracing::warn!(path = %config_path.display(), "failed to write default config: {e}");
            }
        }
        Self::load()
    }

    pub fn config_path() -> PathBuf { Self::config_dir().join("config.toml") }
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("stickies")
    }
    pub fn themes_dir() -> PathBuf { Self::config_dir().join("themes") }
    pub fn log_path() -> PathBuf { Self::config_dir().join("stickies.log") }

    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, toml_string)
    }

    pub fn data_path(&self) -> PathBuf {
        let path = shellexpand::tilde(&self.data_dir).to_string();
        PathBuf::from(path)
    }

    fn sanitize(&mut self) {
        if !note::is_valid_color(&self.default_color) {
            tracing::warn!(color = %self.default_color, "invalid default_color, using {DEFAULT_NOTE_COLOR}");
            self.default_color = default_color();
        }
        self.default_font_size = note::snap_font_size(self.default_font_size);
        self.editor.tab_width = self.editor.tab_width.clamp(1, 16);
    }
}

// ============================================================================
// Theme File Format (TOML parsing structures)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThemeFile {
    #[serde(default)]
    pub base: BaseColors,
    #[serde(default)]
    pub accent: AccentColors,
    #[serde(default)]
    pub semantic: SemanticColors,
    #[serde(default)]
    pub ui: UiColorsFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseColors {
    #[serde(default = "defaults::background")]
    pub background: String,
    #[serde(default = "defaults::background_secondary")]
    pub background_secondary: String,
    #[serde(default = "defaults::foreground")]
    pub foreground: String,
    #[serde(default = "defaults::muted")]
    pub muted: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccentColors {
    #[serde(default = "defaults::primary")]
    pub primary: String,
    #[serde(default = "defaults::secondary")]
    pub secondary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticColors {
    #[serde(default = "defaults::error")]
    pub error: String,
    #[serde(default = "defaults::warning")]
    pub warning: String,
    #[serde(default = "defaults::success")]
    pub success: String,
    #[serde(default = "defaults::info")]
    pub info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiColorsFile {
    #[serde(default = "defaults::border")]
    pub border: String,
    #[serde(default = "defaults::border_focused")]
    pub border_focused: String,
    #[serde(default = "defaults::selection")]
    pub selection: String,
    #[serde(default = "defaults::cursor")]
    pub cursor: String,
    #[serde(default)]
    pub statusbar: StatusbarColors,
    #[serde(default)]
    pub dialog: DialogColors,
    #[serde(default)]
    pub sidebar: SidebarColors,
    #[serde(default)]
    pub preview: PreviewColors,
    #[serde(default)]
    pub floating: FloatingColors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusbarColors {
    #[serde(default = "defaults::background")]
    pub background: String,
    #[serde(default = "defaults::foreground")]
    pub foreground: String,
    #[serde(default = "defaults::primary")]
    pub brand: String,
    #[serde(default = "defaults::muted")]
    pub mode: String,
    #[serde(default = "defaults::border")]
    pub separator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogColors {
    #[serde(default = "defaults::background")]
    pub background: String,
    #[serde(default = "defaults::primary")]
    pub border: String,
    #[serde(default = "defaults::primary")]
    pub title: String,
    #[serde(default = "defaults::foreground")]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidebarColors {
    #[serde(default = "defaults::background")]
    pub background: String,
    #[serde(default = "defaults::foreground")]
    pub item: String,
    #[serde(default = "defaults::warning")]
    pub item_selected: String,
    #[serde(default = "defaults::info")]
    pub template: String,
    #[serde(default = "defaults::muted")]
    pub meta: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewColors {
    #[serde(default = "defaults::background")]
    pub background: String,
    #[serde(default = "defaults::foreground")]
    pub text: String,
    #[serde(default = "defaults::primary")]
    pub title: String,
    #[serde(default = "defaults::muted")]
    pub meta: String,
}

/// Floating panes take their background from the note color; these are the
/// colors drawn on top of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingColors {
    #[serde(default = "defaults::note_text")]
    pub text: String,
    #[serde(default = "defaults::note_gutter")]
    pub gutter: String,
    #[serde(default = "defaults::note_text")]
    pub title: String,
    #[serde(default = "defaults::note_gutter")]
    pub info: String,
}

mod defaults {
    pub fn background() -> String { "#1e1b26".to_string() }
    pub fn background_secondary() -> String { "#2a2636".to_string() }
    pub fn foreground() -> String { "#e6dfcf".to_string() }
    pub fn muted() -> String { "#7d7590".to_string() }
    pub fn primary() -> String { "#f2c14e".to_string() }
    pub fn secondary() -> String { "#e29578".to_string() }
    pub fn error() -> String { "#ef6f6c".to_string() }
    pub fn warning() -> String { "#f2c14e".to_string() }
    pub fn success() -> String { "#8fc07f".to_string() }
    pub fn info() -> String { "#7fb7be".to_string() }
    pub fn border() -> String { "#4a4458".to_string() }
    pub fn border_focused() -> String { "#f2c14e".to_string() }
    pub fn selection() -> String { "#3b3448".to_string() }
    pub fn cursor() -> String { "#e6dfcf".to_string() }
    pub fn note_text() -> String { "#2b2b2b".to_string() }
    pub fn note_gutter() -> String { "#8a8270".to_string() }
}

impl Default for BaseColors {
    fn default() -> Self {
        Self {
            background: defaults::background(),
            background_secondary: defaults::background_secondary(),
            foreground: defaults::foreground(),
            muted: defaults::muted(),
        }
    }
}

impl Default for AccentColors {
    fn default() -> Self {
        Self { primary: defaults::primary(), secondary: defaults::secondary() }
    }
}

impl Default for SemanticColors {
    fn default() -> Self {
        Self {
            error: defaults::error(),
            warning: defaults::warning(),
            success: defaults::success(),
            info: defaults::info(),
        }
    }
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: defaults::border(),
            border_focused: defaults::border_focused(),
            selection: defaults::selection(),
            cursor: defaults::cursor(),
            statusbar: StatusbarColors::default(),
            dialog: DialogColors::default(),
            sidebar: SidebarColors::default(),
            preview: PreviewColors::default(),
            floating: FloatingColors::default(),
        }
    }
}

impl Default for StatusbarColors {
    fn default() -> Self {
        Self {
            background: defaults::background(),
            foreground: defaults::foreground(),
            brand: defaults::primary(),
            mode: defaults::muted(),
            separator: defaults::border(),
        }
    }
}

impl Default for DialogColors {
    fn default() -> Self {
        Self {
            background: defaults::background(),
            border: defaults::primary(),
            title: defaults::primary(),
            text: defaults::foreground(),
        }
    }
}

impl Default for SidebarColors {
    fn default() -> Self {
        Self {
            background: defaults::background(),
            item: defaults::foreground(),
            item_selected: defaults::warning(),
            template: defaults::info(),
            meta: defaults::muted(),
        }
    }
}

impl Default for PreviewColors {
    fn default() -> Self {
        Self {
            background: defaults::background(),
            text: defaults::foreground(),
            title: defaults::primary(),
            meta: defaults::muted(),
        }
    }
}

impl Default for FloatingColors {
    fn default() -> Self {
        Self {
            text: defaults::note_text(),
            gutter: defaults::note_gutter(),
            title: defaults::note_text(),
            info: defaults::note_gutter(),
        }
    }
}

impl ThemeFile {
    pub const BUNDLED: &'static str = include_str!("../themes/stickies-dusk.toml");

    pub fn load_from_file(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        Self::load_from_str(&content)
    }

    pub fn load_from_str(content: &str) -> Option<Self> {
        match toml::from_str(content) {
            Ok(theme) => Some(theme),
            Err(e) => {
                tracing::warn!("failed to parse theme: {e}");
                None
            }
        }
    }

    fn get_bundled_theme(name: &str) -> Option<Self> {
        let content = match name {
            BUNDLED_THEME => Self::BUNDLED,
            _ => return None,
        };
        Self::load_from_str(content)
    }

    pub fn load_by_name(name: &str) -> Option<Self> {
        let theme_path = Config::themes_dir().join(format!("{}.toml", name));
        if theme_path.exists() {
            if let Some(theme) = Self::load_from_file(&theme_path) {
                return Some(theme);
            }
        }
        Self::get_bundled_theme(name)
    }
}

// ============================================================================
// Runtime Theme (parsed colors for UI rendering)
// ============================================================================

#[derive(Debug, Clone)]
pub struct Theme {
    // Base colors
    pub background: Color,
    pub background_secondary: Color,
    pub foreground: Color,
    pub muted: Color,

    // Accent colors
    pub primary: Color,
    pub secondary: Color,

    // Semantic colors
    pub error: Color,
    pub warning: Color,
    pub success: Color,
    pub info: Color,

    // UI colors
    pub border: Color,
    pub border_focused: Color,
    pub selection: Color,
    pub cursor: Color,

    // Component-specific colors
    pub statusbar: StatusbarTheme,
    pub dialog: DialogTheme,
    pub sidebar: SidebarTheme,
    pub preview: PreviewTheme,
    pub floating: FloatingTheme,
}

#[derive(Debug, Clone)]
pub struct StatusbarTheme {
    pub background: Color,
    pub foreground: Color,
    pub brand: Color,
    pub mode: Color,
    pub separator: Color,
}

#[derive(Debug, Clone)]
pub struct DialogTheme {
    pub background: Color,
    pub border: Color,
    pub title: Color,
    pub text: Color,
}

#[derive(Debug, Clone)]
pub struct SidebarTheme {
    pub background: Color,
    pub item: Color,
    pub item_selected: Color,
    pub template: Color,
    pub meta: Color,
}

#[derive(Debug, Clone)]
pub struct PreviewTheme {
    pub background: Color,
    pub text: Color,
    pub title: Color,
    pub meta: Color,
}

#[derive(Debug, Clone)]
pub struct FloatingTheme {
    pub text: Color,
    pub gutter: Color,
    pub title: Color,
    pub info: Color,
}

impl Theme {
    pub fn from_file(tf: &ThemeFile) -> Self {
        Self {
            background: parse_hex_color(&tf.base.background),
            background_secondary: parse_hex_color(&tf.base.background_secondary),
            foreground: parse_hex_color(&tf.base.foreground),
            muted: parse_hex_color(&tf.base.muted),

            primary: parse_hex_color(&tf.accent.primary),
            secondary: parse_hex_color(&tf.accent.secondary),

            error: parse_hex_color(&tf.semantic.error),
            warning: parse_hex_color(&tf.semantic.warning),
            success: parse_hex_color(&tf.semantic.success),
            info: parse_hex_color(&tf.semantic.info),

            border: parse_hex_color(&tf.ui.border),
            border_focused: parse_hex_color(&tf.ui.border_focused),
            selection: parse_hex_color(&tf.ui.selection),
            cursor: parse_hex_color(&tf.ui.cursor),

            statusbar: StatusbarTheme {
                background: parse_hex_color(&tf.ui.statusbar.background),
                foreground: parse_hex_color(&tf.ui.statusbar.foreground),
                brand: parse_hex_color(&tf.ui.statusbar.brand),
                mode: parse_hex_color(&tf.ui.statusbar.mode),
                separator: parse_hex_color(&tf.ui.statusbar.separator),
            },
            dialog: DialogTheme {
                background: parse_hex_color(&tf.ui.dialog.background),
                border: parse_hex_color(&tf.ui.dialog.border),
                title: parse_hex_color(&tf.ui.dialog.title),
                text: parse_hex_color(&tf.ui.dialog.text),
            },
            sidebar: SidebarTheme {
                background: parse_hex_color(&tf.ui.sidebar.background),
                item: parse_hex_color(&tf.ui.sidebar.item),
                item_selected: parse_hex_color(&tf.ui.sidebar.item_selected),
                template: parse_hex_color(&tf.ui.sidebar.template),
                meta: parse_hex_color(&tf.ui.sidebar.meta),
            },
            preview: PreviewTheme {
                background: parse_hex_color(&tf.ui.preview.background),
                text: parse_hex_color(&tf.ui.preview.text),
                title: parse_hex_color(&tf.ui.preview.title),
                meta: parse_hex_color(&tf.ui.preview.meta),
            },
            floating: FloatingTheme {
                text: parse_hex_color(&tf.ui.floating.text),
                gutter: parse_hex_color(&tf.ui.floating.gutter),
                title: parse_hex_color(&tf.ui.floating.title),
                info: parse_hex_color(&tf.ui.floating.info),
            },
        }
    }

    pub fn from_name(name: &str) -> Self {
        if let Some(theme_file) = ThemeFile::load_by_name(name) {
            return Self::from_file(&theme_file);
        }
        tracing::warn!(theme = name, "theme not found, using defaults");
        Self::from_file(&ThemeFile::default())
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_file(&ThemeFile::default())
    }
}

pub fn parse_hex_color(hex: &str) -> Color {
    let hex = hex.trim_start_matches('#').trim_start_matches('\'').trim_end_matches('\'');
    if hex.len() == 6 {
        if let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&hex[0..2], 16),
            u8::from_str_radix(&hex[2..4], 16),
            u8::from_str_radix(&hex[4..6], 16),
        ) {
            return Color::Rgb(r, g, b);
        }
    }
    Color::White
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str("autosave_ms = 1000\n[editor]\nline_numbers = false\n").unwrap();
        assert_eq!(config.autosave_ms, 1000);
        assert!(!config.editor.line_numbers);
        assert_eq!(config.editor.tab_width, 4);
        assert_eq!(config.default_color, "#FFF9C4");
        assert_eq!(config.theme, "stickies-dusk");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config { data_dir: "/tmp/notes".to_string(), autosave_ms: 250, ..Config::default() };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_invalid_values_are_repaired() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_color = \"yellow\"\ndefault_font_size = 13\n[editor]\ntab_width = 0\n").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.default_color, DEFAULT_NOTE_COLOR);
        assert!(note::FONT_SIZES.contains(&config.default_font_size));
        assert_eq!(config.editor.tab_width, 1);
    }

    #[test]
    fn test_unparseable_config_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is = = not toml").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_data_path_expands_tilde() {
        let config = Config { data_dir: "~/stickies".to_string(), ..Config::default() };
        assert!(!config.data_path().to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_bundled_theme_parses() {
        let theme_file = ThemeFile::load_from_str(ThemeFile::BUNDLED).unwrap();
        let theme = Theme::from_file(&theme_file);
        assert_ne!(theme.background, Color::White);
        assert_eq!(parse_hex_color("#FFF9C4"), Color::Rgb(0xFF, 0xF9, 0xC4));
        assert_eq!(parse_hex_color("nope"), Color::White);
    }
}
