use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Focus, Mode, StatusLevel};
use crate::config::Theme;

pub fn render_status_bar(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let mode_indicator = match (app.mode, app.focus) {
        (Mode::Edit, _) => "EDIT",
        (Mode::Normal, Focus::Notes) if app.search.active => "SEARCH",
        (Mode::Normal, Focus::Notes) => "NOTES",
        (Mode::Normal, Focus::Templates) => "TEMPLATES",
        (Mode::Normal, Focus::Preview) => "PREVIEW",
        (Mode::Normal, Focus::Floating) => "WINDOW",
    };

    let logo = Span::styled(
        " ■ Stickies ",
        Style::default()
            .fg(theme.statusbar.background)
            .bg(theme.statusbar.brand)
            .add_modifier(Modifier::BOLD),
    );
    let mode = Span::styled(
        format!(" {mode_indicator} "),
        Style::default().fg(theme.statusbar.background).bg(theme.statusbar.mode),
    );

    let message = match &app.status {
        Some(status) => {
            let color = match status.level {
                StatusLevel::Info => theme.statusbar.foreground,
                StatusLevel::Warning => theme.warning,
                StatusLevel::Error => theme.error,
            };
            Span::styled(format!(" {} ", status.text), Style::default().fg(color))
        }
        None => Span::styled(format!(" {} ", hint(app)), Style::default().fg(theme.muted)),
    };

    let separator = Span::styled(" │ ", Style::default().fg(theme.statusbar.separator));
    let unsaved = if app.has_pending_edits() { "● " } else { "" };
    let counts = Span::styled(
        format!("{unsaved}{} notes · {} windows", app.store.note_count(), app.windows.len()),
        Style::default().fg(theme.statusbar.foreground),
    );
    let help_key = Span::styled(
        " ? help ",
        Style::default().fg(theme.statusbar.background).bg(theme.statusbar.separator),
    );

    let left = vec![logo, Span::raw(" "), mode, message];
    let right = vec![counts, separator, help_key];

    let left_width: usize = left.iter().map(|s| s.content.width()).sum();
    let right_width: usize = right.iter().map(|s| s.content.width()).sum();
    let padding = (area.width as usize).saturating_sub(left_width + right_width);

    let mut spans = left;
    spans.push(Span::raw(" ".repeat(padding)));
    spans.extend(right);

    let status_bar = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(theme.statusbar.background));
    f.render_widget(status_bar, area);
}

fn hint(app: &App) -> &'static str {
    match (app.mode, app.focus) {
        (Mode::Edit, _) => "Esc done · Ctrl+S save",
        (_, Focus::Floating) => "Alt+arrows move · Alt+Shift+arrows resize · Ctrl+W close · Esc dashboard",
        (_, Focus::Templates) => "Enter new from template · r rename · d delete",
        _ if app.search.active => "Enter keep filter · Esc clear",
        _ => "n new · Enter open window · e edit · / search",
    }
}
