use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::config::Theme;

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

pub fn render_delete_confirm_dialog(f: &mut Frame, app: &App, theme: &Theme) {
    let dialog_area = centered(f.area(), 50, 9);
    f.render_widget(Clear, dialog_area);

    let note_name = app.current_note().map(|n| n.title.as_str()).unwrap_or("this note");
    let window_note = app
        .selected_note_id()
        .is_some_and(|id| app.windows.is_open(id))
        .then_some("Its window will close.")
        .unwrap_or("");

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Delete note?",
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(note_name, Style::default().fg(theme.foreground))),
        Line::from(Span::styled(window_note, Style::default().fg(theme.muted))),
        Line::from(Span::styled(
            "y: Yes  |  n: No",
            Style::default().fg(theme.foreground).add_modifier(Modifier::ITALIC),
        )),
    ];

    let dialog = Paragraph::new(content)
        .block(
            Block::default()
                .title(" Confirm Delete ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.error))
                .style(Style::default().bg(theme.dialog.background)),
        )
        .alignment(Alignment::Center);
    f.render_widget(dialog, dialog_area);
}

pub fn render_delete_template_dialog(f: &mut Frame, app: &App, theme: &Theme) {
    let dialog_area = centered(f.area(), 50, 8);
    f.render_widget(Clear, dialog_area);

    let name = app
        .selected_template_id()
        .and_then(|id| app.store.template(&id).map(|t| t.name.clone()))
        .unwrap_or_default();

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Delete template?",
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(name, Style::default().fg(theme.foreground))),
        Line::from(""),
        Line::from(Span::styled(
            "y: Yes  |  n: No",
            Style::default().fg(theme.foreground).add_modifier(Modifier::ITALIC),
        )),
    ];

    let dialog = Paragraph::new(content)
        .block(
            Block::default()
                .title(" Confirm Delete ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.error))
                .style(Style::default().bg(theme.dialog.background)),
        )
        .alignment(Alignment::Center);
    f.render_widget(dialog, dialog_area);
}

/// One-line text prompt used for template names and note titles.
pub fn render_name_dialog(f: &mut Frame, app: &App, theme: &Theme, title: &str, label: &str, action: &str) {
    let dialog_area = centered(f.area(), 50, 9);
    f.render_widget(Clear, dialog_area);

    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled(label, Style::default().fg(theme.dialog.text))),
        Line::from(""),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(theme.primary)),
            Span::styled(app.input_buffer.as_str(), Style::default().fg(theme.foreground)),
            Span::styled("█", Style::default().fg(theme.primary)),
        ]),
    ];
    match &app.dialog_error {
        Some(error) => content.push(Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(theme.error),
        ))),
        None => content.push(Line::from("")),
    }
    content.push(Line::from(Span::styled(
        format!("Enter: {action}  |  Esc: Cancel"),
        Style::default().fg(theme.foreground).add_modifier(Modifier::ITALIC),
    )));

    let dialog = Paragraph::new(content)
        .block(
            Block::default()
                .title(Span::styled(format!(" {title} "), Style::default().fg(theme.dialog.title)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.dialog.border))
                .style(Style::default().bg(theme.dialog.background)),
        )
        .alignment(Alignment::Center);
    f.render_widget(dialog, dialog_area);
}

const HELP: &[(&str, &[(&str, &str)])] = &[
    (
        "Dashboard",
        &[
            ("j/k", "Move through notes or templates"),
            ("g/G", "First / last note"),
            ("Tab", "Switch focus (Notes/Templates/Preview/Windows)"),
            ("/", "Search notes"),
            ("Esc", "Clear search"),
            ("R", "Reload from disk"),
            ("q", "Quit"),
        ],
    ),
    (
        "Notes",
        &[
            ("n", "New note"),
            ("1-9", "New note from template"),
            ("Enter", "Open in a floating window"),
            ("e", "Edit in the preview"),
            ("r", "Edit title"),
            ("d", "Delete note"),
            ("c", "Next color"),
            ("+/-", "Font size up / down"),
            ("y", "Copy to clipboard"),
            ("t", "Save as template"),
        ],
    ),
    (
        "Templates",
        &[
            ("Enter", "New note from template"),
            ("r", "Rename custom template"),
            ("d", "Delete custom template"),
        ],
    ),
    (
        "Floating windows",
        &[
            ("Alt+arrows", "Move"),
            ("Alt+Shift+arrows", "Resize"),
            ("Ctrl+R", "Edit title"),
            ("Ctrl+L", "Next color"),
            ("Ctrl+Up/Down", "Font size up / down"),
            ("Ctrl+Y", "Copy to clipboard"),
            ("Ctrl+S", "Save now"),
            ("Ctrl+W", "Close window"),
            ("F6", "Next window"),
            ("Esc", "Back to dashboard"),
            ("Mouse", "Drag title to move, corner to resize"),
        ],
    ),
];

pub fn render_help_dialog(f: &mut Frame, app: &App, theme: &Theme) {
    let dialog_area = centered(f.area(), 60, 40);
    f.render_widget(Clear, dialog_area);

    let key_style = Style::default().fg(theme.primary);
    let desc_style = Style::default().fg(theme.dialog.text);
    let header_style = Style::default().fg(theme.secondary).add_modifier(Modifier::BOLD);

    let mut content = vec![Line::from("")];
    for (section, keys) in HELP {
        content.push(Line::from(Span::styled(format!("  {section}"), header_style)));
        for (key, desc) in keys.iter() {
            content.push(Line::from(vec![
                Span::styled(format!("  {key:<18}"), key_style),
                Span::styled(*desc, desc_style),
            ]));
        }
        content.push(Line::from(""));
    }
    content.push(Line::from(Span::styled(
        "  Esc or ? to close, j/k to scroll",
        Style::default().fg(theme.muted).add_modifier(Modifier::ITALIC),
    )));

    let dialog = Paragraph::new(content)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.dialog.border))
                .style(Style::default().bg(theme.dialog.background)),
        )
        .scroll((app.help_scroll, 0));
    f.render_widget(dialog, dialog_area);
}
