use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use crate::config::{parse_hex_color, Theme};
use crate::store::Template;

/// Template panel. The first nine entries carry their number-key shortcut.
pub fn render_templates(
    f: &mut Frame,
    theme: &Theme,
    templates: &[&Template],
    selected: usize,
    focused: bool,
    state: &mut ListState,
    area: Rect,
) {
    let border_color = if focused { theme.border_focused } else { theme.border };

    let items: Vec<ListItem> = templates
        .iter()
        .enumerate()
        .map(|(idx, template)| {
            let shortcut = if idx < 9 { format!("{} ", idx + 1) } else { "  ".to_string() };
            let name_style = if focused && idx == selected {
                Style::default()
                    .fg(theme.sidebar.item_selected)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.sidebar.template)
            };
            let mut spans = vec![
                Span::styled(shortcut, Style::default().fg(theme.sidebar.meta)),
                Span::styled("■ ", Style::default().fg(parse_hex_color(&template.color))),
                Span::styled(template.name.as_str(), name_style),
            ];
            if !template.is_builtin() {
                spans.push(Span::styled(" (custom)", Style::default().fg(theme.muted)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Templates ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .style(Style::default().bg(theme.sidebar.background)),
        )
        .highlight_style(if focused {
            Style::default().bg(theme.selection)
        } else {
            Style::default()
        });

    state.select((!templates.is_empty()).then_some(selected));
    f.render_stateful_widget(list, area, state);
}
