use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::SearchState;
use crate::config::{parse_hex_color, Theme};
use crate::store::Note;

const PREVIEW_CHARS: usize = 40;

pub struct NoteListView<'a> {
    pub notes: &'a [&'a Note],
    pub total: usize,
    pub selected: usize,
    pub focused: bool,
}

/// Draws the search box (while searching or filtering) and the note list.
/// Returns the area of the list itself.
pub fn render_sidebar(
    f: &mut Frame,
    theme: &Theme,
    search: &SearchState,
    view: NoteListView<'_>,
    state: &mut ListState,
    area: Rect,
) -> Rect {
    let show_search = search.active || search.is_filtering();

    let (search_area, list_area) = if show_search {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);
        (Some(chunks[0]), chunks[1])
    } else {
        (None, area)
    };

    if let Some(search_area) = search_area {
        let has_query = search.is_filtering();
        let border_color = if has_query && view.notes.is_empty() {
            theme.error
        } else if has_query {
            theme.success
        } else {
            theme.warning
        };

        let mut spans = vec![
            Span::styled("/", Style::default().fg(theme.muted)),
            Span::styled(search.query.as_str(), Style::default().fg(theme.foreground)),
        ];
        if search.active {
            spans.push(Span::styled("_", Style::default().fg(border_color)));
        }

        let search_box = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(" Search "),
        );
        f.render_widget(search_box, search_area);
    }

    let border_color = if view.focused { theme.border_focused } else { theme.border };
    let title = if search.is_filtering() {
        format!(" Notes ({}/{}) ", view.notes.len(), view.total)
    } else {
        format!(" Notes ({}) ", view.total)
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(theme.sidebar.background));

    if view.notes.is_empty() {
        let message = if search.is_filtering() { "No matching notes" } else { "No notes yet, press n" };
        let empty = Paragraph::new(Span::styled(message, Style::default().fg(theme.muted))).block(block);
        f.render_widget(empty, list_area);
        return list_area;
    }

    let items: Vec<ListItem> = view
        .notes
        .iter()
        .enumerate()
        .map(|(idx, note)| {
            let is_selected = idx == view.selected;
            let title_style = if is_selected {
                Style::default()
                    .fg(theme.sidebar.item_selected)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.sidebar.item)
            };

            let snippet = note.preview(PREVIEW_CHARS);
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled("■ ", Style::default().fg(parse_hex_color(&note.color))),
                    Span::styled(note.title.as_str(), title_style),
                ]),
                Line::from(vec![
                    Span::raw("  "),
                    Span::styled(
                        note.updated_at.format("%m-%d %H:%M").to_string(),
                        Style::default().fg(theme.sidebar.meta),
                    ),
                    Span::raw(" "),
                    Span::styled(snippet, Style::default().fg(theme.muted)),
                ]),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(theme.selection));

    state.select(Some(view.selected));
    f.render_stateful_widget(list, list_area, state);
    list_area
}
