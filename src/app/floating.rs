use ratatui::layout::Rect;

use super::buffer::NoteBuffer;
use crate::store::{Geometry, Note};
use crate::sync::NoteBus;

/// Part of a floating window under the mouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowHit {
    TitleBar,
    ResizeHandle,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    Resize,
}

/// An in-progress mouse drag of a floating window. Geometry is only
/// persisted when the button is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragState {
    pub note_id: String,
    pub kind: DragKind,
    pub origin: (u16, u16),
    pub start: Geometry,
}

impl DragState {
    pub fn geometry_at(&self, column: u16, row: u16) -> Geometry {
        let dx = column as i32 - self.origin.0 as i32;
        let dy = row as i32 - self.origin.1 as i32;
        match self.kind {
            DragKind::Move => self.start.moved_by(dx, dy),
            DragKind::Resize => self.start.resized_by(dx, dy),
        }
    }
}

pub struct FloatingWindow {
    pub buffer: NoteBuffer,
    pub geometry: Geometry,
}

impl FloatingWindow {
    pub fn note_id(&self) -> &str {
        self.buffer.note_id()
    }

    /// On-screen rectangle inside `area`. Windows placed partly off screen are
    /// pulled back so the title bar stays reachable.
    pub fn rect(&self, area: Rect) -> Rect {
        screen_rect(self.geometry, area)
    }

    pub fn hit(&self, area: Rect, column: u16, row: u16) -> Option<WindowHit> {
        let rect = self.rect(area);
        if rect.width == 0
            || rect.height == 0
            || column < rect.x
            || column >= rect.right()
            || row < rect.y
            || row >= rect.bottom()
        {
            return None;
        }
        if column == rect.right() - 1 && row == rect.bottom() - 1 {
            Some(WindowHit::ResizeHandle)
        } else if row == rect.y {
            Some(WindowHit::TitleBar)
        } else {
            Some(WindowHit::Body)
        }
    }
}

pub fn screen_rect(geometry: Geometry, area: Rect) -> Rect {
    if area.width == 0 || area.height == 0 {
        return Rect::default();
    }
    let x = geometry.x.clamp(0, area.width.saturating_sub(1) as i32) as u16;
    let y = geometry.y.clamp(0, area.height.saturating_sub(1) as i32) as u16;
    Rect {
        x: area.x + x,
        y: area.y + y,
        width: geometry.w.min(area.width - x),
        height: geometry.h.min(area.height - y),
    }
}

/// Keeps a window's position inside `area`; an empty area leaves it as is.
pub fn clamp_to_area(geometry: Geometry, area: Rect) -> Geometry {
    if area.width == 0 || area.height == 0 {
        return geometry;
    }
    let max_x = area.width.saturating_sub(geometry.w.min(area.width)) as i32;
    let max_y = area.height.saturating_sub(geometry.h.min(area.height)) as i32;
    Geometry {
        x: geometry.x.clamp(0, max_x),
        y: geometry.y.clamp(0, max_y),
        ..geometry
    }
}

/// Open floating windows in stacking order. The last window is on top and
/// holds keyboard focus while the floating layer is focused.
#[derive(Default)]
pub struct FloatingWindows {
    windows: Vec<FloatingWindow>,
}

impl FloatingWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a window for `note`, or raises the existing one. At most one
    /// window exists per note. Returns `true` when a window was created.
    pub fn open_or_focus(&mut self, bus: &mut NoteBus, note: &Note, tab_width: u16) -> bool {
        if self.raise(&note.id) {
            return false;
        }
        let buffer = NoteBuffer::open(bus, note, tab_width);
        tracing::debug!(note_id = %note.id, "floating window opened");
        self.windows.push(FloatingWindow { buffer, geometry: note.geometry() });
        true
    }

    /// Moves a window to the top of the stack.
    pub fn raise(&mut self, note_id: &str) -> bool {
        let Some(index) = self.position(note_id) else { return false };
        let window = self.windows.remove(index);
        self.windows.push(window);
        true
    }

    /// Removes a window from the stack. The caller flushes the buffer first
    /// if it wants pending edits kept.
    pub fn close(&mut self, bus: &mut NoteBus, note_id: &str) -> bool {
        let Some(index) = self.position(note_id) else { return false };
        let window = self.windows.remove(index);
        window.buffer.close(bus);
        tracing::debug!(note_id, views = bus.subscriber_count(note_id), "floating window closed");
        true
    }

    /// Sends the top window to the bottom, focusing the next one.
    pub fn cycle(&mut self) {
        if let Some(top) = self.windows.pop() {
            self.windows.insert(0, top);
        }
    }

    pub fn get(&self, note_id: &str) -> Option<&FloatingWindow> {
        self.windows.iter().find(|w| w.note_id() == note_id)
    }

    pub fn get_mut(&mut self, note_id: &str) -> Option<&mut FloatingWindow> {
        self.windows.iter_mut().find(|w| w.note_id() == note_id)
    }

    pub fn top(&self) -> Option<&FloatingWindow> {
        self.windows.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut FloatingWindow> {
        self.windows.last_mut()
    }

    pub fn is_open(&self, note_id: &str) -> bool {
        self.position(note_id).is_some()
    }

    /// Bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &FloatingWindow> {
        self.windows.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FloatingWindow> {
        self.windows.iter_mut()
    }

    pub fn note_ids(&self) -> Vec<String> {
        self.windows.iter().map(|w| w.note_id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Topmost window under the given cell.
    pub fn hit_test(&self, area: Rect, column: u16, row: u16) -> Option<(String, WindowHit)> {
        self.windows
            .iter()
            .rev()
            .find_map(|w| w.hit(area, column, row).map(|hit| (w.note_id().to_string(), hit)))
    }

    fn position(&self, note_id: &str) -> Option<usize> {
        self.windows.iter().position(|w| w.note_id() == note_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NoteDraft;

    fn note(id: &str, geometry: Geometry) -> Note {
        let draft = NoteDraft { geometry: Some(geometry), ..NoteDraft::with_content(id) };
        Note::from_draft(id.to_string(), draft).unwrap()
    }

    #[test]
    fn test_open_or_focus_keeps_one_window_per_note() {
        let mut bus = NoteBus::new();
        let mut windows = FloatingWindows::new();
        let a = note("a", Geometry::default());
        let b = note("b", Geometry::default());

        assert!(windows.open_or_focus(&mut bus, &a, 4));
        assert!(windows.open_or_focus(&mut bus, &b, 4));
        assert!(!windows.open_or_focus(&mut bus, &a, 4));
        assert_eq!(windows.len(), 2);
        assert_eq!(windows.top().map(|w| w.note_id()), Some("a"));
        assert_eq!(bus.subscriber_count("a"), 1);
    }

    #[test]
    fn test_close_and_cycle() {
        let mut bus = NoteBus::new();
        let mut windows = FloatingWindows::new();
        for id in ["a", "b", "c"] {
            windows.open_or_focus(&mut bus, &note(id, Geometry::default()), 4);
        }
        windows.cycle();
        assert_eq!(windows.note_ids(), vec!["c", "a", "b"]);

        assert!(windows.close(&mut bus, "a"));
        assert!(!windows.close(&mut bus, "a"));
        assert_eq!(bus.subscriber_count("a"), 0);
        assert_eq!(windows.note_ids(), vec!["c", "b"]);
    }

    #[test]
    fn test_hit_test_prefers_topmost_window() {
        let mut bus = NoteBus::new();
        let mut windows = FloatingWindows::new();
        let area = Rect::new(0, 0, 100, 40);
        windows.open_or_focus(&mut bus, &note("low", Geometry::new(0, 0, 30, 10)), 4);
        windows.open_or_focus(&mut bus, &note("high", Geometry::new(10, 2, 30, 10)), 4);

        assert_eq!(windows.hit_test(area, 12, 2), Some(("high".to_string(), WindowHit::TitleBar)));
        assert_eq!(windows.hit_test(area, 39, 11), Some(("high".to_string(), WindowHit::ResizeHandle)));
        assert_eq!(windows.hit_test(area, 5, 0), Some(("low".to_string(), WindowHit::TitleBar)));
        assert_eq!(windows.hit_test(area, 5, 5), Some(("low".to_string(), WindowHit::Body)));
        assert_eq!(windows.hit_test(area, 80, 30), None);
    }

    #[test]
    fn test_drag_geometry() {
        let start = Geometry::new(10, 5, 40, 12);
        let drag = DragState { note_id: "a".to_string(), kind: DragKind::Move, origin: (20, 5), start };
        assert_eq!(drag.geometry_at(25, 8), Geometry::new(15, 8, 40, 12));

        let resize = DragState { kind: DragKind::Resize, ..drag };
        assert_eq!(resize.geometry_at(0, 0), Geometry::new(10, 5, 20, 7));
        assert_eq!(resize.geometry_at(0, 200).h, 50);
    }

    #[test]
    fn test_screen_rect_stays_on_screen() {
        let area = Rect::new(0, 1, 80, 24);
        let rect = screen_rect(Geometry::new(-5, 100, 42, 16), area);
        assert_eq!(rect, Rect::new(0, 24, 42, 1));
        assert_eq!(clamp_to_area(Geometry::new(70, -3, 42, 16), area), Geometry::new(38, 0, 42, 16));
        assert_eq!(screen_rect(Geometry::default(), Rect::default()), Rect::default());
    }
}
