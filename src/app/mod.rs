mod buffer;
mod floating;
mod state;

pub use buffer::NoteBuffer;
pub use floating::{DragKind, FloatingWindow, FloatingWindows, WindowHit};
pub use state::{App, DialogState, Focus, Mode, SearchState, StatusLevel};
