use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::{CursorMove, Editor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// The text changed.
    Edited,
    /// Only the cursor moved.
    Moved,
    /// The key means nothing to the editor; the caller may handle it.
    Ignored,
}

/// Applies a key press to the editor. Keys carrying Alt are left to the
/// caller, which uses them for window placement.
pub fn process_key(editor: &mut Editor, key: KeyEvent) -> InputAction {
    if key.modifiers.contains(KeyModifiers::ALT) {
        return InputAction::Ignored;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char(c) if !ctrl => {
            editor.insert_char(c);
            InputAction::Edited
        }
        KeyCode::Enter => {
            editor.insert_newline();
            InputAction::Edited
        }
        KeyCode::Tab => {
            editor.insert_tab();
            InputAction::Edited
        }
        KeyCode::Backspace => edited_if(editor.delete_newline()),
        KeyCode::Delete => edited_if(editor.delete_char()),
        KeyCode::Left if ctrl => moved(editor, CursorMove::WordBack),
        KeyCode::Right if ctrl => moved(editor, CursorMove::WordForward),
        KeyCode::Home if ctrl => moved(editor, CursorMove::Top),
        KeyCode::End if ctrl => moved(editor, CursorMove::Bottom),
        KeyCode::Left => moved(editor, CursorMove::Back),
        KeyCode::Right => moved(editor, CursorMove::Forward),
        KeyCode::Up => moved(editor, CursorMove::Up),
        KeyCode::Down => moved(editor, CursorMove::Down),
        KeyCode::Home => moved(editor, CursorMove::Head),
        KeyCode::End => moved(editor, CursorMove::End),
        KeyCode::PageUp => moved(editor, CursorMove::PageUp),
        KeyCode::PageDown => moved(editor, CursorMove::PageDown),
        _ => InputAction::Ignored,
    }
}

fn moved(editor: &mut Editor, movement: CursorMove) -> InputAction {
    editor.move_cursor(movement);
    InputAction::Moved
}

fn edited_if(changed: bool) -> InputAction {
    if changed {
        InputAction::Edited
    } else {
        InputAction::Moved
    }
}
