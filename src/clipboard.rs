//! System clipboard access.

/// Places `text` on the system clipboard.
pub fn copy_text(text: &str) -> Result<(), arboard::Error> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text)
}

/// Reads plain text from the system clipboard. `None` if the clipboard is
/// empty, holds non-text data, or is unavailable.
pub fn paste_text() -> Option<String> {
    let mut clipboard = arboard::Clipboard::new().ok()?;
    clipboard.get_text().ok().filter(|text| !text.is_empty())
}
