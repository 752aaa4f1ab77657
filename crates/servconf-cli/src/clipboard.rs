//! System clipboard access.

/// Copy `text` to the system clipboard as plain text.
///
/// Returns `false` when no clipboard is available (headless sessions, no
/// display server) or the write is refused. Failures are logged, never
/// raised.
pub fn copy_to_clipboard(text: &str) -> bool {
    let mut clipboard = match arboard::Clipboard::new() {
        Ok(clipboard) => clipboard,
        Err(e) => {
            log::error!("Failed to open clipboard: {}", e);
            return false;
        }
    };

    match clipboard.set_text(text) {
        Ok(()) => true,
        Err(e) => {
            log::error!("Failed to copy text: {}", e);
            false
        }
    }
}
