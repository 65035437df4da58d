use arboard::Clipboard;
use tracing::debug;

use crate::errors::{Result, VaultError};
use crate::storage::models::VaultItem;

fn open() -> Result<Clipboard> {
    Clipboard::new().map_err(|e| VaultError::Clipboard(e.to_string()))
}

pub fn write_text_to_clipboard(text: &str) -> Result<()> {
    let mut cb = open()?;
    cb.set_text(text).map_err(|e| VaultError::Clipboard(e.to_string()))
}

/// Current clipboard text, if any. Used to prefill new items.
pub fn read_text_from_clipboard() -> Result<Option<String>> {
    let mut cb = open()?;
    Ok(cb.get_text().ok().filter(|text| !text.trim().is_empty()))
}

/// Copies the part of `item` worth pasting: a link's URL, otherwise the body.
pub fn copy_item(item: &VaultItem) -> Result<()> {
    let text = item.copy_text();
    if text.is_empty() {
        return Err(VaultError::InvalidInput(format!(
            "{} \"{}\" has nothing to copy",
            item.kind(),
            item.title()
        )));
    }
    write_text_to_clipboard(text)?;
    debug!(id = %item.id(), kind = %item.kind(), "copied to clipboard");
    Ok(())
}
