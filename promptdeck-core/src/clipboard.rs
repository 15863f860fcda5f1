//! Clipboard port. The primary sink is the system clipboard; when it fails
//! the text goes to a fallback sink the user can copy from by hand.

use log::warn;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to write to clipboard: {0}")]
    Write(String),
}

pub trait ClipboardSink {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMethod {
    Clipboard,
    ManualSelection,
}

/// Writes `text` to `primary`, falling back to `fallback` on failure. Only
/// fails when both sinks do; the returned error is the fallback's.
pub fn copy_with_fallback(
    text: &str,
    primary: &mut dyn ClipboardSink,
    fallback: &mut dyn ClipboardSink,
) -> Result<CopyMethod, ClipboardError> {
    match primary.write_text(text) {
        Ok(()) => Ok(CopyMethod::Clipboard),
        Err(e) => {
            warn!("Clipboard write failed, using manual selection: {}", e);
            fallback.write_text(text)?;
            Ok(CopyMethod::ManualSelection)
        }
    }
}

/// Keeps the last written text in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    pub contents: Option<String>,
}

impl ClipboardSink for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) struct FailingClipboard;

#[cfg(test)]
impl ClipboardSink for FailingClipboard {
    fn write_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable("no display".to_string()))
    }
}
