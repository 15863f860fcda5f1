use arboard::Clipboard;
use promptdeck_core::clipboard::{ClipboardError, ClipboardSink};
use std::io::{self, Write};

/// System clipboard through arboard.
pub struct ArboardClipboard {
    clipboard: Clipboard,
}

impl ArboardClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let clipboard = Clipboard::new().map_err(|e| ClipboardError::Unavailable(format!("{}", e)))?;
        Ok(Self { clipboard })
    }
}

impl ClipboardSink for ArboardClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.clipboard.set_text(text).map_err(|e| ClipboardError::Write(format!("{}", e)))
    }
}

/// Stands in for the system clipboard when it could not be opened.
pub struct UnavailableClipboard(pub String);

impl ClipboardSink for UnavailableClipboard {
    fn write_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable(self.0.clone()))
    }
}

/// Manual-selection fallback: prints the text so it can be copied by hand.
pub struct StdoutSink;

impl ClipboardSink for StdoutSink {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", text).map_err(|e| ClipboardError::Write(format!("{}", e)))
    }
}
