//! Output formatting for CLI commands

use std::cell::RefCell;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::storage::{Notification, Notify};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
///
/// Regular output goes to stdout unless the helper was built with
/// [`Output::captured`]; verbose diagnostics always go to stderr.
pub struct Output {
    format: OutputFormat,
    verbose: bool,
    sink: RefCell<Box<dyn Write>>,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self {
            format,
            verbose,
            sink: RefCell::new(Box::new(io::stdout())),
        }
    }

    /// Creates an output helper that writes into an in-memory buffer
    pub fn captured(format: OutputFormat) -> (Self, Captured) {
        let captured = Captured::default();
        let output = Self {
            format,
            verbose: false,
            sink: RefCell::new(Box::new(captured.clone())),
        };
        (output, captured)
    }

    fn emit(&self, text: &str) {
        let mut sink = self.sink.borrow_mut();
        // A closed stdout must not turn a finished command into a failure
        let _ = writeln!(sink, "{}", text);
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => self.emit(message),
            OutputFormat::Json => self.emit(
                &serde_json::json!({
                    "success": true,
                    "message": message
                })
                .to_string(),
            ),
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    self.emit(&json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    self.emit(&json);
                }
            }
        }
    }

    /// Prints a line of text (text only, ignored in JSON mode)
    pub fn line(&self, text: &str) {
        if self.format == OutputFormat::Text {
            self.emit(text);
        }
    }

    /// Prints raw text without adding a newline (text only)
    pub fn raw(&self, text: &str) {
        if self.format == OutputFormat::Text {
            let _ = self.sink.borrow_mut().write_all(text.as_bytes());
        }
    }

    /// Prints a blank line (text only)
    pub fn blank(&self) {
        self.line("");
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints a verbose debug message (only when --verbose is set)
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", message);
        }
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}

/// Prints storage progress events as text lines
pub struct OutputNotifier<'a>(pub &'a Output);

impl Notify for OutputNotifier<'_> {
    fn notify(&self, event: &Notification) {
        self.0
            .line(&format!("{:<12} {}", event.action.label(), event.path.display()));
    }
}

/// In-memory sink shared with an [`Output`]
#[derive(Clone, Default)]
pub struct Captured(std::rc::Rc<RefCell<Vec<u8>>>);

impl Captured {
    /// Everything written so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
