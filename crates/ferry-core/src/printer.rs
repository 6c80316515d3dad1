//! Line-oriented progress output.
//!
//! Progress lines are for the user only; write failures are ignored and
//! nothing downstream branches on what was printed.

use std::io::Write;
use std::sync::{Arc, Mutex};

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Writes progress lines, optionally indented by a section gap.
#[derive(Clone)]
pub struct Printer {
    sink: Option<Sink>,
    gap: String,
}

impl Printer {
    /// Print to the given writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Printer {
            sink: Some(Arc::new(Mutex::new(Box::new(writer)))),
            gap: String::new(),
        }
    }

    /// Print to standard output.
    pub fn stdout() -> Self {
        Printer::new(std::io::stdout())
    }

    /// Discard everything.
    pub fn null() -> Self {
        Printer {
            sink: None,
            gap: String::new(),
        }
    }

    /// Print into a shared in-memory buffer.
    pub fn buffer() -> (Self, SharedBuffer) {
        let buf = SharedBuffer::default();
        (Printer::new(buf.clone()), buf)
    }

    /// Print one message; every line is prefixed with the section gap.
    pub fn println(&self, msg: impl AsRef<str>) {
        let Some(sink) = &self.sink else {
            return;
        };
        let mut out = sink.lock().unwrap_or_else(|e| e.into_inner());
        for line in msg.as_ref().lines() {
            let _ = writeln!(out, "{}{}", self.gap, line);
        }
    }

    /// A printer for a nested section, indented by `gap` more.
    pub fn section(&self, gap: &str) -> Printer {
        Printer {
            sink: self.sink.clone(),
            gap: format!("{}{}", self.gap, gap),
        }
    }
}

impl Default for Printer {
    fn default() -> Self {
        Printer::null()
    }
}

/// Thread-safe byte buffer used as a printer target.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far.
    pub fn contents(&self) -> String {
        let data = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&data).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_indent() {
        let (printer, buf) = Printer::buffer();
        printer.println("top");
        let nested = printer.section("  ");
        nested.println("child\nsecond");
        nested.section("  ").println("grandchild");
        assert_eq!(buf.contents(), "top\n  child\n  second\n    grandchild\n");
    }

    #[test]
    fn null_printer_is_silent() {
        Printer::null().section("  ").println("ignored");
    }
}
