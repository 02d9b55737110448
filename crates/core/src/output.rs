//! Line-oriented output buffer shared between a running script and its
//! controller.

use std::io::{self, Write};
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, line: impl Into<String>) {
        self.lines.lock().push(line.into());
    }

    /// Takes every line appended since the previous drain, oldest first.
    pub fn drain(&self) -> Vec<String> {
        mem::take(&mut *self.lines.lock())
    }

    pub fn reset(&self) {
        self.lines.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// A writer that appends each complete line it receives.
    pub fn writer(&self) -> OutputWriter {
        OutputWriter {
            sink: self.clone(),
            pending: Vec::new(),
        }
    }
}

/// Byte stream adapter over an [`OutputSink`].
///
/// Input is split on `\n`, a trailing `\r` is dropped and invalid UTF-8 is
/// replaced. A partial last line is appended on flush or drop.
#[derive(Debug)]
pub struct OutputWriter {
    sink: OutputSink,
    pending: Vec<u8>,
}

impl OutputWriter {
    /// Appends a partial last line, if any.
    pub fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            let line = mem::take(&mut self.pending);
            self.push_line(&line);
        }
    }

    /// Drops a partial last line without appending it.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    fn push_line(&self, bytes: &[u8]) {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        self.sink.append(String::from_utf8_lossy(bytes).into_owned());
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);

        while let Some(position) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=position).collect();
            self.push_line(&line[..position]);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_pending();
        Ok(())
    }
}

impl Drop for OutputWriter {
    fn drop(&mut self) {
        self.flush_pending();
    }
}
