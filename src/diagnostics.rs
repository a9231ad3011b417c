//! Where the `log`/`debug`/`info`/`warn`/`error` builtins write.
//!
//! Every evaluator owns a [`Diagnostics`] context; nothing here is global.

use std::cell::RefCell;
use std::fmt::Display;
use std::io::{LineWriter, Write};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Log,
    Info,
    Warn,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Debug => "DEBUG",
            Severity::Log => "LOG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

pub trait DiagnosticSink {
    fn emit(&mut self, severity: Severity, line: &str);
}

/// Writes `[SEVERITY] line` to any writer, one line at a time.
pub struct StreamSink<W: Write> {
    writer: LineWriter<W>,
}

impl<W: Write> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: LineWriter::new(writer) }
    }
}

impl StreamSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> DiagnosticSink for StreamSink<W> {
    fn emit(&mut self, severity: Severity, line: &str) {
        if let Err(e) = writeln!(self.writer, "[{severity}] {line}") {
            tracing::warn!(error = %e, "failed to write diagnostic");
        }
    }
}

/// Keeps every emitted line. Clones share the same buffer, so a test can
/// hand one clone to the evaluator and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Rc<RefCell<Vec<(Severity, String)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.borrow().clone()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&mut self, severity: Severity, line: &str) {
        self.lines.borrow_mut().push((severity, line.to_owned()));
    }
}

/// Per-evaluator diagnostics: the sink plus the debug switch.
pub struct Diagnostics {
    sink: Box<dyn DiagnosticSink>,
    debug: bool,
}

impl Diagnostics {
    pub fn new(sink: Box<dyn DiagnosticSink>, debug: bool) -> Self {
        Self { sink, debug }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn into_sink(self) -> Box<dyn DiagnosticSink> {
        self.sink
    }

    pub fn emit(&mut self, severity: Severity, line: &str) {
        if severity == Severity::Debug && !self.debug {
            return;
        }
        self.sink.emit(severity, line);
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics").field("debug", &self.debug).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_sink_prefixes_severity() {
        let mut buffer = Vec::new();
        {
            let mut sink = StreamSink::new(&mut buffer);
            sink.emit(Severity::Warn, "slow page");
            sink.emit(Severity::Log, "a b");
        }
        assert_eq!(String::from_utf8(buffer).unwrap(), "[WARN] slow page\n[LOG] a b\n");
    }

    #[test]
    fn debug_lines_need_debug_mode() {
        let sink = MemorySink::new();
        let mut quiet = Diagnostics::new(Box::new(sink.clone()), false);
        quiet.emit(Severity::Debug, "hidden");
        quiet.emit(Severity::Info, "shown");
        assert_eq!(sink.lines(), vec![(Severity::Info, "shown".to_owned())]);

        let sink = MemorySink::new();
        let mut verbose = Diagnostics::new(Box::new(sink.clone()), true);
        verbose.emit(Severity::Debug, "visible");
        assert_eq!(sink.lines(), vec![(Severity::Debug, "visible".to_owned())]);
    }
}
