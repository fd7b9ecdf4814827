//! Destinations for relayed child output lines.

use std::{
    io::{self, Write},
    sync::Arc,
};

use crate::log_msg::OutputStream;

/// A thread-safe destination that receives one child line per call.
///
/// Implementations must write each line atomically with respect to other
/// writers of the same sink: the stdout and stderr consumers run on
/// separate tasks and may call into sinks concurrently.
pub trait LineSink: Send + Sync {
    fn write_line(&self, line: &str) -> io::Result<()>;
}

impl<T: LineSink + ?Sized> LineSink for Arc<T> {
    fn write_line(&self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }
}

/// Relays lines to this process's own stdout or stderr.
#[derive(Clone, Copy, Debug)]
pub struct StdStreamSink {
    stream: OutputStream,
}

impl StdStreamSink {
    pub fn new(stream: OutputStream) -> Self {
        Self { stream }
    }

    pub fn stdout() -> Self {
        Self::new(OutputStream::Stdout)
    }

    pub fn stderr() -> Self {
        Self::new(OutputStream::Stderr)
    }
}

impl LineSink for StdStreamSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        // Holding the lock for the whole line keeps it from being split by
        // other writers in this process.
        match self.stream {
            OutputStream::Stdout => {
                let mut out = io::stdout().lock();
                writeln!(out, "{line}")?;
                out.flush()
            }
            OutputStream::Stderr => {
                let mut err = io::stderr().lock();
                writeln!(err, "{line}")?;
                err.flush()
            }
        }
    }
}
