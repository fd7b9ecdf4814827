use std::fmt;

use serde::{Deserialize, Serialize};

const EV_STDOUT: &str = "stdout";
const EV_STDERR: &str = "stderr";

/// Which captured pipe of the child a line came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn name(&self) -> &'static str {
        match self {
            OutputStream::Stdout => EV_STDOUT,
            OutputStream::Stderr => EV_STDERR,
        }
    }
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogMsg {
    Stdout(String),
    Stderr(String),
}

impl LogMsg {
    pub fn new(stream: OutputStream, line: impl Into<String>) -> Self {
        match stream {
            OutputStream::Stdout => LogMsg::Stdout(line.into()),
            OutputStream::Stderr => LogMsg::Stderr(line.into()),
        }
    }

    pub fn stream(&self) -> OutputStream {
        match self {
            LogMsg::Stdout(_) => OutputStream::Stdout,
            LogMsg::Stderr(_) => OutputStream::Stderr,
        }
    }

    pub fn line(&self) -> &str {
        match self {
            LogMsg::Stdout(s) | LogMsg::Stderr(s) => s,
        }
    }

    /// Rough size accounting for the byte-budgeted history.
    pub fn approx_bytes(&self) -> usize {
        const OVERHEAD: usize = 8;
        self.stream().name().len() + self.line().len() + OVERHEAD
    }
}
