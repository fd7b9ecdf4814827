use std::{
    collections::VecDeque,
    io,
    sync::{Arc, PoisonError, RwLock},
};

use crate::{
    log_msg::{LogMsg, OutputStream},
    sink::LineSink,
};

// 16 MB Limit
const HISTORY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
struct StoredMsg {
    msg: LogMsg,
    bytes: usize,
}

struct Inner {
    history: VecDeque<StoredMsg>,
    total_bytes: usize,
}

/// In-memory, byte-budgeted record of relayed lines from both streams, in
/// arrival order.
///
/// Hand out [`StoreSink`]s via [`MsgStore::sink`] to capture a child's
/// output instead of (or in addition to) printing it.
pub struct MsgStore {
    inner: RwLock<Inner>,
    history_limit: usize,
}

impl Default for MsgStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MsgStore {
    pub fn new() -> Self {
        Self::with_history_limit(HISTORY_BYTES)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                history: VecDeque::with_capacity(32),
                total_bytes: 0,
            }),
            history_limit,
        }
    }

    pub fn push(&self, msg: LogMsg) {
        let bytes = msg.approx_bytes();

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        while inner.total_bytes.saturating_add(bytes) > self.history_limit {
            if let Some(front) = inner.history.pop_front() {
                inner.total_bytes = inner.total_bytes.saturating_sub(front.bytes);
            } else {
                break;
            }
        }
        inner.history.push_back(StoredMsg { msg, bytes });
        inner.total_bytes = inner.total_bytes.saturating_add(bytes);
    }

    /// Lines of one stream, in the order they arrived.
    pub fn lines(&self, stream: OutputStream) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .iter()
            .filter(|s| s.msg.stream() == stream)
            .map(|s| s.msg.line().to_string())
            .collect()
    }

    pub fn stdout_lines(&self) -> Vec<String> {
        self.lines(OutputStream::Stdout)
    }

    pub fn stderr_lines(&self) -> Vec<String> {
        self.lines(OutputStream::Stderr)
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .is_empty()
    }

    /// A sink that records every line it receives as coming from `stream`.
    pub fn sink(self: &Arc<Self>, stream: OutputStream) -> StoreSink {
        StoreSink {
            store: Arc::clone(self),
            stream,
        }
    }
}

#[derive(Clone)]
pub struct StoreSink {
    store: Arc<MsgStore>,
    stream: OutputStream,
}

impl LineSink for StoreSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.store.push(LogMsg::new(self.stream, line));
        Ok(())
    }
}
