use std::{io, path::PathBuf};

use thiserror::Error;
use utils::log_msg::OutputStream;

use crate::priority::Priority;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to spawn {command} in {working_dir}: {source}")]
    SpawnFailed {
        executable: PathBuf,
        command: String,
        working_dir: String,
        #[source]
        source: io::Error,
    },
    #[error("Invalid argument string: {0}")]
    InvalidArguments(#[from] utils::shell::SplitError),
    #[error("Failed to change process priority: {0}")]
    PriorityChangeFailed(#[from] PriorityError),
    #[error("Failed to read child {stream}: {source}")]
    StreamRead {
        stream: OutputStream,
        #[source]
        source: io::Error,
    },
    #[error("Failed to wait for child exit: {0}")]
    WaitFailed(#[source] io::Error),
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),
}

impl LaunchError {
    /// Whether the call had to give up before it could learn an exit code.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            LaunchError::PriorityChangeFailed(_) | LaunchError::StreamRead { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum PriorityError {
    #[error("process exited before its priority could be changed")]
    ProcessAlreadyExited,
    #[error("not permitted to set priority {priority}: {source}")]
    PermissionDenied {
        priority: Priority,
        #[source]
        source: io::Error,
    },
    #[error("priority classes are not supported on this platform")]
    Unsupported,
    #[error("failed to set priority {priority}: {source}")]
    Os {
        priority: Priority,
        #[source]
        source: io::Error,
    },
}
