//! Launch a child, relay its output line by line, nudge its priority and
//! report how it exited.

use std::{
    path::{Path, PathBuf},
    process::ExitStatus,
    sync::Arc,
};

use futures::StreamExt;
use tokio::{
    io::{AsyncRead, BufReader},
    task::JoinHandle,
};
use utils::{
    log_msg::OutputStream,
    sink::{LineSink, StdStreamSink},
    stream_ext::lossy_lines,
};

use crate::{
    command_builder::CommandBuilder,
    config::RunnerConfig,
    errors::{LaunchError, PriorityError},
    priority::Priority,
};

/// What to launch. The priority falls back to the runner's configured
/// default when left unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub executable: PathBuf,
    pub args: String,
    pub priority: Option<Priority>,
}

impl LaunchRequest {
    pub fn new(executable: impl AsRef<Path>) -> Self {
        Self {
            executable: executable.as_ref().to_path_buf(),
            args: String::new(),
            priority: None,
        }
    }

    pub fn args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

pub struct ProcessRunner {
    config: RunnerConfig,
    stdout: Arc<dyn LineSink>,
    stderr: Arc<dyn LineSink>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

impl ProcessRunner {
    /// A runner relaying child output to this process's stdout and stderr.
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            stdout: Arc::new(StdStreamSink::stdout()),
            stderr: Arc::new(StdStreamSink::stderr()),
        }
    }

    pub fn with_sinks(
        mut self,
        stdout: impl LineSink + 'static,
        stderr: impl LineSink + 'static,
    ) -> Self {
        self.stdout = Arc::new(stdout);
        self.stderr = Arc::new(stderr);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run the child to completion and return its exit code.
    ///
    /// Only a failed spawn (or an unusable argument string) and a failed
    /// wait are returned as errors. Priority and stream problems are logged
    /// and the real exit code is still reported.
    pub async fn run(&self, request: &LaunchRequest) -> Result<i32, LaunchError> {
        let priority = request.priority.unwrap_or(self.config.default_priority);

        let mut child = CommandBuilder::for_executable(&request.executable)?
            .arg_string(&request.args)?
            .runner_type("ProcessRunner")
            .with_context(format!("requested priority {priority}"))
            .spawn()?;
        let pid = child.id();
        tracing::debug!(
            pid,
            executable = %request.executable.display(),
            %priority,
            "Spawned child process"
        );

        let relays = [
            child
                .inner()
                .stdout
                .take()
                .map(|out| spawn_line_relay(out, OutputStream::Stdout, self.stdout.clone())),
            child
                .inner()
                .stderr
                .take()
                .map(|err| spawn_line_relay(err, OutputStream::Stderr, self.stderr.clone())),
        ];

        // Workaround: priority changes applied right after creation did not
        // always stick, so the child is left alone for a while first. A child
        // that exits during the delay ends it early.
        //
        // Waits go through `inner()`: only the launched process counts, not
        // whatever it leaves running in its group or job.
        let exited_early = tokio::select! {
            _ = tokio::time::sleep(self.config.settle_delay()) => None,
            status = child.inner().wait() => Some(status),
        };

        let priority_outcome = match exited_early {
            Some(_) => Err(PriorityError::ProcessAlreadyExited),
            None => priority.apply_to(&mut child),
        };
        match priority_outcome {
            Ok(()) => tracing::debug!(pid, %priority, "Applied process priority"),
            Err(err) => log_priority_failure(pid, priority, err),
        }

        let status = match exited_early {
            Some(status) => status,
            None => child.inner().wait().await,
        }
        .map_err(LaunchError::WaitFailed)?;

        // Lines written just before exit may still be in flight.
        for relay in relays.into_iter().flatten() {
            if let Err(e) = relay.await {
                tracing::warn!(pid, "Output relay task failed: {e}");
            }
        }

        let code = exit_code(status);
        tracing::debug!(pid, exit_code = code, "Child process exited");
        Ok(code)
    }

    /// [`ProcessRunner::run`] for synchronous callers.
    pub fn run_blocking(&self, request: &LaunchRequest) -> Result<i32, LaunchError> {
        utils::tokio::block_on(self.run(request)).map_err(LaunchError::Runtime)?
    }
}

fn log_priority_failure(pid: Option<u32>, priority: Priority, err: PriorityError) {
    let err = LaunchError::from(err);
    match &err {
        LaunchError::PriorityChangeFailed(PriorityError::ProcessAlreadyExited) => {
            tracing::debug!(pid, %priority, "{err}")
        }
        _ => tracing::warn!(pid, %priority, "{err}"),
    }
}

/// Forward every line of `reader` to `sink` until end of stream.
///
/// A failing sink does not stop the relay: the pipe keeps being drained so
/// the child never blocks on a full pipe. A failing read does.
fn spawn_line_relay<R>(reader: R, stream: OutputStream, sink: Arc<dyn LineSink>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let lines = lossy_lines(BufReader::new(reader));
        tokio::pin!(lines);

        while let Some(next) = lines.next().await {
            match next {
                Ok(line) => {
                    if let Err(e) = sink.write_line(&line) {
                        tracing::debug!(%stream, "Dropping child line, sink failed: {e}");
                    }
                }
                Err(source) => {
                    let err = LaunchError::StreamRead { stream, source };
                    tracing::warn!("{err}");
                    break;
                }
            }
        }
    })
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    if let Some(code) = status.code() {
        return code;
    }
    match status.signal() {
        Some(signal) => {
            let name = nix::sys::signal::Signal::try_from(signal)
                .map(|s| s.as_str())
                .unwrap_or("unknown signal");
            tracing::debug!(signal, name, "Child process terminated by signal");
            128 + signal
        }
        None => -1,
    }
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
