//! Direct (shell-less) command building and spawning

use std::{
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
    process::Stdio,
};

use command_group::{AsyncCommandGroup, AsyncGroupChild};
use tokio::process::Command;
use utils::shell::display_command;

use crate::errors::LaunchError;

/// Program path and working directory for launching `executable`.
///
/// The working directory is the executable's parent. A bare program name
/// has no parent, so it keeps the caller's working directory and is looked
/// up the usual way. Anything with a directory component is made absolute
/// first: once the working directory changes, a relative path would name a
/// different file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPaths {
    pub program: PathBuf,
    pub working_dir: Option<PathBuf>,
}

impl LaunchPaths {
    pub fn resolve(executable: &Path) -> io::Result<Self> {
        let has_parent = executable
            .parent()
            .is_some_and(|parent| !parent.as_os_str().is_empty());
        if !has_parent {
            return Ok(Self {
                program: executable.to_path_buf(),
                working_dir: None,
            });
        }

        let program = std::path::absolute(executable)?;
        let working_dir = program.parent().map(Path::to_path_buf);
        Ok(Self {
            program,
            working_dir,
        })
    }
}

/// Builder for creating and spawning a child with captured output
pub struct CommandBuilder {
    command: Command,
    program: PathBuf,
    display_args: Vec<String>,
    working_dir: Option<PathBuf>,
    runner_type: String,
    additional_context: Option<String>,
}

impl CommandBuilder {
    /// Create a new command builder for a given program
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        let program = program.as_ref().to_path_buf();
        let mut command = Command::new(&program);
        // Set default options
        command
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        Self {
            command,
            program,
            display_args: Vec::new(),
            working_dir: None,
            runner_type: "Unknown".to_string(),
            additional_context: None,
        }
    }

    /// Builder for `executable`, running in the executable's own directory
    pub fn for_executable(executable: &Path) -> Result<Self, LaunchError> {
        let paths = LaunchPaths::resolve(executable).map_err(|source| LaunchError::SpawnFailed {
            executable: executable.to_path_buf(),
            command: executable.display().to_string(),
            working_dir: "<unresolved>".to_string(),
            source,
        })?;

        let builder = Self::new(&paths.program);
        Ok(match paths.working_dir {
            Some(dir) => builder.current_dir(dir),
            None => builder,
        })
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.display_args
            .push(arg.as_ref().to_string_lossy().into_owned());
        self.command.arg(arg);
        self
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        args.into_iter().fold(self, |builder, arg| builder.arg(arg))
    }

    /// Pass a whole argument string.
    ///
    /// Windows receives the string untouched as the command-line tail.
    /// Elsewhere it is split into words without any expansion; an empty
    /// string adds nothing.
    pub fn arg_string(self, blob: &str) -> Result<Self, LaunchError> {
        if blob.is_empty() {
            return Ok(self);
        }

        #[cfg(windows)]
        {
            let mut builder = self;
            builder.display_args.push(blob.to_string());
            builder.command.raw_arg(blob);
            Ok(builder)
        }

        #[cfg(not(windows))]
        {
            let words = utils::shell::split_command_line(blob)?;
            Ok(self.args(words))
        }
    }

    /// Set the working directory
    pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self.command.current_dir(dir);
        self
    }

    /// Set the runner type for error context
    pub fn runner_type(mut self, runner_type: impl Into<String>) -> Self {
        self.runner_type = runner_type.into();
        self
    }

    /// Add additional context for error reporting
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }

    /// The command line as it would be shown in logs
    pub fn display(&self) -> String {
        display_command(&self.program.to_string_lossy(), &self.display_args)
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Spawn the command as the leader of a new process group
    pub fn spawn(mut self) -> Result<AsyncGroupChild, LaunchError> {
        #[cfg(windows)]
        let spawned = {
            use windows_sys::Win32::System::Threading::CREATE_NO_WINDOW;
            self.command.group().creation_flags(CREATE_NO_WINDOW).spawn()
        };
        #[cfg(not(windows))]
        let spawned = self.command.group_spawn();

        spawned.map_err(|source| {
            let mut command = format!("{} process: command '{}'", self.runner_type, self.display());
            if let Some(additional) = &self.additional_context {
                command.push_str(&format!(" ({additional})"));
            }
            let working_dir = match &self.working_dir {
                Some(dir) => format!("directory '{}'", dir.display()),
                None => "the current directory".to_string(),
            };
            LaunchError::SpawnFailed {
                executable: self.program.clone(),
                command,
                working_dir,
                source,
            }
        })
    }

    /// Get a reference to the underlying command (for advanced use cases)
    pub fn as_command(&self) -> &Command {
        &self.command
    }
}
