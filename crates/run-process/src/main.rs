use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use executors::{
    LaunchError, LaunchRequest, Priority, ProcessRunner, RunnerConfig,
    config::{load_config_from_file, save_config_to_file},
};

/// Exit code reported when the child could not be started at all.
const LAUNCH_FAILURE_EXIT_CODE: i32 = 127;

#[derive(Debug, Parser)]
#[command(name = "run-process")]
#[command(about = "Run a program, relay its output and exit with its exit code")]
struct Cli {
    /// Scheduling priority applied once the child has settled
    /// (idle, below_normal, normal, above_normal, high, realtime)
    #[arg(long, short)]
    priority: Option<Priority>,

    /// Milliseconds to wait before changing the child's priority
    #[arg(long)]
    settle_delay_ms: Option<u64>,

    /// JSON file with runner defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective runner settings to this JSON file before running
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Program to run; its directory becomes the working directory
    executable: PathBuf,

    /// Whole argument string for the program, quoted as one word
    #[arg(default_value = "", allow_hyphen_values = true)]
    args: String,
}

impl Cli {
    /// Defaults, then the config file, then environment, then flags.
    fn runner_config(&self) -> anyhow::Result<RunnerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_from_file(path),
            None => RunnerConfig::default(),
        }
        .with_env_overrides();

        if let Some(ms) = self.settle_delay_ms {
            config.settle_delay_ms = ms;
        }
        config.validate().context("invalid runner configuration")?;

        if let Some(path) = &self.save_config {
            save_config_to_file(&config, path)
                .with_context(|| format!("failed to save config to {}", path.display()))?;
        }
        Ok(config)
    }

    fn launch_request(&self) -> LaunchRequest {
        let request = LaunchRequest::new(&self.executable).args(self.args.clone());
        match self.priority {
            Some(priority) => request.priority(priority),
            None => request,
        }
    }
}

fn main() -> anyhow::Result<()> {
    utils::init_tracing("warn");
    let cli = Cli::parse();

    let runner = ProcessRunner::new(cli.runner_config()?);
    let request = cli.launch_request();
    tracing::debug!(?request, config = ?runner.config(), "Starting run-process");

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(runner.run(&request));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err @ (LaunchError::SpawnFailed { .. } | LaunchError::InvalidArguments(_))) => {
            eprintln!("run-process: {err}");
            std::process::exit(LAUNCH_FAILURE_EXIT_CODE)
        }
        Err(err) => Err(err.into()),
    }
}
