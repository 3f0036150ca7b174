//! Worker supervisor.
//!
//! Launches the worker jar, relaunches it when it asks for a restart or
//! crashes, downloads a new jar from Jenkins when it asks for an update, and
//! exits when it asks for a shutdown or keeps crashing.

use std::path::PathBuf;

use anyhow::Result;
use bootstrap::core::breaker::CrashLoopBreaker;
use bootstrap::exit_codes;
use bootstrap::io::clock::SystemClock;
use bootstrap::io::config::{DEFAULT_CONFIG_PATH, Overrides, apply_overrides, load_config};
use bootstrap::io::jenkins::JenkinsUpdater;
use bootstrap::io::process::ProcessLauncher;
use bootstrap::logging;
use bootstrap::supervisor::Supervisor;
use clap::Parser;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(
    name = "bootstrap",
    version,
    about = "Supervise a self-updating worker process"
)]
struct Cli {
    /// JVM arguments for the worker. Use `;` to delimit several, or repeat the flag.
    #[arg(
        short = 'j',
        long = "jvm-args",
        value_delimiter = ';',
        allow_hyphen_values = true
    )]
    jvm_args: Vec<String>,

    /// Maximum heap size for the worker (see `java -Xmx`).
    #[arg(short = 'x', long = "heap")]
    heap: Option<String>,

    /// Initial heap size for the worker (see `java -Xms`).
    #[arg(short = 's', long = "initial-heap")]
    initial_heap: Option<String>,

    /// Jenkins root URL.
    #[arg(long)]
    jenkins_url: Option<String>,

    /// Jenkins job path relative to the root URL.
    #[arg(long)]
    jenkins_project: Option<String>,

    /// Location of the worker jar.
    #[arg(long)]
    jar: Option<PathBuf>,

    /// Java binary used to start the worker.
    #[arg(long)]
    java: Option<PathBuf>,

    /// Config file; missing file means defaults.
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Arguments passed to the worker.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    arguments: Vec<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            java: self.java.clone(),
            jar: self.jar.clone(),
            jvm_args: self.jvm_args.clone(),
            heap: self.heap.clone(),
            initial_heap: self.initial_heap.clone(),
            jenkins_url: self.jenkins_url.clone(),
            jenkins_project: self.jenkins_project.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            exit_codes::FAILURE
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    info!(version = env!("CARGO_PKG_VERSION"), "bootstrap starting");
    let cfg = apply_overrides(load_config(&cli.config)?, &cli.overrides())?;
    let spec = cfg.launch_spec(cli.arguments);

    let launcher = ProcessLauncher;
    let updater = JenkinsUpdater::new(cfg.jenkins_settings())?;
    let clock = SystemClock;
    let breaker = CrashLoopBreaker::new(cfg.window(), cfg.breaker.max_boots);

    let mut supervisor = Supervisor::new(spec, breaker, &launcher, &updater, &clock)?;
    let preparation = supervisor.prepare()?;
    debug!(?preparation, "artifact ready");
    let termination = supervisor.run()?;
    info!(?termination, "supervisor exiting");
    Ok(termination.exit_code())
}
