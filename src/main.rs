use std::env;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use sysdupd::cli::Args;
use sysdupd::config::AppPaths;
use sysdupd::console::Console;
use sysdupd::context::AppContext;
use sysdupd::errors::AppError;
use sysdupd::notify::DesktopNotifier;
use sysdupd::orchestrator::run_service;
use sysdupd::runner::{CommandRunner, SystemRunner};

fn init_logging() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("SYSDUPD_LOG")
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn main() {
    let args = Args::parse();
    init_logging();

    if let Err(e) = run(args) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let paths = AppPaths::from_env()?;
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);

    if args.service {
        let notifier = Arc::new(DesktopNotifier::new(runner.clone()));
        let outcome = run_service(&paths, runner, notifier);
        tracing::debug!("Service run finished: {:?}", outcome);
        return Ok(());
    }

    let executable = env::current_exe()?;
    let ctx = AppContext::new(paths, executable, runner)?;
    Console::new(ctx).run()
}
