use clap::Parser;
use portal_watcher::config;
use portal_watcher::interface::cli::args::Args;
use portal_watcher::interface::cli::daemon;
use portal_watcher::interface::cli::supervisor::{self, Identity, PidFile};
use std::process::ExitCode;
use tracing::{error, info};

/// Synchronous entry point: everything that forks happens before the runtime exists.
fn main() -> ExitCode {
    let args = Args::parse();

    // Step 1: Load configuration while relative paths still resolve.
    let settings = match config::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("portal-watcher: failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    let workers = args.worker_count(settings.workers.count);

    // Step 2: Resolve the target identity and take the PID lock.
    let identity = match Identity::resolve(args.user.as_deref(), args.group.as_deref()) {
        Ok(identity) => identity,
        Err(err) => {
            eprintln!("portal-watcher: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut pid_file = match args.pid_file.as_deref().map(PidFile::acquire).transpose() {
        Ok(pid_file) => pid_file,
        Err(err) => {
            eprintln!("portal-watcher: {err}");
            return ExitCode::FAILURE;
        }
    };
    let log_file = match args.log_file.as_deref().map(std::path::absolute).transpose() {
        Ok(path) => path,
        Err(err) => {
            eprintln!("portal-watcher: invalid log file path: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Step 3: Detach unless asked to stay in the foreground.
    if !args.foreground {
        if let Err(err) = supervisor::daemonize() {
            eprintln!("portal-watcher: {err}");
            return ExitCode::FAILURE;
        }
    }
    if let Some(pid_file) = pid_file.as_mut() {
        if let Err(err) = pid_file.record(std::process::id()) {
            eprintln!("portal-watcher: {err}");
            return ExitCode::FAILURE;
        }
    }

    // Step 4: Start logging, then give up privileges.
    if let Err(err) = supervisor::init_logging(args.debug, log_file.as_deref()) {
        eprintln!("portal-watcher: {err}");
        return ExitCode::FAILURE;
    }
    if let Err(err) = identity.apply() {
        error!(error = %err, "privilege_drop_failed");
        return ExitCode::FAILURE;
    }
    info!(workers, foreground = args.foreground, "watcher_starting");

    // Step 5: Build the runtime only now that the process is settled.
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "runtime_build_failed");
            return ExitCode::FAILURE;
        }
    };

    // Step 6: Run until SIGINT/SIGTERM.
    let result = runtime.block_on(daemon::run(settings, workers));
    drop(pid_file);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "watcher_failed");
            ExitCode::FAILURE
        }
    }
}
