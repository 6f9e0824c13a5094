//! Binary entry point: `check`, `check-worker` and `push` services.

use clap::Parser;
use log::error;

use redirect_status::app::{install_signal_handlers, ShutdownController};
use redirect_status::checker::{run_supervisor, run_worker};
use redirect_status::config::{Cli, Command};
use redirect_status::initialization::init_logger_with;
use redirect_status::pusher::run_dispatcher;

#[tokio::main]
async fn main() {
    // Load .env if present; deployments configure everything via environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if let Err(e) = init_logger_with(cli.log_level.clone().into(), cli.log_format.clone()) {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let shutdown = ShutdownController::new();
    if let Err(e) = install_signal_handlers(&shutdown) {
        error!("failed to install signal handlers: {e}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Check(args) => match args.to_config() {
            Ok(config) => run_supervisor(config, shutdown.clone()).await,
            Err(e) => Err(e.into()),
        },
        Command::CheckWorker(args) => match args.to_config() {
            Ok(config) => run_worker(config, shutdown.clone()).await,
            Err(e) => Err(e.into()),
        },
        Command::Push(args) => match args.to_config() {
            Ok(config) => run_dispatcher(config, shutdown.clone()).await,
            Err(e) => Err(e.into()),
        },
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }

    // 0 after a clean return, 128 + signum after a signal-driven stop.
    std::process::exit(shutdown.exit_code());
}
