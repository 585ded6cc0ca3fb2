use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use slircd::cli::Args;
use slircd::error::ServerError;
use slircd::event_loop::EventLoop;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            tracing::error!(error = %e, "invalid command-line arguments");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run(args) {
        tracing::error!(error = %e, "server exited with error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(args: Args) -> Result<(), ServerError> {
    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&stop)).map_err(ServerError::Signal)?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&stop)).map_err(ServerError::Signal)?;

    let mut event_loop = EventLoop::bind(args.port, args.password, stop)?;
    tracing::info!(port = args.port, "slircd listening");
    event_loop.run();
    Ok(())
}
