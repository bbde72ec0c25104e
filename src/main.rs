use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use toprated::{Error, RatingsClient};

mod cli;

use cli::Cli;

/// Exit status when interrupted by a signal
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => return report(&e, None),
    };

    let client = match RatingsClient::new(config.clone()) {
        Ok(client) => client,
        Err(e) => return report(&e, None),
    };

    let key = config.query.default_key.as_str();
    let limit = config.query.default_limit;
    let start = Instant::now();

    // Losing the race drops the pipeline future, which cancels every in-flight request
    let outcome = tokio::select! {
        result = client.top_rated(key, limit) => result,
        _ = wait_for_signal() => {
            eprintln!("interrupted");
            return ExitCode::from(EXIT_INTERRUPTED);
        }
    };

    let names = match outcome {
        Ok(names) => names,
        Err(e) => return report(&e, Some(key)),
    };

    if cli.json {
        match serde_json::to_string_pretty(&names) {
            Ok(json) => println!("{json}"),
            Err(e) => return report(&Error::Serialization(e), Some(key)),
        }
    } else {
        for name in &names {
            println!("{name}");
        }
    }

    eprintln!("Running time: {:.4}s", start.elapsed().as_secs_f64());
    ExitCode::SUCCESS
}

/// Initialize structured logging on stderr
///
/// `RUST_LOG` wins when set; otherwise only warnings, plus info (or debug with `--verbose`)
/// from this crate.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,toprated=debug"
    } else {
        "warn,toprated=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(error: &Error, key: Option<&str>) -> ExitCode {
    let key = error.key().or(key);
    let context = match (key, error.page()) {
        (Some(key), Some(page)) => format!(" (key={key}, page={page})"),
        (Some(key), None) => format!(" (key={key})"),
        _ => String::new(),
    };
    eprintln!("error[{}]: {error}{context}", error.code());

    if error.is_config() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        std::future::pending::<()>().await;
    }
}
