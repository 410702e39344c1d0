// ghtally entry point.
// Sets up logging, runs the CLI and maps failures to exit codes.

use std::process::ExitCode;

use ghtally::StatError;
use ghtally::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

fn init_tracing(verbose: bool) {
    let default = if verbose { "ghtally=debug" } else { "ghtally=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(StatError::Interrupted) => {
            eprintln!("Interrupted, committed progress was saved");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
