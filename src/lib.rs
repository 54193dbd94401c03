pub mod cli;
pub mod downloader;

use std::process::ExitCode;

use tracing::error;

use cli::{Cli, Command, DownloadArgs};
use downloader::reporter::print_summary;
use downloader::{ConsoleReporter, DownloadError, Orchestrator, TokioDelay, YtDlpFetcher};

/// Exit status for errors that stop the run before any download
pub const FATAL_EXIT: u8 = 2;

/// Install the stderr log subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

pub async fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Download(args) => match download(&args).await {
            Ok(code) => code,
            Err(e) => {
                error!("{}", e);
                ExitCode::from(FATAL_EXIT)
            }
        },
    }
}

async fn download(args: &DownloadArgs) -> Result<ExitCode, DownloadError> {
    let cwd = std::env::current_dir().map_err(|source| DownloadError::OutputDirectory {
        path: ".".into(),
        source,
    })?;
    let request = args.to_request(cwd);

    let orchestrator = Orchestrator::new(
        Box::new(YtDlpFetcher::new(args.fetcher_config())),
        Box::new(TokioDelay),
        Box::new(ConsoleReporter::new()),
    );

    let outcomes = orchestrator.run(&request).await?;
    Ok(print_summary(&outcomes).exit_code())
}
