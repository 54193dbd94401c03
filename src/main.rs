use std::process::ExitCode;

use clap::Parser;

use youtube_mp3_lib::cli::Cli;
use youtube_mp3_lib::{init_tracing, run, FATAL_EXIT};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_filter());

    // Downloads run strictly one after another
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::from(FATAL_EXIT);
        }
    };

    runtime.block_on(run(cli))
}
