use std::process::ExitCode;

use clap::Parser;
use poscapture_lib::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    poscapture_lib::init_tracing(&cli.log_level, cli.log_json);

    match poscapture_lib::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error starting poscapture: {e:#}");
            ExitCode::FAILURE
        }
    }
}
