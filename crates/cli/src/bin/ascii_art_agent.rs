//! `ascii-art-agent`: have the model write and debug a small program remotely.

use clap::Parser;
use logdetective::args::AsciiArtArgs;
use logdetective::commands;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = AsciiArtArgs::parse();
    logdetective::init_tracing(args.common.verbose);

    match commands::ascii_art::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
