//! `log-detective`: analyse a log file in an ephemeral remote sandbox.

use clap::Parser;
use logdetective::args::DetectiveArgs;
use logdetective::commands;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = DetectiveArgs::parse();
    logdetective::init_tracing(args.common.verbose);

    match commands::detective::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
