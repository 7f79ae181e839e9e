//! `log-detective <LOG_FILE>`: analyse one log file and print the report.

use crate::args::DetectiveArgs;
use anyhow::Context;
use logdetective_agent::{AgentServices, LogDetective};
use tracing::{info, warn};

pub async fn run(args: DetectiveArgs) -> anyhow::Result<()> {
    let config = args.load_config().context("Failed to load configuration")?;
    info!(
        model = %config.model.name,
        max_chunk_size = config.agent.max_chunk_size,
        max_iterations = config.agent.max_iterations,
        "Starting log analysis"
    );

    let detective = LogDetective::new(AgentServices::from_config(config)?).with_strategy(args.strategy);
    let report = detective.run(&args.log_file).await?;

    if report.is_total_failure() {
        warn!("No chunk could be analysed; see the report for reasons");
    }
    print!("{report}");
    Ok(())
}
