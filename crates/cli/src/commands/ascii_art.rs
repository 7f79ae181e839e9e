//! `ascii-art-agent`: the write-run-fix demonstration task.

use crate::args::AsciiArtArgs;
use anyhow::Context;
use logdetective_agent::{AgentServices, AsciiArtAgent};

pub async fn run(args: AsciiArtArgs) -> anyhow::Result<()> {
    let config = args
        .common
        .load_config()
        .context("Failed to load configuration")?;

    let agent = AsciiArtAgent::new(AgentServices::from_config(config)?);
    let output = agent.run(&args.text).await?;
    println!("{output}");
    Ok(())
}
