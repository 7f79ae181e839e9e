//! Command-line arguments.

use clap::{Args, Parser};
use logdetective_agent::ChunkStrategy;
use logdetective_agent::ascii_art::DEFAULT_TEXT;
use logdetective_config::{AppConfig, ConfigError};
use std::path::PathBuf;

/// Flags both binaries accept.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Config file (defaults to ~/.logdetective/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Model name, overriding config and LOGDETECTIVE_MODEL
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,
}

impl CommonArgs {
    /// Load file and environment configuration, then apply these flags.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.model.name = model.clone();
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "log-detective",
    about = "Analyse a log file with a model working in a remote sandbox",
    version
)]
pub struct DetectiveArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Largest chunk sent to one agent loop, in bytes
    #[arg(long, value_name = "BYTES")]
    pub max_chunk_size: Option<usize>,

    /// Model turns allowed per chunk
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<usize>,

    /// How to handle files over the chunk size: split or sample
    #[arg(long, default_value = "split")]
    pub strategy: ChunkStrategy,

    /// The log file to analyse
    #[arg(value_name = "LOG_FILE")]
    pub log_file: PathBuf,
}

impl DetectiveArgs {
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::load(self.common.config.as_deref())?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut AppConfig) {
        self.common.apply(config);
        if let Some(size) = self.max_chunk_size {
            config.agent.max_chunk_size = size;
        }
        if let Some(n) = self.max_iterations {
            config.agent.max_iterations = n;
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "ascii-art-agent",
    about = "Have a model write, run and fix an ASCII art program in a remote sandbox",
    version
)]
pub struct AsciiArtArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Text to render
    #[arg(long, default_value = DEFAULT_TEXT)]
    pub text: String,
}
