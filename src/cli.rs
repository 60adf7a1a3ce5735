use std::path::PathBuf;

use clap::Parser;

use unicorn_validator::config::RunConfig;

#[derive(Parser, Debug)]
#[command(
    name = "unicorn",
    about = "Stream a startup idea through the AI Unicorn Validator pipeline",
    version
)]
pub struct Cli {
    /// Startup idea to validate.
    #[arg(value_name = "IDEA")]
    pub idea: Option<String>,

    /// Maximum refinement iterations (1-5).
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Number of personas to interview per iteration (1-5).
    #[arg(long)]
    pub personas: Option<u32>,

    /// Interview cycles per iteration (1-3).
    #[arg(long)]
    pub interview_cycles: Option<u32>,

    /// Have the service fake interviews instead of calling the model.
    #[arg(long)]
    pub mock: bool,

    /// Skip the interview simulation stage.
    #[arg(long)]
    pub no_simulation: bool,

    /// Skip the investor critique stage.
    #[arg(long)]
    pub no_critic: bool,

    /// Use the faster, cheaper model.
    #[arg(long)]
    pub fast: bool,

    /// Base URL of the pipeline service. Overrides unicorn.toml.
    #[arg(long)]
    pub url: Option<String>,

    /// Replay a recorded event stream instead of calling the service.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["url", "record"])]
    pub replay: Option<PathBuf>,

    /// Delay in milliseconds between replayed chunks.
    #[arg(long, value_name = "MS", requires = "replay")]
    pub pace: Option<u64>,

    /// Save the raw event stream to this file while validating.
    #[arg(long, value_name = "FILE")]
    pub record: Option<PathBuf>,

    /// Write a markdown report of the session to this file.
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Print full interview transcripts.
    #[arg(long)]
    pub show_transcripts: bool,

    /// Config file to use instead of ./unicorn.toml.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Layer the command-line flags over the run parameters from the config file.
    pub fn run_config(&self, base: RunConfig) -> RunConfig {
        RunConfig {
            max_iterations: self.max_iterations.unwrap_or(base.max_iterations),
            num_personas: self.personas.unwrap_or(base.num_personas),
            interview_iterations: self.interview_cycles.unwrap_or(base.interview_iterations),
            mock_simulation: base.mock_simulation || self.mock,
            enable_simulation: base.enable_simulation && !self.no_simulation,
            enable_critic: base.enable_critic && !self.no_critic,
            use_fast_model: base.use_fast_model || self.fast,
        }
    }
}
