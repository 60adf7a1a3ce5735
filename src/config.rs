use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH: &str = "unicorn.toml";

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

const MAX_ITERATIONS_RANGE: (u32, u32) = (1, 5);
const NUM_PERSONAS_RANGE: (u32, u32) = (1, 5);
const INTERVIEW_ITERATIONS_RANGE: (u32, u32) = (1, 3);

/// Parameters for one validation run.
///
/// Copied into the request when a session starts; edits made afterwards
/// don't reach an in-flight session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub max_iterations: u32,
    pub num_personas: u32,
    /// Interview cycles per iteration.
    pub interview_iterations: u32,
    /// Ask the service to fake interviews instead of calling the model.
    pub mock_simulation: bool,
    pub enable_simulation: bool,
    pub enable_critic: bool,
    pub use_fast_model: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            num_personas: 3,
            interview_iterations: 1,
            mock_simulation: false,
            enable_simulation: true,
            enable_critic: true,
            use_fast_model: false,
        }
    }
}

impl RunConfig {
    /// Force the numeric parameters into the ranges the service accepts.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            max_iterations: clamp(self.max_iterations, MAX_ITERATIONS_RANGE),
            num_personas: clamp(self.num_personas, NUM_PERSONAS_RANGE),
            interview_iterations: clamp(self.interview_iterations, INTERVIEW_ITERATIONS_RANGE),
            ..self
        }
    }
}

fn clamp(value: u32, (min, max): (u32, u32)) -> u32 {
    value.clamp(min, max)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the pipeline service; `/api/validate` is appended.
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

/// File configuration from `unicorn.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub run: RunConfig,
}

/// Load configuration from `unicorn.toml` under `dir`.
///
/// Falls back to defaults if the file is missing.
pub fn load(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    load_file(&path)
}

/// Load configuration from an explicit path. The file must exist.
pub fn load_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}
