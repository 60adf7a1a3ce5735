use serde::Serialize;

use crate::config::RunConfig;

/// JSON body POSTed to the pipeline service to start a validation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationRequest {
    pub idea: String,
    pub max_iterations: u32,
    pub num_personas: u32,
    pub interview_iterations: u32,
    pub mock_simulation: bool,
    pub enable_simulation: bool,
    pub enable_critic: bool,
    pub use_fast_model: bool,
}

impl ValidationRequest {
    /// Build a request from the idea text and a copy of the run parameters.
    pub fn new(idea: &str, config: &RunConfig) -> Self {
        Self {
            idea: idea.to_string(),
            max_iterations: config.max_iterations,
            num_personas: config.num_personas,
            interview_iterations: config.interview_iterations,
            mock_simulation: config.mock_simulation,
            enable_simulation: config.enable_simulation,
            enable_critic: config.enable_critic,
            use_fast_model: config.use_fast_model,
        }
    }
}
