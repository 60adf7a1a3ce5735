use crate::config::RunConfig;
use crate::protocol::types::{
    AnalystReport, Critique, Idea, Interview, RecruitedPersona, ResearchGuide,
};

pub const STOPPED_BY_USER: &str = "Validation stopped by user";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Complete,
    Error,
    Stopped,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Stopped)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Stopped => "stopped",
        }
    }
}

/// One pass through the pipeline: idea → research → recruitment →
/// interviews → analysis → critique.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Iteration {
    /// Server-assigned; 0 until the first idea arrives.
    pub number: u64,
    pub idea: Option<Idea>,
    pub research_guide: Option<ResearchGuide>,
    pub recruited_personas: Vec<RecruitedPersona>,
    pub interviews: Vec<Interview>,
    pub analyst_report: Option<AnalystReport>,
    pub critique: Option<Critique>,
}

impl Iteration {
    pub fn empty(number: u64) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    pub fn has_idea(&self) -> bool {
        self.idea.is_some()
    }

    pub fn has_critique(&self) -> bool {
        self.critique.is_some()
    }

    /// True if no stage has reported anything for this iteration yet.
    pub fn is_blank(&self) -> bool {
        self.idea.is_none()
            && self.research_guide.is_none()
            && self.recruited_personas.is_empty()
            && self.interviews.is_empty()
            && self.analyst_report.is_none()
            && self.critique.is_none()
    }
}

/// Tracks accumulated session state across pipeline events.
///
/// `history` only ever grows by appending a finished `current`; entries are
/// never touched again until [`reset`](Self::reset).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub original_idea: String,
    pub config: RunConfig,
    pub history: Vec<Iteration>,
    pub current: Iteration,
    pub last_error: Option<String>,
}

impl SessionState {
    /// Back to `Idle` with no history, an empty `current` and no error.
    /// The configuration is kept.
    pub fn reset(&mut self) {
        *self = Self {
            config: self.config,
            ..Self::default()
        };
    }

    /// Record the inputs of a new run and mark it running.
    pub fn begin(&mut self, idea: &str, config: RunConfig) {
        self.reset();
        self.original_idea = idea.to_string();
        self.config = config;
        self.status = SessionStatus::Running;
    }

    /// Move `current` into `history` and open the next iteration.
    pub fn finalize_current(&mut self) {
        let next = Iteration::empty(self.current.number.saturating_add(1));
        let finished = std::mem::replace(&mut self.current, next);
        self.history.push(finished);
    }

    /// Number of the last finalized iteration, if any.
    pub fn last_finalized_number(&self) -> Option<u64> {
        self.history.last().map(|it| it.number)
    }

    /// Freeze in `Stopped`. Sticky until the next reset.
    pub fn mark_stopped(&mut self) {
        self.status = SessionStatus::Stopped;
        self.last_error = Some(STOPPED_BY_USER.to_string());
    }

    /// Record a failure, unless the user already stopped the session.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status == SessionStatus::Stopped {
            return;
        }
        self.status = SessionStatus::Error;
        self.last_error = Some(message.into());
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            original_idea: self.original_idea.clone(),
            config: self.config,
            history: self.history.clone(),
            current: self.current.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Owned, read-only copy of a session handed to renderers and exporters.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub original_idea: String,
    pub config: RunConfig,
    pub history: Vec<Iteration>,
    pub current: Iteration,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    /// Finalized iterations followed by `current` if it already has an idea.
    pub fn iterations(&self) -> impl Iterator<Item = &Iteration> {
        self.history
            .iter()
            .chain(Some(&self.current).filter(|it| it.has_idea()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea(title: &str) -> Idea {
        Idea {
            title: title.to_string(),
            ..Idea::default()
        }
    }

    #[test]
    fn finalize_appends_and_increments() {
        let mut state = SessionState::default();
        state.current = Iteration {
            number: 3,
            idea: Some(idea("A")),
            ..Iteration::default()
        };
        state.finalize_current();
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].number, 3);
        assert_eq!(state.current, Iteration::empty(4));
        assert!(state.current.is_blank());
    }

    #[test]
    fn finalize_at_largest_number_does_not_overflow() {
        let mut state = SessionState::default();
        state.current = Iteration {
            number: u64::MAX,
            idea: Some(idea("A")),
            ..Iteration::default()
        };
        state.finalize_current();
        assert_eq!(state.history[0].number, u64::MAX);
        assert_eq!(state.current.number, u64::MAX);
    }

    #[test]
    fn reset_keeps_config_only() {
        let mut state = SessionState::default();
        let config = RunConfig {
            num_personas: 5,
            ..RunConfig::default()
        };
        state.begin("idea", config);
        state.current.idea = Some(idea("A"));
        state.finalize_current();
        state.fail("boom");
        state.reset();
        assert_eq!(state.status, SessionStatus::Idle);
        assert!(state.history.is_empty());
        assert_eq!(state.current, Iteration::default());
        assert_eq!(state.last_error, None);
        assert_eq!(state.original_idea, "");
        assert_eq!(state.config, config);
    }

    #[test]
    fn fail_does_not_overwrite_stopped() {
        let mut state = SessionState::default();
        state.begin("idea", RunConfig::default());
        state.mark_stopped();
        state.fail("connection reset");
        assert_eq!(state.status, SessionStatus::Stopped);
        assert_eq!(state.last_error.as_deref(), Some(STOPPED_BY_USER));
    }

    #[test]
    fn snapshot_iterations_include_current_with_idea() {
        let mut state = SessionState::default();
        state.current = Iteration {
            number: 1,
            idea: Some(idea("A")),
            ..Iteration::default()
        };
        state.finalize_current();
        assert_eq!(state.snapshot().iterations().count(), 1);

        state.current.recruited_personas.push(RecruitedPersona::default());
        assert_eq!(state.snapshot().iterations().count(), 1);

        state.current.idea = Some(idea("B"));
        let numbers: Vec<u64> = state.snapshot().iterations().map(|it| it.number).collect();
        assert_eq!(numbers, [1, 2]);
    }
}
