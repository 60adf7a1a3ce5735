use tracing::warn;

use crate::protocol::types::{GeneratorPayload, PipelineEvent};

use super::state::{Iteration, SessionState, SessionStatus};

/// Apply one pipeline event to the session.
///
/// Never fails: unknown events and events arriving after a stop leave the
/// state untouched.
pub fn apply(state: &mut SessionState, event: &PipelineEvent) {
    if state.status == SessionStatus::Stopped {
        return;
    }
    match event {
        PipelineEvent::Start(_) => {
            state.status = SessionStatus::Running;
            state.last_error = None;
        }
        PipelineEvent::Generator(payload) => apply_generator(state, payload),
        PipelineEvent::Researcher(guide) => {
            state.current.research_guide = Some(guide.clone());
        }
        PipelineEvent::Recruiter(payload) => {
            state.current.recruited_personas.clone_from(&payload.personas);
        }
        PipelineEvent::Simulation(payload) => {
            state
                .current
                .interviews
                .extend(payload.interviews.iter().cloned());
            if state.current.interviews.len() > state.config.num_personas as usize {
                warn!(
                    interviews = state.current.interviews.len(),
                    num_personas = state.config.num_personas,
                    "more interviews than requested personas"
                );
            }
        }
        PipelineEvent::Analyst(report) => {
            state.current.analyst_report = Some(report.clone());
        }
        PipelineEvent::Critic(critique) => {
            state.current.critique = Some(critique.clone());
        }
        PipelineEvent::Complete(_) => {
            if state.current.has_idea() {
                state.finalize_current();
            }
            state.status = SessionStatus::Complete;
        }
        PipelineEvent::Error(payload) => {
            state.status = SessionStatus::Error;
            state.last_error = Some(payload.message.clone());
        }
        PipelineEvent::Other { .. } => {}
    }
}

/// Whether a `generator` event numbered `incoming` starts a new iteration.
///
/// The producer never marks the end of an iteration. An iteration that holds
/// both an idea and a critique has reached its last stage, so the next idea
/// belongs to a new one. Without a critic the critique never arrives; a
/// changed iteration number is the fallback signal.
pub fn closes_iteration(current: &Iteration, incoming: u64) -> bool {
    current.has_idea() && (current.has_critique() || incoming != current.number)
}

fn apply_generator(state: &mut SessionState, payload: &GeneratorPayload) {
    let mut number = u64::from(payload.iteration);
    if closes_iteration(&state.current, number) {
        state.finalize_current();
    }

    if let Some(last) = state.last_finalized_number()
        && number <= last
    {
        warn!(
            received = number,
            last_finalized = last,
            "iteration number did not advance, renumbering"
        );
        number = last.saturating_add(1);
    }

    state.current = Iteration {
        idea: Some(payload.idea.clone()),
        ..Iteration::empty(number)
    };
}
