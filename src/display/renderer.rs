use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Print, StyledContent};
use unicode_width::UnicodeWidthChar;

use super::theme;
use crate::config::RunConfig;
use crate::protocol::types::{
    AnalystReport, Critique, GeneratorPayload, PipelineEvent, RecruiterPayload, ResearchGuide,
    SimulationPayload,
};
use crate::session::SessionObserver;
use crate::session::state::{SessionState, SessionStatus};

const INDENT: &str = "   ";

/// Display configuration for the renderer.
#[derive(Default)]
pub struct RendererConfig {
    /// Print each interview's transcript summary under its score line.
    pub show_transcripts: bool,
    /// Fixed output width. `None` queries the terminal.
    pub width: Option<usize>,
}

/// Prints one line group per pipeline stage as events are applied.
pub struct Renderer<W: Write = io::Stdout> {
    /// Whether the pipeline's own `error` event has already been shown.
    error_rendered: bool,
    config: RendererConfig,
    out: W,
}

impl Default for Renderer<io::Stdout> {
    fn default() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Renderer<io::Stdout> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<W: Write> Renderer<W> {
    pub fn with_writer(writer: W) -> Self {
        Self {
            error_rendered: false,
            config: RendererConfig::default(),
            out: writer,
        }
    }

    pub fn set_show_transcripts(&mut self, show: bool) {
        self.config.show_transcripts = show;
    }

    pub fn set_width(&mut self, width: usize) {
        self.config.width = Some(width.max(1));
    }

    // --- Session lifecycle ---

    pub fn render_session_header(&mut self, idea: &str, config: &RunConfig) {
        self.error_rendered = false;
        let title = self.fit(&format!("Validating: {}", first_line(idea)));
        let on_off = |flag: bool| if flag { "on" } else { "off" };
        let mut summary = format!(
            "up to {} iterations · {} personas · critic {} · simulation {}",
            config.max_iterations,
            config.num_personas,
            on_off(config.enable_critic),
            on_off(config.enable_simulation),
        );
        if config.mock_simulation {
            summary.push_str(" · mock");
        }
        let summary = self.fit(&summary);
        self.line(theme::idea_title().apply(title));
        self.line(theme::dim().apply(summary));
        self.out.flush().ok();
    }

    /// Print whatever the event stream itself didn't: a stop, or a transport failure.
    pub fn render_outcome(&mut self, state: &SessionState) {
        match state.status {
            SessionStatus::Stopped => {
                self.blank();
                self.line(theme::dim().apply("[stopped]".to_string()));
            }
            SessionStatus::Error if !self.error_rendered => {
                let message = state.last_error.as_deref().unwrap_or("unknown error");
                self.render_error(message);
            }
            _ => {}
        }
        self.out.flush().ok();
    }

    pub fn render_notice(&mut self, notice: &str) {
        let text = self.fit(notice);
        self.line(theme::dim().apply(text));
        self.out.flush().ok();
    }

    pub fn render_error(&mut self, message: &str) {
        let text = self.fit(&format!("Error: {}", first_line(message)));
        self.line(theme::error().apply(text));
        self.error_rendered = true;
    }

    // --- Pipeline stages ---

    fn render_generator(&mut self, payload: &GeneratorPayload, number: u64) {
        let idea = &payload.idea;
        self.blank();
        self.line(theme::iteration_header().apply(format!("── Iteration {number} ──")));
        let title = self.fit(&format!("💡 {}", idea.title));
        self.line(theme::idea_title().apply(title));
        for (label, value) in [
            ("", &idea.description),
            ("Monetization: ", &idea.monetization_strategy),
            ("Audience: ", &idea.target_audience),
        ] {
            if !value.is_empty() {
                let text = self.fit(&format!("{INDENT}{label}{}", first_line(value)));
                self.line(theme::dim().apply(text));
            }
        }
    }

    fn render_research_guide(&mut self, guide: &ResearchGuide) {
        let counts = format!(
            " · {} · {}",
            plural(guide.hypotheses.len(), "hypothesis", "hypotheses"),
            plural(guide.questions.len(), "question", "questions"),
        );
        self.stage_line("Research guide", &counts);
        for hypothesis in &guide.hypotheses {
            let text = self.fit(&format!(
                "{INDENT}[{}] {}",
                hypothesis.kind,
                first_line(&hypothesis.description)
            ));
            self.line(theme::dim().apply(text));
        }
    }

    fn render_recruits(&mut self, payload: &RecruiterPayload) {
        let count = format!(" {}", plural(payload.personas.len(), "persona", "personas"));
        self.stage_line("Recruited", &count);
        for persona in &payload.personas {
            let text = self.fit(&format!("{INDENT}{} · {}", persona.name, persona.role));
            self.line(theme::dim().apply(text));
        }
    }

    fn render_interviews(&mut self, payload: &SimulationPayload) {
        for interview in &payload.interviews {
            let who = format!(" {} ({})", interview.persona.name, interview.persona.role);
            let scores = format!(
                "  pain {}/10 · pay {}/10",
                interview.pain_level, interview.willingness_to_pay
            );
            self.stage_line("Interview", &format!("{who}{scores}"));
            if self.config.show_transcripts && !interview.transcript_summary.is_empty() {
                let text = self.fit(&format!(
                    "{INDENT}{}",
                    first_line(&interview.transcript_summary)
                ));
                self.line(theme::dim_italic().apply(text));
            }
        }
    }

    fn render_analyst(&mut self, report: &AnalystReport) {
        let counts = format!(
            " · {} confirmed · {} rejected",
            report.confirmed_hypotheses.len(),
            report.rejected_hypotheses.len()
        );
        self.stage_line("Analyst", &counts);
        if !report.pivot_recommendation.is_empty() {
            let text = self.fit(&format!(
                "{INDENT}Pivot: {}",
                first_line(&report.pivot_recommendation)
            ));
            self.line(theme::dim().apply(text));
        }
    }

    fn render_critique(&mut self, critique: &Critique) {
        let verdict = if critique.is_approved {
            " · approved 🦄"
        } else {
            " · not approved"
        };
        queue!(
            self.out,
            Print(theme::stage().apply("Critique ")),
            Print(theme::score(critique.score).apply(format!("{}/10", critique.score))),
            Print(theme::dim().apply(verdict)),
            Print("\n"),
        )
        .ok();
        if !critique.feedback.is_empty() {
            let text = self.fit(&format!("{INDENT}{}", first_line(&critique.feedback)));
            self.line(theme::dim().apply(text));
        }
    }

    fn render_done(&mut self, state: &SessionState) {
        let count = plural(state.history.len(), "iteration", "iterations");
        let best = state
            .history
            .iter()
            .filter_map(|it| it.critique.as_ref().map(|c| c.score))
            .max();
        let stats = match best {
            Some(score) => format!("  {count} · best score {score}/10"),
            None => format!("  {count}"),
        };
        self.blank();
        queue!(
            self.out,
            Print(theme::result_line().apply("Done")),
            Print(theme::dim().apply(stats)),
            Print("\n"),
        )
        .ok();
    }

    // --- Helpers ---

    /// A coloured stage label followed by dim detail, fitted to the width.
    fn stage_line(&mut self, label: &str, detail: &str) {
        let room = self.width().saturating_sub(label.chars().count());
        let detail = truncate_to_width(detail, room);
        queue!(
            self.out,
            Print(theme::stage().apply(label)),
            Print(theme::dim().apply(detail)),
            Print("\n"),
        )
        .ok();
    }

    fn line<D: std::fmt::Display>(&mut self, content: StyledContent<D>) {
        queue!(self.out, Print(content), Print("\n")).ok();
    }

    fn blank(&mut self) {
        queue!(self.out, Print("\n")).ok();
    }

    fn width(&self) -> usize {
        self.config.width.unwrap_or_else(super::term_width)
    }

    fn fit(&self, line: &str) -> String {
        truncate_to_width(line, self.width())
    }
}

impl<W: Write> SessionObserver for Renderer<W> {
    fn on_event(&mut self, event: &PipelineEvent, state: &SessionState) {
        match event {
            PipelineEvent::Start(_) | PipelineEvent::Other { .. } => {}
            PipelineEvent::Generator(payload) => {
                self.render_generator(payload, state.current.number);
            }
            PipelineEvent::Researcher(guide) => self.render_research_guide(guide),
            PipelineEvent::Recruiter(payload) => self.render_recruits(payload),
            PipelineEvent::Simulation(payload) => self.render_interviews(payload),
            PipelineEvent::Analyst(report) => self.render_analyst(report),
            PipelineEvent::Critic(critique) => self.render_critique(critique),
            PipelineEvent::Complete(_) => self.render_done(state),
            PipelineEvent::Error(payload) => self.render_error(&payload.message),
        }
        self.out.flush().ok();
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Extract the first line of a string (no truncation).
fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

/// Truncate a string to fit within `max_width` display columns, appending `...` if truncated.
fn truncate_to_width(s: &str, max_width: usize) -> String {
    let ellipsis_width = 3; // "..."
    let mut width = 0;
    // Byte position where we'd cut to leave room for the ellipsis
    let mut cut_pos = 0;
    let mut result = String::new();
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width {
            if max_width >= ellipsis_width {
                result.truncate(cut_pos);
                result.push_str("...");
            } else {
                result.clear();
            }
            return result;
        }
        result.push(ch);
        width += ch_width;
        if width <= max_width.saturating_sub(ellipsis_width) {
            cut_pos = result.len();
        }
    }
    result
}
