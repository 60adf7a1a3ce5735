//! Markdown export of a finished (or interrupted) session.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use crate::session::state::{Iteration, SessionSnapshot};

/// Render every iteration of `snapshot` as a markdown document.
///
/// Includes the in-progress iteration when it already has an idea, so an
/// interrupted run exports what it got.
pub fn to_markdown(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# 🦄 AI Unicorn Validator - Session Export\n");
    let _ = writeln!(out, "**Original Idea:** {}\n", snapshot.original_idea);
    if let Some(ref error) = snapshot.last_error {
        let _ = writeln!(out, "**Status:** {} ({error})\n", snapshot.status.label());
    } else {
        let _ = writeln!(out, "**Status:** {}\n", snapshot.status.label());
    }
    let _ = writeln!(out, "---\n");

    for iteration in snapshot.iterations() {
        write_iteration(&mut out, iteration);
    }
    out
}

fn write_iteration(out: &mut String, iteration: &Iteration) {
    let _ = writeln!(out, "## Iteration {}\n", iteration.number);

    if let Some(ref idea) = iteration.idea {
        let _ = writeln!(out, "### 💡 Generated Idea\n");
        let _ = writeln!(out, "**{}**\n", idea.title);
        let _ = writeln!(out, "{}\n", idea.description);
        let _ = writeln!(out, "- **Monetization:** {}", idea.monetization_strategy);
        let _ = writeln!(out, "- **Target Audience:** {}\n", idea.target_audience);
    }

    if !iteration.interviews.is_empty() {
        let _ = writeln!(out, "### 🎤 Interviews\n");
        for interview in &iteration.interviews {
            let _ = writeln!(
                out,
                "- **{}** ({}): pain {}/10, willingness to pay {}/10",
                interview.persona.name,
                interview.persona.role,
                interview.pain_level,
                interview.willingness_to_pay
            );
        }
        out.push('\n');
    }

    if let Some(ref report) = iteration.analyst_report {
        let _ = writeln!(out, "### 📊 Analyst Report\n");
        let _ = writeln!(
            out,
            "**Pivot Recommendation:** {}\n",
            report.pivot_recommendation
        );
    }

    if let Some(ref critique) = iteration.critique {
        let approved = if critique.is_approved {
            "✅ Yes"
        } else {
            "❌ No"
        };
        let _ = writeln!(out, "### 🧐 Investor Critique\n");
        let _ = writeln!(out, "**Score:** {}/10\n", critique.score);
        let _ = writeln!(out, "**Approved:** {approved}\n");
        let _ = writeln!(out, "{}\n", critique.feedback);
    }

    let _ = writeln!(out, "---\n");
}

/// Write the markdown export to `path`.
pub fn write_markdown(snapshot: &SessionSnapshot, path: &Path) -> Result<()> {
    std::fs::write(path, to_markdown(snapshot))
        .with_context(|| format!("failed to write export to {}", path.display()))
}
