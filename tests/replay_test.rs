#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use unicorn_validator::config::RunConfig;
use unicorn_validator::export::to_markdown;
use unicorn_validator::session::controller::STREAM_ENDED_EARLY;
use unicorn_validator::session::state::{SessionSnapshot, SessionStatus};
use unicorn_validator::session::transport::ReplayTransport;
use unicorn_validator::session::{Session, StartOutcome};

const CHUNK_SIZES: [usize; 5] = [1, 3, 17, 64, 4096];

fn case_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/cases")
        .join(format!("{name}.sse"))
}

async fn replay(name: &str, chunk_size: usize, config: RunConfig) -> SessionSnapshot {
    let transport = ReplayTransport::from_file(case_path(name)).chunk_size(chunk_size);
    let mut session = Session::new();
    let outcome = session
        .start("Uber for cats", config, &transport, &mut ())
        .await;
    assert!(
        matches!(outcome, StartOutcome::Finished(_)),
        "{name} should run to the end, got {outcome:?}"
    );
    session.snapshot()
}

/// Replay a case at every chunk size and check that the result never depends
/// on how the bytes were split.
async fn replay_all_sizes(name: &str, config: RunConfig) -> SessionSnapshot {
    let reference = replay(name, CHUNK_SIZES[0], config).await;
    for &size in &CHUNK_SIZES[1..] {
        let snapshot = replay(name, size, config).await;
        assert_eq!(
            snapshot, reference,
            "{name}: chunk size {size} diverged from byte-at-a-time replay"
        );
    }
    reference
}

#[tokio::test]
async fn two_iterations() {
    let snapshot = replay_all_sizes("two_iterations", RunConfig::default()).await;

    assert_eq!(snapshot.status, SessionStatus::Complete);
    assert_eq!(snapshot.last_error, None);
    assert_eq!(snapshot.original_idea, "Uber for cats");
    assert_eq!(snapshot.history.len(), 2);
    assert!(snapshot.current.is_blank());

    let first = &snapshot.history[0];
    assert_eq!(first.number, 1);
    assert_eq!(first.idea.as_ref().expect("idea").title, "Cat Walkers");
    let guide = first.research_guide.as_ref().expect("research guide");
    assert_eq!(guide.hypotheses[0].kind, "Problem");
    assert_eq!(first.recruited_personas.len(), 1);
    assert_eq!(first.interviews.len(), 1);
    assert_eq!(
        first.interviews[0].full_transcript,
        "Q: Do you walk your cat?\nA: No."
    );
    assert_eq!(
        first
            .analyst_report
            .as_ref()
            .expect("analyst report")
            .pivot_recommendation,
        "Pivot to in-home cat sitting"
    );
    assert_eq!(first.critique.as_ref().expect("critique").score, 4);

    let second = &snapshot.history[1];
    assert_eq!(second.number, 2);
    assert_eq!(second.idea.as_ref().expect("idea").title, "Cat Sitters");
    assert!(second.research_guide.is_none());
    assert!(second.critique.as_ref().expect("critique").is_approved);
}

#[tokio::test]
async fn iterations_split_by_number_without_critic() {
    let config = RunConfig {
        enable_critic: false,
        ..RunConfig::default()
    };
    let snapshot = replay_all_sizes("no_critic", config).await;

    assert_eq!(snapshot.status, SessionStatus::Complete);
    let titles: Vec<&str> = snapshot
        .history
        .iter()
        .map(|it| it.idea.as_ref().expect("idea").title.as_str())
        .collect();
    assert_eq!(titles, ["Cat Walkers", "Cat Sitters"]);
    assert!(snapshot.history.iter().all(|it| it.critique.is_none()));
    assert!(!snapshot.config.enable_critic);
}

#[tokio::test]
async fn error_event_keeps_partial_iteration() {
    let snapshot = replay_all_sizes("pipeline_error", RunConfig::default()).await;

    assert_eq!(snapshot.status, SessionStatus::Error);
    assert_eq!(snapshot.last_error.as_deref(), Some("Rate limit exceeded"));
    assert!(snapshot.history.is_empty());
    assert_eq!(
        snapshot.current.idea.as_ref().expect("idea").title,
        "Cat Walkers"
    );
    // the critic record with a non-numeric score was dropped
    assert!(snapshot.current.critique.is_none());
}

#[tokio::test]
async fn truncated_stream_is_an_error() {
    let snapshot = replay_all_sizes("truncated", RunConfig::default()).await;

    assert_eq!(snapshot.status, SessionStatus::Error);
    assert_eq!(snapshot.last_error.as_deref(), Some(STREAM_ENDED_EARLY));
    assert!(snapshot.current.critique.is_none());
    assert_eq!(snapshot.iterations().count(), 1);
}

#[tokio::test]
async fn export_lists_every_iteration() {
    let snapshot = replay("two_iterations", 64, RunConfig::default()).await;
    let markdown = to_markdown(&snapshot);

    assert!(markdown.contains("**Status:** complete"));
    let first = markdown.find("## Iteration 1").expect("iteration 1");
    let second = markdown.find("## Iteration 2").expect("iteration 2");
    assert!(first < second);
    assert!(
        markdown.contains("- **Anna Kowalska** (Accountant): pain 8/10, willingness to pay 7/10")
    );
    assert!(markdown.contains("**Score:** 8/10"));
}
