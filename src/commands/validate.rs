use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::display::renderer::Renderer;
use crate::export;
use crate::session::cancel::StopHandle;
use crate::session::state::{SessionSnapshot, SessionStatus};
use crate::session::transport::{HttpTransport, ReplayTransport, Transport};
use crate::session::{Session, StartOutcome, StartRejection};

/// Where the event stream comes from.
pub enum Source {
    /// The pipeline service at this base URL, optionally recording the raw stream.
    Live {
        url: String,
        record_to: Option<PathBuf>,
    },
    /// A previously recorded stream file.
    Replay { path: PathBuf, pace: Option<Duration> },
}

pub struct ValidateConfig {
    pub idea: String,
    pub run: RunConfig,
    pub source: Source,
    pub export_to: Option<PathBuf>,
    pub show_transcripts: bool,
    pub term_width: Option<usize>,
}

/// Run one validation session to its end, rendering as events arrive.
///
/// Ctrl+C stops the session; whatever was received stays in the returned snapshot.
pub async fn validate<W: Write>(config: ValidateConfig, writer: W) -> Result<SessionSnapshot> {
    match config.source {
        Source::Live {
            ref url,
            ref record_to,
        } => {
            let mut transport = HttpTransport::new(url.clone());
            if let Some(path) = record_to {
                transport = transport.record_to(path.clone());
            }
            run_with(&config, &transport, writer).await
        }
        Source::Replay { ref path, pace } => {
            let mut transport = ReplayTransport::from_file(path.clone());
            if let Some(delay) = pace {
                transport = transport.pace(delay);
            }
            run_with(&config, &transport, writer).await
        }
    }
}

async fn run_with<T: Transport, W: Write>(
    config: &ValidateConfig,
    transport: &T,
    writer: W,
) -> Result<SessionSnapshot> {
    if config.idea.trim().is_empty() {
        anyhow::bail!("idea text is empty");
    }
    let mut renderer = Renderer::with_writer(writer);
    renderer.set_show_transcripts(config.show_transcripts);
    if let Some(width) = config.term_width {
        renderer.set_width(width);
    }

    let mut session = Session::new();
    let stop = session.stop_handle();
    let ctrl_c = tokio::spawn(stop_on_interrupt(tokio::signal::ctrl_c, stop));

    let run = config.run.clamped();
    renderer.render_session_header(&config.idea, &run);
    let outcome = session
        .start(&config.idea, run, transport, &mut renderer)
        .await;
    ctrl_c.abort();

    match outcome {
        StartOutcome::Rejected(StartRejection::EmptyIdea) => {
            anyhow::bail!("idea text is empty");
        }
        StartOutcome::Rejected(StartRejection::AlreadyRunning) => {
            anyhow::bail!("a validation session is already running");
        }
        StartOutcome::Finished(status) => {
            info!(status = status.label(), "validation finished");
        }
    }
    renderer.render_outcome(session.state());

    let snapshot = session.snapshot();
    if let Some(ref path) = config.export_to
        && snapshot.status != SessionStatus::Idle
    {
        export::write_markdown(&snapshot, path)?;
        renderer.render_notice(&format!("Exported to {}", path.display()));
    }
    Ok(snapshot)
}

/// Stop the session on the first interrupt that finds a stream in flight.
///
/// An interrupt that arrives before the stream opens has nothing to cancel,
/// so keep listening.
async fn stop_on_interrupt<F, Fut>(mut interrupt: F, stop: StopHandle)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    while interrupt().await.is_ok() {
        if stop.stop() {
            info!("interrupt received");
            return;
        }
        debug!("interrupt before the stream opened");
    }
}
