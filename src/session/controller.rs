use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::protocol::emit::ValidationRequest;
use crate::protocol::parse::FrameDecoder;
use crate::protocol::types::PipelineEvent;

use super::cancel::{Canceller, StopHandle};
use super::reducer;
use super::state::{SessionSnapshot, SessionState, SessionStatus};
use super::transport::{Transport, TransportError};

pub const STREAM_ENDED_EARLY: &str = "pipeline stream ended before completion";

/// Receives read-only views of the session as events are applied.
pub trait SessionObserver {
    /// Called after `event` has been applied to `state`.
    fn on_event(&mut self, event: &PipelineEvent, state: &SessionState);
}

impl SessionObserver for () {
    fn on_event(&mut self, _event: &PipelineEvent, _state: &SessionState) {}
}

/// Why `start` refused to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRejection {
    EmptyIdea,
    AlreadyRunning,
}

/// How a call to [`Session::start`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Nothing happened; the session is unchanged.
    Rejected(StartRejection),
    /// The run ended with this status.
    Finished(SessionStatus),
}

/// How the pump loop stopped reading.
enum PumpExit {
    Ended,
    Cancelled,
}

/// The single validation session: owns the state and the cancellation
/// token of its transport.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    canceller: Canceller,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.canceller.stop_handle()
    }

    /// Back to idle. Invalidates every snapshot taken before.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Cancel any in-flight transport and freeze the session as stopped.
    pub fn stop(&mut self) {
        self.canceller.cancel();
        self.state.mark_stopped();
    }

    /// Run one validation: open `transport` and apply decoded events in
    /// arrival order until the stream ends, fails, or is cancelled.
    ///
    /// Transport failures end up in the session state, not in the return value.
    pub async fn start<T, O>(
        &mut self,
        idea: &str,
        config: RunConfig,
        transport: &T,
        observer: &mut O,
    ) -> StartOutcome
    where
        T: Transport,
        O: SessionObserver,
    {
        if idea.trim().is_empty() {
            return StartOutcome::Rejected(StartRejection::EmptyIdea);
        }
        if self.state.status == SessionStatus::Running {
            return StartOutcome::Rejected(StartRejection::AlreadyRunning);
        }

        self.state.begin(idea, config);
        let request = ValidationRequest::new(idea, &config);
        let token = self.canceller.arm();
        info!(max_iterations = config.max_iterations, "validation started");

        let result = self.pump(transport, &request, &token, observer).await;
        self.canceller.disarm();

        match result {
            Ok(PumpExit::Ended) => {
                if self.state.status == SessionStatus::Running {
                    warn!("{STREAM_ENDED_EARLY}");
                    self.state.fail(STREAM_ENDED_EARLY);
                }
            }
            Ok(PumpExit::Cancelled) | Err(TransportError::Cancelled) => {
                info!("validation stopped by user");
                self.state.mark_stopped();
            }
            Err(e) => {
                warn!(error = %e, "transport failed");
                self.state.fail(e.to_string());
            }
        }

        StartOutcome::Finished(self.state.status)
    }

    async fn pump<T, O>(
        &mut self,
        transport: &T,
        request: &ValidationRequest,
        token: &CancellationToken,
        observer: &mut O,
    ) -> Result<PumpExit, TransportError>
    where
        T: Transport,
        O: SessionObserver,
    {
        let mut chunks = tokio::select! {
            biased;
            () = token.cancelled() => return Ok(PumpExit::Cancelled),
            opened = transport.open(request, token) => opened?,
        };
        let mut decoder = FrameDecoder::new();

        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => return Ok(PumpExit::Cancelled),
                next = chunks.next() => next,
            };
            let Some(chunk) = next else {
                decoder.finish();
                return Ok(PumpExit::Ended);
            };

            for record in decoder.push(&chunk?) {
                if token.is_cancelled() {
                    return Ok(PumpExit::Cancelled);
                }
                let event_type = record.event_type.clone();
                let event = match PipelineEvent::from_record(record) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(%event_type, error = %e, "dropping malformed event");
                        continue;
                    }
                };
                debug!(event = event.event_type(), "applying event");
                reducer::apply(&mut self.state, &event);
                observer.on_event(&event, &self.state);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures::stream;

    use super::*;
    use crate::session::state::STOPPED_BY_USER;
    use crate::session::transport::{ChunkStream, ReplayTransport};

    const RUN: &str = "event: start\ndata: {\"message\": \"Validation started\"}\n\n\
        event: generator\ndata: {\"iteration\": 1, \"idea\": {\"title\": \"A\"}}\n\n\
        event: critic\ndata: {\"score\": 6, \"is_approved\": false, \"feedback\": \"meh\"}\n\n\
        event: generator\ndata: {\"iteration\": 2, \"idea\": {\"title\": \"B\"}}\n\n\
        event: critic\ndata: {\"score\": 9, \"is_approved\": true, \"feedback\": \"wow\"}\n\n\
        event: complete\ndata: {\"message\": \"Validation complete\"}\n\n";

    /// Yields scripted chunks, then either ends, fails, or hangs forever.
    struct Scripted {
        chunks: Vec<&'static str>,
        tail: Tail,
        requests: Arc<Mutex<Vec<ValidationRequest>>>,
    }

    #[derive(Clone, Copy)]
    enum Tail {
        End,
        Fail,
        Hang,
    }

    impl Scripted {
        fn new(chunks: Vec<&'static str>, tail: Tail) -> Self {
            Self {
                chunks,
                tail,
                requests: Arc::default(),
            }
        }
    }

    impl Transport for Scripted {
        async fn open(
            &self,
            request: &ValidationRequest,
            _cancel: &CancellationToken,
        ) -> Result<ChunkStream, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            let head = stream::iter(
                self.chunks
                    .iter()
                    .map(|c| Ok(c.as_bytes().to_vec()))
                    .collect::<Vec<Result<Vec<u8>, TransportError>>>(),
            );
            let tail: ChunkStream = match self.tail {
                Tail::End => stream::empty().boxed(),
                Tail::Fail => stream::once(async {
                    Err(TransportError::Io(std::io::Error::other("connection reset")))
                })
                .boxed(),
                Tail::Hang => stream::pending().boxed(),
            };
            Ok(head.chain(tail).boxed())
        }
    }

    struct FailingOpen;

    impl Transport for FailingOpen {
        async fn open(
            &self,
            _request: &ValidationRequest,
            _cancel: &CancellationToken,
        ) -> Result<ChunkStream, TransportError> {
            Err(TransportError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            })
        }
    }

    /// Records the event types it saw; stops the session after `stop_after` events.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
        stop_after: Option<(usize, StopHandle)>,
    }

    impl SessionObserver for Recorder {
        fn on_event(&mut self, event: &PipelineEvent, _state: &SessionState) {
            self.seen.push(event.event_type().to_string());
            if let Some((n, handle)) = &self.stop_after
                && self.seen.len() == *n
            {
                handle.stop();
            }
        }
    }

    #[tokio::test]
    async fn full_run_completes() {
        let mut session = Session::new();
        let transport = Scripted::new(vec![RUN], Tail::End);
        let outcome = session
            .start("Uber for cats", RunConfig::default(), &transport, &mut ())
            .await;

        assert_eq!(outcome, StartOutcome::Finished(SessionStatus::Complete));
        let state = session.state();
        assert_eq!(state.original_idea, "Uber for cats");
        let numbers: Vec<u64> = state.history.iter().map(|it| it.number).collect();
        assert_eq!(numbers, [1, 2]);
        assert!(state.current.is_blank());
        assert_eq!(state.last_error, None);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].idea, "Uber for cats");
    }

    #[tokio::test]
    async fn chunk_boundaries_do_not_matter() {
        let mut whole = Session::new();
        whole
            .start("idea", RunConfig::default(), &ReplayTransport::from_bytes(RUN), &mut ())
            .await;
        for size in [1, 2, 7, 33] {
            let mut split = Session::new();
            let transport = ReplayTransport::from_bytes(RUN).chunk_size(size);
            split
                .start("idea", RunConfig::default(), &transport, &mut ())
                .await;
            assert_eq!(split.snapshot(), whole.snapshot(), "chunk size {size}");
        }
    }

    #[tokio::test]
    async fn rejects_blank_idea() {
        let mut session = Session::new();
        let transport = Scripted::new(vec![RUN], Tail::End);
        let outcome = session
            .start("   \n", RunConfig::default(), &transport, &mut ())
            .await;
        assert_eq!(outcome, StartOutcome::Rejected(StartRejection::EmptyIdea));
        assert_eq!(session.state().status, SessionStatus::Idle);
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_start_while_running() {
        let mut session = Session::new();
        session.state.status = SessionStatus::Running;
        session.state.original_idea = "first".to_string();
        let transport = Scripted::new(vec![RUN], Tail::End);
        let outcome = session
            .start("second", RunConfig::default(), &transport, &mut ())
            .await;
        assert_eq!(outcome, StartOutcome::Rejected(StartRejection::AlreadyRunning));
        assert_eq!(session.state().original_idea, "first");
    }

    #[tokio::test]
    async fn stop_mid_chunk_ignores_buffered_events() {
        let mut session = Session::new();
        let mut recorder = Recorder {
            stop_after: Some((2, session.stop_handle())),
            ..Recorder::default()
        };
        // Everything arrives in one chunk; the stop lands after `generator`.
        let transport = Scripted::new(vec![RUN], Tail::Hang);
        let outcome = session
            .start("idea", RunConfig::default(), &transport, &mut recorder)
            .await;

        assert_eq!(outcome, StartOutcome::Finished(SessionStatus::Stopped));
        assert_eq!(recorder.seen, ["start", "generator"]);
        let state = session.state();
        assert!(state.history.is_empty());
        assert_eq!(state.current.number, 1);
        assert!(state.current.critique.is_none());
        assert_eq!(state.last_error.as_deref(), Some(STOPPED_BY_USER));
    }

    #[tokio::test]
    async fn stop_while_waiting_for_next_chunk() {
        let mut session = Session::new();
        let handle = session.stop_handle();
        let transport = Scripted::new(
            vec!["event: generator\ndata: {\"iteration\": 1, \"idea\": {\"title\": \"A\"}}\n\n"],
            Tail::Hang,
        );
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            handle.stop()
        });
        let outcome = session
            .start("idea", RunConfig::default(), &transport, &mut ())
            .await;

        assert!(stopper.await.unwrap());
        assert_eq!(outcome, StartOutcome::Finished(SessionStatus::Stopped));
        assert_eq!(session.state().current.number, 1);
    }

    #[tokio::test]
    async fn transport_failure_keeps_partial_state() {
        let mut session = Session::new();
        let transport = Scripted::new(
            vec![
                "event: generator\ndata: {\"iteration\": 1, \"idea\": {\"title\": \"A\"}}\n\n",
                "event: critic\ndata: {\"score\": 3}\n\n",
            ],
            Tail::Fail,
        );
        let outcome = session
            .start("idea", RunConfig::default(), &transport, &mut ())
            .await;

        assert_eq!(outcome, StartOutcome::Finished(SessionStatus::Error));
        let state = session.state();
        assert_eq!(state.last_error.as_deref(), Some("I/O error: connection reset"));
        assert_eq!(state.current.critique.as_ref().map(|c| c.score), Some(3));
    }

    #[tokio::test]
    async fn http_error_status_is_surfaced() {
        let mut session = Session::new();
        let outcome = session
            .start("idea", RunConfig::default(), &FailingOpen, &mut ())
            .await;
        assert_eq!(outcome, StartOutcome::Finished(SessionStatus::Error));
        assert_eq!(session.state().last_error.as_deref(), Some("HTTP error: 502"));
    }

    #[tokio::test]
    async fn stream_ending_early_is_an_error() {
        let mut session = Session::new();
        let transport = Scripted::new(
            vec!["event: generator\ndata: {\"iteration\": 1, \"idea\": {\"title\": \"A\"}}\n\n"],
            Tail::End,
        );
        session
            .start("idea", RunConfig::default(), &transport, &mut ())
            .await;
        let state = session.state();
        assert_eq!(state.status, SessionStatus::Error);
        assert_eq!(state.last_error.as_deref(), Some(STREAM_ENDED_EARLY));
        assert_eq!(state.current.number, 1);
    }

    #[tokio::test]
    async fn pipeline_error_event_is_verbatim() {
        let mut session = Session::new();
        let transport = Scripted::new(
            vec!["event: error\ndata: {\"message\": \"Gemini quota exceeded\"}\n\n"],
            Tail::End,
        );
        let outcome = session
            .start("idea", RunConfig::default(), &transport, &mut ())
            .await;
        assert_eq!(outcome, StartOutcome::Finished(SessionStatus::Error));
        assert_eq!(
            session.state().last_error.as_deref(),
            Some("Gemini quota exceeded")
        );
    }

    #[tokio::test]
    async fn malformed_events_are_skipped() {
        let mut session = Session::new();
        let mut recorder = Recorder::default();
        let transport = Scripted::new(
            vec![
                "event: generator\ndata: {\"idea\": 1}\n\n\
                 event: heartbeat\ndata: {}\n\n\
                 event: complete\ndata: {}\n\n",
            ],
            Tail::End,
        );
        let outcome = session
            .start("idea", RunConfig::default(), &transport, &mut recorder)
            .await;
        assert_eq!(outcome, StartOutcome::Finished(SessionStatus::Complete));
        assert_eq!(recorder.seen, ["heartbeat", "complete"]);
        assert!(session.state().history.is_empty());
    }

    #[tokio::test]
    async fn stop_is_sticky_until_reset() {
        let mut session = Session::new();
        session.stop();
        assert_eq!(session.state().status, SessionStatus::Stopped);

        session.reset();
        assert_eq!(session.state().status, SessionStatus::Idle);
        assert_eq!(session.state().last_error, None);

        let transport = Scripted::new(vec![RUN], Tail::End);
        let outcome = session
            .start("idea", RunConfig::default(), &transport, &mut ())
            .await;
        assert_eq!(outcome, StartOutcome::Finished(SessionStatus::Complete));
    }

    #[tokio::test]
    async fn config_is_copied_at_start() {
        let mut session = Session::new();
        let mut config = RunConfig {
            num_personas: 2,
            ..RunConfig::default()
        };
        let transport = Scripted::new(vec![RUN], Tail::End);
        session.start("idea", config, &transport, &mut ()).await;
        config.num_personas = 5;
        assert_eq!(session.state().config.num_personas, 2);
        assert_eq!(transport.requests.lock().unwrap()[0].num_personas, 2);
    }
}
