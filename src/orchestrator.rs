//! Conversation orchestrator.
//!
//! Owns the session and runs one turn at a time:
//!
//! ```text
//! Idle → Classifying ─┬─ general_query ─────────────────────────────→ Generating → Idle
//!                     └─ retrieve_files → Retrieving → MergingFiles ─→ Generating → Idle
//! ```
//!
//! Any stage error ends the turn with [`FALLBACK_REPLY`] appended to the
//! history. The input-disabled flag is held for the whole turn and released
//! on every exit path.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::metrics;
use crate::models::{FileSet, Intent, Message, SessionState};
use crate::pipeline::merger::pending;
use crate::pipeline::TurnPipeline;
use crate::Result;

/// Assistant reply appended when a turn fails.
pub const FALLBACK_REPLY: &str = "An error occurred while processing your request.";

/// Stage a turn is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TurnState {
    Idle = 0,
    Classifying = 1,
    Retrieving = 2,
    MergingFiles = 3,
    Generating = 4,
    Interpreting = 5,
}

impl TurnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::Classifying => "classifying",
            TurnState::Retrieving => "retrieving",
            TurnState::MergingFiles => "merging_files",
            TurnState::Generating => "generating",
            TurnState::Interpreting => "interpreting",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => TurnState::Classifying,
            2 => TurnState::Retrieving,
            3 => TurnState::MergingFiles,
            4 => TurnState::Generating,
            5 => TurnState::Interpreting,
            _ => TurnState::Idle,
        }
    }
}

/// Why a submission did not start a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    TurnInProgress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing changed.
    Ignored(IgnoreReason),
    /// The reply was appended to the history.
    Answered { intent: Intent, reply: String },
    /// [`FALLBACK_REPLY`] was appended; `error` is the logged cause.
    Failed { error: String },
}

impl TurnOutcome {
    fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Ignored(_) => "ignored",
            TurnOutcome::Answered { .. } => "answered",
            TurnOutcome::Failed { .. } => "failed",
        }
    }
}

/// Clears the busy flag and resets the state when the turn ends, however it ends.
struct TurnGuard<'a> {
    busy: &'a AtomicBool,
    state: &'a AtomicU8,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.state.store(TurnState::Idle as u8, Ordering::Release);
        self.busy.store(false, Ordering::Release);
    }
}

pub struct Orchestrator<P> {
    pipeline: P,
    session: RwLock<SessionState>,
    input_disabled: AtomicBool,
    state: AtomicU8,
}

impl<P: TurnPipeline> Orchestrator<P> {
    pub fn new(pipeline: P) -> Self {
        Self::with_session(pipeline, SessionState::new())
    }

    pub fn with_session(pipeline: P, session: SessionState) -> Self {
        Self {
            pipeline,
            session: RwLock::new(session),
            input_disabled: AtomicBool::new(false),
            state: AtomicU8::new(TurnState::Idle as u8),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// True while a turn is running; the input control must stay disabled.
    pub fn is_input_disabled(&self) -> bool {
        self.input_disabled.load(Ordering::Acquire)
    }

    pub fn turn_state(&self) -> TurnState {
        TurnState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub async fn snapshot(&self) -> SessionState {
        self.session.read().await.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.session.read().await.messages.clone()
    }

    pub async fn files(&self) -> FileSet {
        self.session.read().await.files.clone()
    }

    /// Run one turn for `input`.
    ///
    /// Blank input and submissions made while a turn is running are ignored
    /// without touching the session.
    pub async fn submit(&self, input: &str) -> TurnOutcome {
        if input.trim().is_empty() {
            metrics::record_turn_ignored();
            return TurnOutcome::Ignored(IgnoreReason::EmptyInput);
        }
        if self
            .input_disabled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Submission ignored: a turn is already in progress");
            metrics::record_turn_ignored();
            return TurnOutcome::Ignored(IgnoreReason::TurnInProgress);
        }
        let _guard = TurnGuard {
            busy: &self.input_disabled,
            state: &self.state,
        };

        let started = Instant::now();
        metrics::record_turn_start();

        let history = {
            let mut session = self.session.write().await;
            session.messages.push(Message::user(input));
            session.messages.clone()
        };

        let outcome = match self.run_turn(&history, input).await {
            Ok((intent, reply)) => TurnOutcome::Answered { intent, reply },
            Err(err) => {
                error!(error = %err, "Turn failed");
                self.session
                    .write()
                    .await
                    .messages
                    .push(Message::assistant(FALLBACK_REPLY));
                TurnOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };

        let elapsed = started.elapsed();
        metrics::record_turn_result(outcome.label(), elapsed);
        info!(
            outcome = outcome.label(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Turn finished"
        );
        outcome
    }

    async fn run_turn(&self, history: &[Message], input: &str) -> Result<(Intent, String)> {
        let intent = self
            .stage(TurnState::Classifying, self.pipeline.classify_intent(history))
            .await?;

        if intent == Intent::RetrieveFiles {
            let relevant = self
                .stage(TurnState::Retrieving, self.pipeline.retrieve_documents(input))
                .await?;

            self.enter(TurnState::MergingFiles);
            let existing = self.session.read().await.files.clone();
            let to_fetch = pending(&relevant, &existing);
            if to_fetch.is_empty() {
                info!(relevant = relevant.len(), "All relevant files already held");
            } else {
                let all_files = self
                    .stage(
                        TurnState::MergingFiles,
                        self.pipeline.fetch_files(&to_fetch, &existing),
                    )
                    .await?;
                self.session.write().await.files = all_files;
            }
        }

        let files = self.session.read().await.files.clone();
        let reply = self
            .stage(
                TurnState::Generating,
                self.pipeline.generate_response(history, &files),
            )
            .await?;
        self.session
            .write()
            .await
            .messages
            .push(Message::assistant(reply.clone()));

        if self.pipeline.interpreter_enabled() {
            let execution = self
                .stage(TurnState::Interpreting, self.pipeline.interpret_code(input))
                .await?;
            self.session
                .write()
                .await
                .messages
                .push(Message::assistant(execution.render()));
        }

        Ok((intent, reply))
    }

    fn enter(&self, state: TurnState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Run one stage call, tracking state, timing and status.
    async fn stage<T>(&self, state: TurnState, call: impl Future<Output = Result<T>>) -> Result<T> {
        self.enter(state);
        let started = Instant::now();
        let result = call.await;
        metrics::record_stage(state.as_str(), started.elapsed(), result.is_ok());
        if let Err(err) = &result {
            warn!(stage = state.as_str(), error = %err, "Stage failed");
        }
        result
    }
}
