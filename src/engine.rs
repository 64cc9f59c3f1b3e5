//! The ensemble engine: drives one session from plan to synthesis.
//!
//! One logical worker per assignment. Workers run concurrently; the budget
//! tracker and the collector are the only shared mutable paths. Per-mode
//! failures flip their own assignment to error and never abort siblings;
//! only the total timeout or an unrecoverable synthesis failure fails the
//! session.

use crate::budget::{BudgetConfig, BudgetTracker};
use crate::capture::{capture_assignment, CapturedOutput, PaneProvider, DEFAULT_SCROLLBACK_LINES};
use crate::collect::OutputCollector;
use crate::error::{Error, Result};
use crate::preset::SynthesisConfig;
use crate::session::{AssignmentStatus, EnsembleSession, ModeAssignment, SessionStatus};
use crate::store::SessionStore;
use crate::synthesis::{
    parse_synthesis_output, SynthesisEngine, SynthesisInput, SynthesisOutcome, SynthesisPrompt,
    SynthesisResult,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// External signal that an agent finished answering in its pane.
#[async_trait]
pub trait AgentWaiter: Send + Sync {
    async fn wait_for_completion(&self, assignment: &ModeAssignment) -> Result<()>;
}

/// External dispatch of a synthesis prompt to a synthesizer agent.
#[async_trait]
pub trait AgentDispatcher: Send + Sync {
    async fn dispatch(&self, prompt: &SynthesisPrompt) -> Result<String>;
}

/// Engine knobs beyond the budget.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub budget: BudgetConfig,
    pub synthesis: SynthesisConfig,
    pub scrollback_lines: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            budget: BudgetConfig::default(),
            synthesis: SynthesisConfig::default(),
            scrollback_lines: DEFAULT_SCROLLBACK_LINES,
        }
    }
}

/// A finished run: the terminal session record and the combined answer.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub session: EnsembleSession,
    pub result: SynthesisResult,
}

/// Drives a single ensemble session.
pub struct EnsembleEngine {
    provider: Arc<dyn PaneProvider>,
    waiter: Arc<dyn AgentWaiter>,
    dispatcher: Option<Arc<dyn AgentDispatcher>>,
    store: Arc<SessionStore>,
    budget: Arc<BudgetTracker>,
    synthesis: SynthesisEngine,
    config: EngineConfig,
}

impl EnsembleEngine {
    pub fn new(
        provider: Arc<dyn PaneProvider>,
        waiter: Arc<dyn AgentWaiter>,
        dispatcher: Option<Arc<dyn AgentDispatcher>>,
        store: Arc<SessionStore>,
        config: EngineConfig,
    ) -> Self {
        let budget = Arc::new(BudgetTracker::new(config.budget.clone()));
        Self {
            provider,
            waiter,
            dispatcher,
            store,
            budget,
            synthesis: SynthesisEngine::default(),
            config,
        }
    }

    pub fn budget(&self) -> &BudgetTracker {
        &self.budget
    }

    /// Run a session to completion under the total timeout.
    ///
    /// The collector is caller-owned so partial outputs survive
    /// cancellation and timeouts.
    #[instrument(skip_all, fields(session = %session.session_name))]
    pub async fn run_session(
        &self,
        mut session: EnsembleSession,
        collector: &mut OutputCollector,
        cancel: CancellationToken,
    ) -> Result<RunOutcome> {
        let total = Duration::from_secs(self.config.budget.total_timeout_secs);
        match tokio::time::timeout(total, self.run_inner(&mut session, collector, cancel)).await {
            Ok(Ok(result)) => Ok(RunOutcome { session, result }),
            Ok(Err(e)) => {
                session.fail(e.to_string());
                self.store.save(&session)?;
                Err(e)
            }
            Err(_) => {
                let e = Error::timeout("session total", total.as_millis() as u64);
                session.fail(e.to_string());
                self.store.save(&session)?;
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        session: &mut EnsembleSession,
        collector: &mut OutputCollector,
        cancel: CancellationToken,
    ) -> Result<SynthesisResult> {
        self.store.save(session)?;
        session.transition(SessionStatus::Injecting)?;
        self.store.save(session)?;
        session.transition(SessionStatus::Active)?;
        self.store.save(session)?;

        self.run_workers(session, collector, &cancel).await?;

        if cancel.is_cancelled() {
            return Err(Error::cancelled("session cancelled while capturing"));
        }

        session.transition(SessionStatus::Synthesizing)?;
        self.store.save(session)?;

        let collection = collector.collect()?;
        info!(
            valid = collection.valid_count,
            invalid = collection.invalid_count,
            "collected mode outputs"
        );

        let input = SynthesisInput {
            question: session.question.clone(),
            outputs: collection.outputs,
            strategy: session.synthesis_strategy.clone(),
            config: self.config.synthesis.clone(),
        };
        let result = self.synthesize(&input, &cancel).await?;

        session.final_synthesis = Some(result.summary.clone());
        session.transition(SessionStatus::Complete)?;
        self.store.save(session)?;
        Ok(result)
    }

    /// Spawn one worker per assignment and fold captures into the
    /// collector as they land.
    async fn run_workers(
        &self,
        session: &mut EnsembleSession,
        collector: &mut OutputCollector,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let (capture_tx, mut capture_rx) = mpsc::channel::<CapturedOutput>(session.assignments.len().max(1));
        let mut workers: JoinSet<(String, Result<usize>)> = JoinSet::new();

        for assignment in session.assignments.clone() {
            let provider = Arc::clone(&self.provider);
            let waiter = Arc::clone(&self.waiter);
            let store = Arc::clone(&self.store);
            let budget = Arc::clone(&self.budget);
            let cancel = cancel.clone();
            let capture_tx = capture_tx.clone();
            let session_name = session.session_name.clone();
            let per_mode = Duration::from_secs(self.config.budget.timeout_per_mode_secs);
            let lines = self.config.scrollback_lines;
            let max_retries = self.config.budget.max_retries;

            workers.spawn(async move {
                let mode_id = assignment.mode_id.clone();
                let outcome = run_worker(
                    provider, waiter, store, budget, cancel, capture_tx, session_name,
                    assignment, per_mode, lines, max_retries,
                )
                .await;
                (mode_id, outcome)
            });
        }
        drop(capture_tx);

        // Drain captures while workers finish; neither side blocks the
        // other for long because the channel is sized to the worker count.
        let mut results: Vec<(String, Result<usize>)> = Vec::new();
        loop {
            tokio::select! {
                capture = capture_rx.recv() => {
                    match capture {
                        Some(capture) => collector.collect_from_captures(&[capture])?,
                        None => break,
                    }
                }
                joined = workers.join_next() => {
                    match joined {
                        Some(Ok(result)) => results.push(result),
                        Some(Err(e)) => return Err(Error::Internal(format!("worker panicked: {}", e))),
                        None => {}
                    }
                }
            }
        }
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => return Err(Error::Internal(format!("worker panicked: {}", e))),
            }
        }

        for (mode_id, outcome) in results {
            let assignment = session
                .assignment_mut(&mode_id)
                .ok_or_else(|| Error::Internal(format!("unknown worker mode {}", mode_id)))?;
            match outcome {
                Ok(tokens) => {
                    assignment.status = AssignmentStatus::Done;
                    assignment.completed_at = Some(chrono::Utc::now());
                    debug!(mode = %mode_id, tokens, "assignment done");
                }
                Err(e) => {
                    warn!(mode = %mode_id, error = %e, "assignment failed");
                    assignment.fail(e.to_string());
                }
            }
        }
        self.store.save(session)?;
        Ok(())
    }

    async fn synthesize(
        &self,
        input: &SynthesisInput,
        cancel: &CancellationToken,
    ) -> Result<SynthesisResult> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled("session cancelled before synthesis"));
        }

        match self.synthesis.synthesize(input)? {
            SynthesisOutcome::Completed(result) => Ok(result),
            SynthesisOutcome::AgentPrompt(prompt) => {
                let Some(dispatcher) = &self.dispatcher else {
                    // No synthesizer agent wired in; the manual path is
                    // always available.
                    warn!(
                        strategy = %prompt.strategy,
                        "no dispatcher configured; falling back to manual synthesis"
                    );
                    return self.mechanical_fallback(input);
                };

                let prompt_tokens =
                    crate::capture::estimate_tokens(&prompt.prompt, crate::capture::ContentHint::Markdown);
                let decision = self.budget.record_spend("synthesizer", prompt_tokens as u64);
                if !decision.allowed {
                    warn!(reason = ?decision.reason, "synthesis prompt over budget");
                }

                let reply = tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(Error::cancelled("session cancelled during synthesis"));
                    }
                    reply = dispatcher.dispatch(&prompt) => reply?,
                };
                match parse_synthesis_output(&reply) {
                    Ok(result) => Ok(result),
                    Err(e) => {
                        warn!(error = %e, "synthesizer reply unparseable; using manual fallback");
                        self.mechanical_fallback(input)
                    }
                }
            }
        }
    }

    fn mechanical_fallback(&self, input: &SynthesisInput) -> Result<SynthesisResult> {
        let mut fallback = input.clone();
        fallback.strategy = "manual".to_string();
        match self.synthesis.synthesize(&fallback)? {
            SynthesisOutcome::Completed(result) => Ok(result),
            SynthesisOutcome::AgentPrompt(_) => {
                Err(Error::synthesis("manual strategy unexpectedly required an agent"))
            }
        }
    }
}

/// One worker: wait for the agent, capture its pane, account the spend.
/// Returns the token estimate of the capture.
#[allow(clippy::too_many_arguments)]
async fn run_worker(
    provider: Arc<dyn PaneProvider>,
    waiter: Arc<dyn AgentWaiter>,
    store: Arc<SessionStore>,
    budget: Arc<BudgetTracker>,
    cancel: CancellationToken,
    capture_tx: mpsc::Sender<CapturedOutput>,
    session_name: String,
    assignment: ModeAssignment,
    per_mode: Duration,
    lines: usize,
    max_retries: u32,
) -> Result<usize> {
    store.update_assignment_status(&session_name, &assignment.mode_id, AssignmentStatus::Active)?;

    let waited = tokio::select! {
        _ = cancel.cancelled() => {
            return Err(Error::cancelled(format!("assignment {} cancelled", assignment.mode_id)));
        }
        waited = tokio::time::timeout(per_mode, waiter.wait_for_completion(&assignment)) => waited,
    };
    match waited {
        Err(_) => {
            return Err(Error::timeout(
                format!("mode {}", assignment.mode_id),
                per_mode.as_millis() as u64,
            ));
        }
        Ok(Err(e)) => return Err(e),
        Ok(Ok(())) => {}
    }

    let mut attempt = 0u32;
    let capture = loop {
        match capture_assignment(provider.as_ref(), &assignment, lines).await {
            Ok(capture) => break capture,
            Err(e) if attempt < max_retries && !cancel.is_cancelled() => {
                attempt += 1;
                warn!(
                    mode = %assignment.mode_id,
                    attempt,
                    error = %e,
                    "capture failed, retrying"
                );
            }
            Err(e) => return Err(e),
        }
    };
    let tokens = capture.token_estimate;

    let decision = budget.record_spend(&assignment.mode_id, tokens as u64);
    if !decision.allowed {
        warn!(
            mode = %assignment.mode_id,
            reason = ?decision.reason,
            "capture exceeded budget"
        );
    }

    // Preserved even if the session is cancelled right after.
    let _ = capture_tx.send(capture).await;
    Ok(tokens)
}
