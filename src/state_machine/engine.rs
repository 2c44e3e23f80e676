//! # FSM Engine
//!
//! Workflow-agnostic engine that evaluates a [`TransitionTable`] against incoming events.
//!
//! Every `process_event*` and `reset*` call takes the same per-instance async mutex, so at
//! most one transition attempt is in flight at a time. A voice turn and an asynchronously
//! delivered external signal racing on one instance are applied one after the other, each
//! against the state the previous one committed.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::actions::ActionOutput;
use super::errors::StateMachineResult;
use super::transition::{TransitionTable, WorkflowEvent, WorkflowState};

/// Why an event did not move the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// No row exists for the current state and event tag
    NoTransition,
    /// Rows exist but every guard evaluated false
    GuardsRejected,
    /// The event id was already processed since the last reset
    DuplicateEvent,
    /// The event was meant for a run that has since been reset
    Superseded,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTransition => write!(f, "no_transition"),
            Self::GuardsRejected => write!(f, "guards_rejected"),
            Self::DuplicateEvent => write!(f, "duplicate_event"),
            Self::Superseded => write!(f, "superseded"),
        }
    }
}

/// Result of a transition attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome<S, M> {
    Accepted {
        from: S,
        to: S,
        /// Prompt retained after the transition committed
        prompt: String,
        messages: Vec<M>,
    },
    /// State and context were left untouched
    Rejected { state: S, reason: RejectionReason },
}

impl<S: Copy, M> TransitionOutcome<S, M> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// State the machine is in after the attempt
    pub fn state(&self) -> S {
        match self {
            Self::Accepted { to, .. } => *to,
            Self::Rejected { state, .. } => *state,
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        match self {
            Self::Accepted { prompt, .. } => Some(prompt),
            Self::Rejected { .. } => None,
        }
    }

    pub fn messages(&self) -> &[M] {
        match self {
            Self::Accepted { messages, .. } => messages,
            Self::Rejected { .. } => &[],
        }
    }
}

/// Point-in-time copy of the engine's state, context and retained prompt
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot<S, C> {
    pub state: S,
    pub context: C,
    pub prompt: String,
    /// Bumped by every reset
    pub generation: u64,
}

struct EngineInner<S, C> {
    state: S,
    context: C,
    prompt: String,
    processed_events: HashSet<String>,
    generation: u64,
}

/// Generic guarded finite-state-machine engine
pub struct FsmEngine<S, E: WorkflowEvent, C, M> {
    name: &'static str,
    initial_state: S,
    table: Arc<TransitionTable<S, E, C, M>>,
    inner: Mutex<EngineInner<S, C>>,
}

impl<S, E, C, M> FsmEngine<S, E, C, M>
where
    S: WorkflowState,
    E: WorkflowEvent,
    C: Clone + Send,
    M: Send,
{
    pub fn new(
        name: &'static str,
        initial_state: S,
        table: Arc<TransitionTable<S, E, C, M>>,
        context: C,
    ) -> Self {
        debug!(machine = name, state = %initial_state, transitions = table.len(), "Engine initialized");

        Self {
            name,
            initial_state,
            table,
            inner: Mutex::new(EngineInner {
                state: initial_state,
                context,
                prompt: String::new(),
                processed_events: HashSet::new(),
                generation: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Submit one event.
    ///
    /// Returns `Err` only when an action fails; state and context are unchanged in that case.
    pub async fn process_event(&self, event: &E) -> StateMachineResult<TransitionOutcome<S, M>> {
        let mut inner = self.inner.lock().await;
        self.apply(&mut inner, event)
    }

    /// Submit an event carrying an idempotency id. A repeated id is rejected without
    /// evaluating the table.
    pub async fn process_event_once(
        &self,
        event: &E,
        event_id: &str,
    ) -> StateMachineResult<TransitionOutcome<S, M>> {
        let mut inner = self.inner.lock().await;

        if !inner.processed_events.insert(event_id.to_string()) {
            debug!(machine = self.name, event_id, "Duplicate event ignored");
            return Ok(TransitionOutcome::Rejected {
                state: inner.state,
                reason: RejectionReason::DuplicateEvent,
            });
        }

        self.apply(&mut inner, event)
    }

    /// Submit an event decided against the snapshot taken at `generation`. If the engine
    /// was reset since, the event is rejected as superseded.
    pub async fn process_event_at(
        &self,
        generation: u64,
        event: &E,
    ) -> StateMachineResult<TransitionOutcome<S, M>> {
        let mut inner = self.inner.lock().await;

        if inner.generation != generation {
            debug!(machine = self.name, generation, current = inner.generation, "Superseded event ignored");
            return Ok(TransitionOutcome::Rejected {
                state: inner.state,
                reason: RejectionReason::Superseded,
            });
        }

        self.apply(&mut inner, event)
    }

    /// Force the initial state with a fresh context, clearing the retained prompt and the
    /// processed event ids.
    pub async fn reset(&self, context: C) {
        let mut inner = self.inner.lock().await;
        self.reset_inner(&mut inner, context);
    }

    /// Reset and submit `event` without releasing the lock in between, so no other caller
    /// can observe the bare initial state.
    pub async fn reset_with(
        &self,
        context: C,
        event: &E,
    ) -> StateMachineResult<TransitionOutcome<S, M>> {
        let mut inner = self.inner.lock().await;
        self.reset_inner(&mut inner, context);
        self.apply(&mut inner, event)
    }

    pub async fn current_state(&self) -> S {
        self.inner.lock().await.state
    }

    /// Prompt produced by the most recent successful action
    pub async fn current_prompt(&self) -> String {
        self.inner.lock().await.prompt.clone()
    }

    pub async fn context(&self) -> C {
        self.inner.lock().await.context.clone()
    }

    pub async fn snapshot(&self) -> EngineSnapshot<S, C> {
        let inner = self.inner.lock().await;
        EngineSnapshot {
            state: inner.state,
            context: inner.context.clone(),
            prompt: inner.prompt.clone(),
            generation: inner.generation,
        }
    }

    fn reset_inner(&self, inner: &mut EngineInner<S, C>, context: C) {
        inner.state = self.initial_state;
        inner.context = context;
        inner.prompt.clear();
        inner.processed_events.clear();
        inner.generation += 1;
        info!(machine = self.name, state = %self.initial_state, "Reset to initial state");
    }

    fn apply(
        &self,
        inner: &mut EngineInner<S, C>,
        event: &E,
    ) -> StateMachineResult<TransitionOutcome<S, M>> {
        let from = inner.state;
        let kind = event.kind();
        let candidates = self.table.candidates(from, kind);

        if candidates.is_empty() {
            warn!(machine = self.name, state = %from, event = %kind, "Ignored event with no transition");
            return Ok(TransitionOutcome::Rejected {
                state: from,
                reason: RejectionReason::NoTransition,
            });
        }

        let Some(transition) = candidates
            .iter()
            .find(|row| row.permits(&inner.context, event))
        else {
            warn!(machine = self.name, state = %from, event = %kind, "Guards rejected event");
            return Ok(TransitionOutcome::Rejected {
                state: from,
                reason: RejectionReason::GuardsRejected,
            });
        };

        // Actions work on a scratch copy so a failure leaves the committed context intact
        let mut scratch = inner.context.clone();
        let mut output = ActionOutput::silent();

        if let Some(action) = &transition.action {
            output = action.execute(&mut scratch, event).inspect_err(|err| {
                error!(
                    machine = self.name,
                    state = %from,
                    event = %kind,
                    action = action.description(),
                    error = %err,
                    "Transition action failed"
                );
            })?;
        }

        if let Some(entry) = self.table.entry_action(transition.target) {
            let entered = entry.execute(&mut scratch, event).inspect_err(|err| {
                error!(
                    machine = self.name,
                    state = %transition.target,
                    action = entry.description(),
                    error = %err,
                    "Entry action failed"
                );
            })?;
            output.merge(entered);
        }

        inner.context = scratch;
        inner.state = transition.target;
        if let Some(prompt) = output.prompt {
            inner.prompt = prompt;
        }

        info!(
            machine = self.name,
            from = %from,
            to = %transition.target,
            event = %kind,
            guard = transition.guard_description(),
            "Transition committed"
        );

        Ok(TransitionOutcome::Accepted {
            from,
            to: transition.target,
            prompt: inner.prompt.clone(),
            messages: output.messages,
        })
    }
}
