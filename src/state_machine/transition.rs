use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use super::actions::StateAction;
use super::errors::{StateMachineError, StateMachineResult};
use super::guards::StateGuard;

/// A closed set of workflow states
pub trait WorkflowState:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

impl<T> WorkflowState for T where
    T: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

/// A classified input. Transitions are keyed by the event's payload-free tag.
pub trait WorkflowEvent: fmt::Debug + Send + Sync {
    type Kind: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Tag used to look up candidate transitions
    fn kind(&self) -> Self::Kind;
}

/// One row of a transition table
pub struct Transition<S, E: WorkflowEvent, C, M> {
    pub source: S,
    pub event: E::Kind,
    pub guard: Option<Arc<dyn StateGuard<C, E>>>,
    pub action: Option<Arc<dyn StateAction<C, E, M>>>,
    pub target: S,
}

impl<S, E, C, M> Transition<S, E, C, M>
where
    S: WorkflowState,
    E: WorkflowEvent,
{
    pub fn new(source: S, event: E::Kind, target: S) -> Self {
        Self {
            source,
            event,
            guard: None,
            action: None,
            target,
        }
    }

    pub fn guarded_by(mut self, guard: impl StateGuard<C, E> + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    pub fn with_action(mut self, action: impl StateAction<C, E, M> + 'static) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    /// Whether this row applies to the given context and event
    pub fn permits(&self, context: &C, event: &E) -> bool {
        self.guard
            .as_ref()
            .map_or(true, |guard| guard.check(context, event))
    }

    pub fn guard_description(&self) -> Option<&'static str> {
        self.guard.as_ref().map(|guard| guard.description())
    }
}

impl<S: fmt::Debug, E: WorkflowEvent, C, M> fmt::Debug for Transition<S, E, C, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("source", &self.source)
            .field("event", &self.event)
            .field("guard", &self.guard.as_ref().map(|g| g.description()))
            .field("action", &self.action.as_ref().map(|a| a.description()))
            .field("target", &self.target)
            .finish()
    }
}

/// Immutable transition table, built once per workflow definition.
///
/// Rows sharing a `(source, event)` key are kept in declaration order; the engine applies
/// the first row whose guard passes.
pub struct TransitionTable<S, E: WorkflowEvent, C, M> {
    rows: HashMap<(S, E::Kind), Vec<Transition<S, E, C, M>>>,
    entry_actions: HashMap<S, Arc<dyn StateAction<C, E, M>>>,
}

impl<S, E, C, M> TransitionTable<S, E, C, M>
where
    S: WorkflowState,
    E: WorkflowEvent,
{
    pub fn builder() -> TransitionTableBuilder<S, E, C, M> {
        TransitionTableBuilder {
            transitions: Vec::new(),
            entry_actions: HashMap::new(),
        }
    }

    /// Rows matching a state and event tag, in declaration order
    pub fn candidates(&self, state: S, event: E::Kind) -> &[Transition<S, E, C, M>] {
        self.rows
            .get(&(state, event))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Action run whenever `state` is entered through a transition
    pub fn entry_action(&self, state: S) -> Option<&Arc<dyn StateAction<C, E, M>>> {
        self.entry_actions.get(&state)
    }

    /// Total number of rows
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub struct TransitionTableBuilder<S, E: WorkflowEvent, C, M> {
    transitions: Vec<Transition<S, E, C, M>>,
    entry_actions: HashMap<S, Arc<dyn StateAction<C, E, M>>>,
}

impl<S, E, C, M> TransitionTableBuilder<S, E, C, M>
where
    S: WorkflowState,
    E: WorkflowEvent,
{
    pub fn transition(mut self, transition: Transition<S, E, C, M>) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn on_enter(mut self, state: S, action: impl StateAction<C, E, M> + 'static) -> Self {
        self.entry_actions.insert(state, Arc::new(action));
        self
    }

    /// Finish the table.
    ///
    /// Fails when an unguarded row is followed by another row for the same key, since
    /// first-match-wins would make the later row unreachable.
    pub fn build(self) -> StateMachineResult<TransitionTable<S, E, C, M>> {
        let mut rows: HashMap<(S, E::Kind), Vec<Transition<S, E, C, M>>> = HashMap::new();

        for transition in self.transitions {
            let key = (transition.source, transition.event);
            let existing = rows.entry(key).or_default();

            if existing.iter().any(|row| row.guard.is_none()) {
                return Err(StateMachineError::InvalidTransition {
                    from: transition.source.to_string(),
                    event: transition.event.to_string(),
                });
            }

            existing.push(transition);
        }

        Ok(TransitionTable {
            rows,
            entry_actions: self.entry_actions,
        })
    }
}
