// Generic state machine engine
//
// Workflow-agnostic pieces: the transition table, guard and action traits, and the
// serialized engine that evaluates them. Concrete workflows live in their own modules.

pub mod actions;
pub mod engine;
pub mod errors;
pub mod guards;
pub mod transition;

// Re-export main types for convenient access
pub use actions::{ActionOutput, StateAction};
pub use engine::{EngineSnapshot, FsmEngine, RejectionReason, TransitionOutcome};
pub use errors::{ActionError, ActionResult, StateMachineError, StateMachineResult};
pub use guards::{FnGuard, StateGuard};
pub use transition::{Transition, TransitionTable, WorkflowEvent, WorkflowState};
