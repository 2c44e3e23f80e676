/// Trait for implementing state transition guards
///
/// Guards are pure predicates: they read the workflow context and the incoming event and
/// never mutate either. The engine consults them in declaration order.
pub trait StateGuard<C, E>: Send + Sync {
    /// Check if a transition is allowed
    fn check(&self, context: &C, event: &E) -> bool;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Guard built from a closure, handy for small workflows and tests
pub struct FnGuard<F> {
    description: &'static str,
    predicate: F,
}

impl<F> FnGuard<F> {
    pub fn new(description: &'static str, predicate: F) -> Self {
        Self {
            description,
            predicate,
        }
    }
}

impl<C, E, F> StateGuard<C, E> for FnGuard<F>
where
    F: Fn(&C, &E) -> bool + Send + Sync,
{
    fn check(&self, context: &C, event: &E) -> bool {
        (self.predicate)(context, event)
    }

    fn description(&self) -> &'static str {
        self.description
    }
}
