use super::errors::ActionResult;

/// What a successful action hands back to the engine: the prompt to speak next (retained
/// for reprompting) and any outbound messages to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutput<M> {
    pub prompt: Option<String>,
    pub messages: Vec<M>,
}

impl<M> ActionOutput<M> {
    /// Output carrying only a prompt
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            prompt: Some(text.into()),
            messages: Vec::new(),
        }
    }

    /// Output carrying only a message
    pub fn message(message: M) -> Self {
        Self {
            prompt: None,
            messages: vec![message],
        }
    }

    /// Output with nothing to say or publish
    pub fn silent() -> Self {
        Self {
            prompt: None,
            messages: Vec::new(),
        }
    }

    /// Attach an outbound message
    pub fn with_message(mut self, message: M) -> Self {
        self.messages.push(message);
        self
    }

    /// Fold a later output into this one. A later prompt wins; messages keep their order.
    pub fn merge(&mut self, later: ActionOutput<M>) {
        if later.prompt.is_some() {
            self.prompt = later.prompt;
        }
        self.messages.extend(later.messages);
    }
}

impl<M> Default for ActionOutput<M> {
    fn default() -> Self {
        Self::silent()
    }
}

/// Trait for implementing state transition actions
///
/// Actions run under the engine lock against a scratch copy of the context. If an action
/// fails, the copy is discarded and neither state nor context change.
pub trait StateAction<C, E, M>: Send + Sync {
    /// Execute the action
    fn execute(&self, context: &mut C, event: &E) -> ActionResult<ActionOutput<M>>;

    /// Get a description of this action for logging
    fn description(&self) -> &'static str;
}
