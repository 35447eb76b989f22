use crate::lexer::Token;
use compact_str::CompactString;

/// A recognizer event, for debugging and tracing.
///
/// Delivered only to the handler given to [`super::Parser::parse_traced`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    /// Entered a rule at the given token index.
    EnterRule { rule: CompactString, index: usize },
    /// Left a rule; `error` if a recognition error was raised inside it.
    ExitRule { rule: CompactString, error: bool },
    /// Prediction chose `alt` at `decision` after `lookahead` tokens.
    Predict {
        decision: usize,
        alt: usize,
        lookahead: usize,
    },
    /// Several alternatives were viable; the lowest was taken.
    AmbiguityResolved {
        decision: usize,
        alts: Vec<usize>,
        chosen: usize,
    },
    /// Consumed a token; `error` if recovery discarded it.
    Consume { token: Token, error: bool },
    /// Recovery conjured a token for missing input.
    Conjure { token: Token },
    /// Entered error recovery mode at the offending token.
    BeginRecovery { token: Token },
    /// A token was matched after recovery.
    EndRecovery,
    /// Panic-mode recovery discarded `skipped` tokens.
    Resync { skipped: usize },
}

/// Receives recognizer events.
pub trait EventHandler: Send {
    fn handle(&mut self, event: &RecognizerEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventHandler;

impl EventHandler for NullEventHandler {
    fn handle(&mut self, _event: &RecognizerEvent) {}
}

/// Keeps every event, in order.
#[derive(Debug, Default, Clone)]
pub struct EventCollector {
    pub events: Vec<RecognizerEvent>,
}

impl EventCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ambiguity events only.
    pub fn ambiguities(&self) -> impl Iterator<Item = &RecognizerEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, RecognizerEvent::AmbiguityResolved { .. }))
    }
}

impl EventHandler for EventCollector {
    fn handle(&mut self, event: &RecognizerEvent) {
        self.events.push(event.clone());
    }
}
