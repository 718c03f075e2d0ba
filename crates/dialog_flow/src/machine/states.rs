//! States - named units of dispatch logic in the conversation graph.
//!
//! A state is immutable once constructed and side-effect-free to invoke
//! repeatedly: literal transitions are handed out as independent copies,
//! handler functions own their captured environment behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dialog_core::{Event, FlowError, Transition, CORE_PLATFORM};

use super::{DIE_STATE, ENTRY_STATE};

/// Behavior attached to a named state.
#[async_trait]
pub trait StateHandler: Send + Sync {
    /// Evaluate the state for an event.
    ///
    /// `Ok(None)` means "unhandled by this state"; it is not an error and
    /// triggers the machine's entry-fallback and unhandled protocols.
    async fn handle(&self, event: &dyn Event) -> Result<Option<Transition>, FlowError>;
}

/// Destination entry in a declarative intent map.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionTarget {
    /// Name of the destination state. May alias another key of the same
    /// map, in which case the lookup follows the alias chain.
    Name(String),
    /// Inline transition, handed out as an independent copy on every
    /// lookup.
    Inline(Transition),
}

/// Behavior body of a state, fixed at construction.
enum StateBehavior {
    /// Enter functions keyed by intent name; the `"entry"` key is the
    /// generic fallback for intents without a dedicated handler. Terminal
    /// states carry an empty map and never produce a transition.
    Handlers(HashMap<String, Arc<dyn StateHandler>>),
    /// A fixed transition returned for any intent.
    Literal(Transition),
    /// Declarative intent -> destination map, resolved by the machine's
    /// simple-transition lookup (which needs the core-table fallback).
    Map(HashMap<String, TransitionTarget>),
}

/// An immutable, named unit of behavior bound to a platform scope.
///
/// States default to the `"core"` platform; [`State::on_platform`] rebinds
/// one as an overlay shadowing the same-named core state for that channel.
pub struct State {
    name: String,
    platform: String,
    intents: Vec<String>,
    is_terminal: bool,
    behavior: StateBehavior,
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("platform", &self.platform)
            .field("is_terminal", &self.is_terminal)
            .finish()
    }
}

impl State {
    fn from_behavior(name: String, behavior: StateBehavior) -> Self {
        let is_terminal = name == DIE_STATE;
        Self {
            name,
            platform: CORE_PLATFORM.to_string(),
            intents: Vec::new(),
            is_terminal,
            behavior,
        }
    }

    /// State with a single generic enter function.
    pub fn handler(name: impl Into<String>, handler: Arc<dyn StateHandler>) -> Self {
        let mut handlers: HashMap<String, Arc<dyn StateHandler>> = HashMap::new();
        handlers.insert(ENTRY_STATE.to_string(), handler);
        Self::from_behavior(name.into(), StateBehavior::Handlers(handlers))
    }

    /// State with per-intent enter functions. The `"entry"` key, when
    /// present, handles intents without a dedicated function.
    pub fn intent_handlers(
        name: impl Into<String>,
        handlers: HashMap<String, Arc<dyn StateHandler>>,
    ) -> Self {
        Self::from_behavior(name.into(), StateBehavior::Handlers(handlers))
    }

    /// State that yields a fixed transition regardless of intent.
    pub fn literal(name: impl Into<String>, transition: Transition) -> Self {
        Self::from_behavior(name.into(), StateBehavior::Literal(transition))
    }

    /// State with a declarative intent -> destination map.
    pub fn map(name: impl Into<String>, map: HashMap<String, TransitionTarget>) -> Self {
        Self::from_behavior(name.into(), StateBehavior::Map(map))
    }

    /// Terminal state with no behavior of its own.
    pub fn terminal(name: impl Into<String>) -> Self {
        let mut state = Self::from_behavior(name.into(), StateBehavior::Handlers(HashMap::new()));
        state.is_terminal = true;
        state
    }

    /// Rebind this state to a platform overlay scope.
    pub fn on_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Declare the intents this state is registered for.
    pub fn with_intents(mut self, intents: Vec<String>) -> Self {
        self.intents = intents;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn intents(&self) -> &[String] {
        &self.intents
    }

    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    /// Declarative map of this state, if it carries one.
    pub(crate) fn simple_map(&self) -> Option<&HashMap<String, TransitionTarget>> {
        match &self.behavior {
            StateBehavior::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Dispatch an enter function or a literal transition.
    ///
    /// Priority: the per-intent function for `event.intent_name()`, else
    /// the generic `"entry"` function, else the literal transition. Map
    /// states return `None` here; the machine resolves them through the
    /// simple-transition lookup instead.
    pub(crate) async fn dispatch(
        &self,
        event: &dyn Event,
    ) -> Result<Option<Transition>, FlowError> {
        match &self.behavior {
            StateBehavior::Handlers(handlers) => {
                let handler = handlers
                    .get(event.intent_name())
                    .or_else(|| handlers.get(ENTRY_STATE));
                match handler {
                    Some(handler) => handler.handle(event).await,
                    None => Ok(None),
                }
            }
            StateBehavior::Literal(transition) => Ok(Some(transition.clone())),
            StateBehavior::Map(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialog_core::BasicEvent;
    use serde_json::json;

    struct Fixed(Transition);

    #[async_trait]
    impl StateHandler for Fixed {
        async fn handle(&self, _event: &dyn Event) -> Result<Option<Transition>, FlowError> {
            Ok(Some(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn test_literal_state_ignores_intent() {
        let state = State::literal("greet", Transition::to("die").with_value("say", json!("hi")));

        for intent in ["Yes", "No", "Whatever"] {
            let event = BasicEvent::core(intent);
            let result = state.dispatch(&event).await.unwrap().unwrap();
            assert_eq!(result.to.as_deref(), Some("die"));
            assert_eq!(result.payload["say"], json!("hi"));
        }
    }

    #[tokio::test]
    async fn test_literal_copies_are_independent() {
        let state = State::literal("greet", Transition::to("die").with_value("say", json!("hi")));
        let event = BasicEvent::core("Yes");

        let mut first = state.dispatch(&event).await.unwrap().unwrap();
        first.payload.insert("say".to_string(), json!("mutated"));

        let second = state.dispatch(&event).await.unwrap().unwrap();
        assert_eq!(second.payload["say"], json!("hi"));
    }

    #[tokio::test]
    async fn test_per_intent_handler_wins_over_entry() {
        let mut handlers: HashMap<String, Arc<dyn StateHandler>> = HashMap::new();
        handlers.insert(
            "Yes".to_string(),
            Arc::new(Fixed(Transition::to("confirmed"))),
        );
        handlers.insert(
            ENTRY_STATE.to_string(),
            Arc::new(Fixed(Transition::to("fallback"))),
        );
        let state = State::intent_handlers("ask", handlers);

        let yes = state.dispatch(&BasicEvent::core("Yes")).await.unwrap();
        assert_eq!(yes.unwrap().to.as_deref(), Some("confirmed"));

        let other = state.dispatch(&BasicEvent::core("No")).await.unwrap();
        assert_eq!(other.unwrap().to.as_deref(), Some("fallback"));
    }

    #[tokio::test]
    async fn test_no_matching_handler_is_unhandled_not_an_error() {
        let mut handlers: HashMap<String, Arc<dyn StateHandler>> = HashMap::new();
        handlers.insert("Yes".to_string(), Arc::new(Fixed(Transition::terminate())));
        let state = State::intent_handlers("ask", handlers);

        let result = state.dispatch(&BasicEvent::core("No")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_terminal_state_produces_nothing() {
        let state = State::terminal(DIE_STATE);
        assert!(state.is_terminal());
        let result = state.dispatch(&BasicEvent::core("Yes")).await.unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_die_name_implies_terminal() {
        let state = State::literal(DIE_STATE, Transition::terminate());
        assert!(state.is_terminal());
        assert!(!State::literal("greet", Transition::terminate()).is_terminal());
    }

    #[test]
    fn test_with_intents_records_registration_metadata() {
        let state = State::literal("ask", Transition::terminate())
            .with_intents(vec!["Yes".to_string(), "No".to_string()]);
        assert_eq!(state.intents(), ["Yes".to_string(), "No".to_string()]);
    }

    #[test]
    fn test_platform_defaults_to_core() {
        let state = State::terminal(DIE_STATE);
        assert_eq!(state.platform(), CORE_PLATFORM);

        let overlay = State::literal("menu", Transition::terminate()).on_platform("alexa");
        assert_eq!(overlay.platform(), "alexa");
    }
}
