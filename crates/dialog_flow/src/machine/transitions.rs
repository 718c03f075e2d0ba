//! Transition normalization and the turn orchestrator.
//!
//! `SystemTransition` removes the ambiguity of loosely-shaped handler
//! output; `StateMachine` drives one or more state evaluations within a
//! single turn to a stable outcome, applying consistent fallback and
//! failure semantics.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dialog_core::{Event, FlowControl, FlowError, Reply, Transition, CORE_PLATFORM};
use serde_json::{Map, Value};

use super::hooks::{AfterStateHook, BeforeStateHook, UnhandledStateHook};
use super::states::{State, TransitionTarget};
use super::{DIE_STATE, ENTRY_STATE};

/// Upper bound on silent continue hand-offs within one turn. A chain this
/// long means the state graph contains a continue cycle; the turn fails
/// with [`FlowError::ContinueLoop`] instead of spinning forever.
pub const MAX_CONTINUE_HOPS: usize = 64;

/// Canonical, fully-defaulted view of a [`Transition`].
///
/// Most handlers return partial data (only a destination, or only payload
/// with no explicit flow); the defaulting here is what the orchestrator
/// bases its control decisions on. Pure and synchronous.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemTransition {
    /// Destination state name, `"die"` when the transition named none.
    pub to: String,
    /// Derived flow: `Terminate` iff the destination is `"die"` or the
    /// transition asked for termination explicitly, else `Continue`.
    pub flow: FlowControl,
    /// Opaque payload carried through from the transition.
    pub payload: Map<String, Value>,
}

impl From<Transition> for SystemTransition {
    fn from(transition: Transition) -> Self {
        let to = transition
            .to
            .unwrap_or_else(|| DIE_STATE.to_string());
        let flow = if to == DIE_STATE || transition.flow == Some(FlowControl::Terminate) {
            FlowControl::Terminate
        } else {
            FlowControl::Continue
        };
        Self {
            to,
            flow,
            payload: transition.payload,
        }
    }
}

impl SystemTransition {
    pub fn should_terminate(&self) -> bool {
        self.flow == FlowControl::Terminate || self.to == DIE_STATE
    }

    pub fn should_continue(&self) -> bool {
        self.flow == FlowControl::Continue && self.to != DIE_STATE
    }
}

/// A [`SystemTransition`] whose destination has been resolved to a
/// concrete state. The return value of one evaluation step, and of the
/// whole turn once no continue hand-off remains.
#[derive(Debug, Clone)]
pub struct ResolvedTransition {
    /// Destination state.
    pub to: Arc<State>,
    pub flow: FlowControl,
    /// Opaque payload accumulated by handlers and after-hooks.
    pub payload: Map<String, Value>,
}

impl ResolvedTransition {
    pub fn should_terminate(&self) -> bool {
        self.flow == FlowControl::Terminate || self.to.name() == DIE_STATE
    }

    pub fn should_continue(&self) -> bool {
        self.flow == FlowControl::Continue && self.to.name() != DIE_STATE
    }
}

/// Construction-time configuration: the nested state table plus the three
/// ordered hook lists.
///
/// Hook lists execute front to back in the order given here; there is no
/// post-construction registration.
#[derive(Default)]
pub struct StateMachineConfig {
    /// platform -> state name -> state. The `core` table must contain
    /// `entry`; `die` is synthesized when absent.
    pub states: HashMap<String, HashMap<String, Arc<State>>>,
    pub on_before_state_changed: Vec<Arc<dyn BeforeStateHook>>,
    pub on_after_state_changed: Vec<Arc<dyn AfterStateHook>>,
    pub on_unhandled_state: Vec<Arc<dyn UnhandledStateHook>>,
}

/// Incremental construction of a [`StateMachineConfig`].
#[derive(Default)]
pub struct StateMachineBuilder {
    config: StateMachineConfig,
}

impl StateMachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a state under its platform scope.
    pub fn state(mut self, state: State) -> Self {
        let state = Arc::new(state);
        self.config
            .states
            .entry(state.platform().to_string())
            .or_default()
            .insert(state.name().to_string(), state);
        self
    }

    pub fn on_before(mut self, hook: Arc<dyn BeforeStateHook>) -> Self {
        self.config.on_before_state_changed.push(hook);
        self
    }

    pub fn on_after(mut self, hook: Arc<dyn AfterStateHook>) -> Self {
        self.config.on_after_state_changed.push(hook);
        self
    }

    pub fn on_unhandled(mut self, hook: Arc<dyn UnhandledStateHook>) -> Self {
        self.config.on_unhandled_state.push(hook);
        self
    }

    pub fn build(self) -> Result<StateMachine, FlowError> {
        StateMachine::new(self.config)
    }
}

/// The turn orchestrator.
///
/// Owns the nested state table and the hook lists; immutable once built
/// and safe to reuse read-only across turns. All mutable per-turn data
/// lives in the caller-supplied `event` and `reply`.
pub struct StateMachine {
    states: HashMap<String, HashMap<String, Arc<State>>>,
    before_hooks: Vec<Arc<dyn BeforeStateHook>>,
    after_hooks: Vec<Arc<dyn AfterStateHook>>,
    unhandled_hooks: Vec<Arc<dyn UnhandledStateHook>>,
}

impl StateMachine {
    /// Build a machine from configuration.
    ///
    /// `core.entry` must exist; `core.die` is synthesized as a terminal
    /// state when absent.
    pub fn new(config: StateMachineConfig) -> Result<Self, FlowError> {
        let mut states = config.states;
        let core = states.entry(CORE_PLATFORM.to_string()).or_default();
        if !core.contains_key(ENTRY_STATE) {
            return Err(FlowError::UnknownState(ENTRY_STATE.to_string()));
        }
        core.entry(DIE_STATE.to_string())
            .or_insert_with(|| Arc::new(State::terminal(DIE_STATE)));

        Ok(Self {
            states,
            before_hooks: config.on_before_state_changed,
            after_hooks: config.on_after_state_changed,
            unhandled_hooks: config.on_unhandled_state,
        })
    }

    pub fn builder() -> StateMachineBuilder {
        StateMachineBuilder::new()
    }

    /// Drive one conversational turn to a stable outcome.
    ///
    /// Evaluates the start state, then follows continue hand-offs until a
    /// transition terminates the turn. The reply is marked terminated
    /// exactly when the turn ends.
    pub async fn run_transition(
        &self,
        start_state: &str,
        event: &dyn Event,
        reply: &mut dyn Reply,
    ) -> Result<ResolvedTransition, FlowError> {
        let mut state_name = start_state.to_string();
        let mut hops = 0usize;

        loop {
            let resolved = self.run_step(&state_name, event, &mut *reply).await?;

            if resolved.should_terminate() {
                reply.terminate();
            }

            if resolved.should_continue() {
                hops += 1;
                if hops > MAX_CONTINUE_HOPS {
                    return Err(FlowError::ContinueLoop {
                        start: start_state.to_string(),
                        hops: MAX_CONTINUE_HOPS,
                    });
                }
                log::debug!(
                    "[{}] continue hand-off to '{}' (hop {})",
                    state_name,
                    resolved.to.name(),
                    hops
                );
                state_name = resolved.to.name().to_string();
                continue;
            }

            return Ok(resolved);
        }
    }

    /// One evaluation step: resolve the state, run before-hooks, dispatch,
    /// apply the entry fallback and the unhandled protocol, run
    /// after-hooks, normalize and resolve the destination.
    async fn run_step(
        &self,
        start: &str,
        event: &dyn Event,
        reply: &mut dyn Reply,
    ) -> Result<ResolvedTransition, FlowError> {
        let mut current = self
            .lookup(event.platform(), start)
            .ok_or_else(|| FlowError::UnknownState(start.to_string()))?;
        log::debug!(
            "[{}] evaluating for intent '{}' on platform '{}'",
            current.name(),
            event.intent_name(),
            event.platform()
        );

        for hook in &self.before_hooks {
            hook.on_before_state_changed(event, &mut *reply, &current)
                .await?;
        }

        let mut result = self.run_current_state(&current, event).await?;

        // Entry fallback, exactly once: entry's own empty result proceeds
        // to the unhandled protocol instead of re-triggering the fallback.
        if result.is_none() && current.name() != ENTRY_STATE {
            log::debug!(
                "[{}] no transition for intent '{}', falling back to entry",
                current.name(),
                event.intent_name()
            );
            current = self
                .lookup(CORE_PLATFORM, ENTRY_STATE)
                .ok_or_else(|| FlowError::UnknownState(ENTRY_STATE.to_string()))?;
            result = self.run_current_state(&current, event).await?;
        }

        let mut transition = match result {
            Some(transition) => transition,
            None => {
                log::warn!(
                    "[{}] unhandled intent '{}', consulting unhandled-state hooks",
                    current.name(),
                    event.intent_name()
                );
                let mut fallback = None;
                for hook in &self.unhandled_hooks {
                    if let Some(transition) =
                        hook.on_unhandled_state(event, current.name()).await?
                    {
                        fallback = Some(transition);
                    }
                }
                fallback.ok_or_else(|| FlowError::UnhandledState {
                    state: current.name().to_string(),
                    intent: event.intent_name().to_string(),
                })?
            }
        };

        if transition.to.is_none() {
            transition.to = Some(DIE_STATE.to_string());
        }
        for hook in &self.after_hooks {
            hook.on_after_state_changed(event, &mut *reply, &mut transition)
                .await?;
        }

        let system = SystemTransition::from(transition);
        let destination = self
            .lookup(event.platform(), &system.to)
            .ok_or_else(|| FlowError::UnknownState(system.to.clone()))?;
        log::debug!(
            "[{}] resolved transition to '{}' ({:?})",
            current.name(),
            destination.name(),
            system.flow
        );

        Ok(ResolvedTransition {
            to: destination,
            flow: system.flow,
            payload: system.payload,
        })
    }

    /// Dispatch priority: enter functions and literal transitions live on
    /// the state itself; declarative maps need machine-level resolution
    /// for the core-table fallback and alias chasing.
    async fn run_current_state(
        &self,
        state: &State,
        event: &dyn Event,
    ) -> Result<Option<Transition>, FlowError> {
        match state.simple_map() {
            Some(map) => self.simple_transition(state, map, event),
            None => state.dispatch(event).await,
        }
    }

    /// Simple-transition lookup for map states.
    ///
    /// Finds the destination for the event's intent, falling back to the
    /// equivalent core state's map when a platform overlay lacks an entry.
    /// A destination name that is itself a key of the same map bound to a
    /// different target is an alias and is followed until a literal
    /// transition or a non-aliased name is reached.
    fn simple_transition(
        &self,
        state: &State,
        map: &HashMap<String, TransitionTarget>,
        event: &dyn Event,
    ) -> Result<Option<Transition>, FlowError> {
        let intent = event.intent_name();

        // Keep the core state's Arc alive while borrowing its map.
        let core_state: Option<Arc<State>> = if state.platform() != CORE_PLATFORM {
            self.states
                .get(CORE_PLATFORM)
                .and_then(|table| table.get(state.name()))
                .cloned()
        } else {
            None
        };

        let mut active = map;
        let mut target = active.get(intent);
        if target.is_none() {
            if let Some(core_map) = core_state.as_ref().and_then(|s| s.simple_map()) {
                active = core_map;
                target = active.get(intent);
            }
        }
        let Some(mut target) = target else {
            return Ok(None);
        };

        let mut visited: HashSet<&str> = HashSet::new();
        loop {
            match target {
                TransitionTarget::Inline(transition) => return Ok(Some(transition.clone())),
                TransitionTarget::Name(name) => {
                    if !visited.insert(name.as_str()) {
                        // Alias cycle: the chain can never reach a real state.
                        return Err(FlowError::UnknownState(name.clone()));
                    }
                    match active.get(name.as_str()) {
                        Some(next) if next != target => target = next,
                        _ => {
                            if !self.state_exists(event.platform(), name) {
                                return Err(FlowError::UnknownState(name.clone()));
                            }
                            return Ok(Some(Transition::to(name.clone())));
                        }
                    }
                }
            }
        }
    }

    /// Platform-specific state first, core fallback second.
    fn lookup(&self, platform: &str, name: &str) -> Option<Arc<State>> {
        self.states
            .get(platform)
            .and_then(|table| table.get(name))
            .or_else(|| {
                self.states
                    .get(CORE_PLATFORM)
                    .and_then(|table| table.get(name))
            })
            .cloned()
    }

    fn state_exists(&self, platform: &str, name: &str) -> bool {
        self.states
            .get(platform)
            .is_some_and(|table| table.contains_key(name))
            || self
                .states
                .get(CORE_PLATFORM)
                .is_some_and(|table| table.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn system(transition: Transition) -> SystemTransition {
        SystemTransition::from(transition)
    }

    #[test]
    fn test_empty_transition_defaults_to_die_and_terminate() {
        let normalized = system(Transition::new());
        assert_eq!(normalized.to, DIE_STATE);
        assert_eq!(normalized.flow, FlowControl::Terminate);
        assert!(normalized.should_terminate());
        assert!(!normalized.should_continue());
    }

    #[test]
    fn test_named_destination_defaults_to_continue() {
        let normalized = system(Transition::to("next"));
        assert_eq!(normalized.to, "next");
        assert_eq!(normalized.flow, FlowControl::Continue);
        assert!(normalized.should_continue());
        assert!(!normalized.should_terminate());
    }

    #[test]
    fn test_explicit_terminate_wins_over_destination() {
        let normalized = system(Transition::to("next").with_flow(FlowControl::Terminate));
        assert_eq!(normalized.to, "next");
        assert_eq!(normalized.flow, FlowControl::Terminate);
        assert!(normalized.should_terminate());
        assert!(!normalized.should_continue());
    }

    #[test]
    fn test_die_destination_wins_over_continue_flow() {
        let normalized = system(Transition::to(DIE_STATE).with_flow(FlowControl::Continue));
        assert_eq!(normalized.flow, FlowControl::Terminate);
        assert!(normalized.should_terminate());
        assert!(!normalized.should_continue());
    }

    #[test]
    fn test_payload_is_carried_through() {
        let normalized = system(Transition::new().with_value("say", json!("bye")));
        assert_eq!(normalized.payload["say"], json!("bye"));
    }

    #[test]
    fn test_builder_requires_core_entry() {
        let result = StateMachine::builder()
            .state(State::literal("greet", Transition::terminate()))
            .build();

        match result {
            Err(FlowError::UnknownState(name)) => assert_eq!(name, ENTRY_STATE),
            other => panic!("expected UnknownState, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_die_is_synthesized_as_terminal() {
        let machine = StateMachine::builder()
            .state(State::literal(ENTRY_STATE, Transition::terminate()))
            .build()
            .unwrap();

        let die = machine.lookup(CORE_PLATFORM, DIE_STATE).unwrap();
        assert_eq!(die.name(), DIE_STATE);
        assert!(die.is_terminal());
    }

    #[test]
    fn test_declared_die_is_not_overwritten() {
        let machine = StateMachine::builder()
            .state(State::literal(ENTRY_STATE, Transition::terminate()))
            .state(State::literal(
                DIE_STATE,
                Transition::terminate().with_value("say", json!("bye")),
            ))
            .build()
            .unwrap();

        let die = machine.lookup(CORE_PLATFORM, DIE_STATE).unwrap();
        assert!(die.is_terminal());
        assert!(die.simple_map().is_none());
    }

    #[test]
    fn test_lookup_prefers_platform_overlay() {
        let machine = StateMachine::builder()
            .state(State::literal(ENTRY_STATE, Transition::terminate()))
            .state(State::literal("menu", Transition::terminate()))
            .state(State::literal("menu", Transition::terminate()).on_platform("alexa"))
            .build()
            .unwrap();

        assert_eq!(machine.lookup("alexa", "menu").unwrap().platform(), "alexa");
        assert_eq!(
            machine.lookup("telegram", "menu").unwrap().platform(),
            CORE_PLATFORM
        );
    }
}
