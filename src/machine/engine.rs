//! The machine: arena of states, registry, and the run-to-completion loop.

use super::error::MachineError;
use super::node::{StateId, StateNode, ROOT_ID};
use super::parallel::ParallelScope;
use super::transition::{StepResult, StepTrace, TraceHook};
use crate::config::MachineConfig;
use crate::core::{kind_of, Event, TransitionJournal};
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// A built statechart, ready to consume events.
///
/// The machine owns every state in a flat arena; parents and children
/// refer to each other by [`StateId`]. It also owns the context value `C`
/// handed to every guard and action.
///
/// Machines are not internally synchronized. Share one across threads by
/// moving it into a [`Dispatcher`](crate::dispatch::Dispatcher).
///
/// # Example
///
/// ```rust
/// use statechart::builder::{event_transition, MachineBuilder};
/// use statechart::ROOT;
///
/// let mut machine = MachineBuilder::<(), &'static str>::new()
///     .composite("Light", ROOT, "Red")
///     .leaf("Red", "Light")
///     .leaf("Green", "Light")
///     .add_transition(event_transition("Red", "Tick", "Green"))
///     .add_transition(event_transition("Green", "Tick", "Red"))
///     .build(())
///     .unwrap();
///
/// machine.start().unwrap();
/// assert!(machine.is_in_state("Red").unwrap());
///
/// machine.apply_event(Some(&"Tick")).unwrap();
/// assert!(machine.is_in_state("Green").unwrap());
/// ```
pub struct Machine<C, E: Event> {
    pub(crate) id: Uuid,
    pub(crate) nodes: Vec<StateNode<C, E>>,
    pub(crate) registry: HashMap<String, StateId>,
    pub(crate) context: C,
    pub(crate) config: MachineConfig,
    pub(crate) journal: TransitionJournal,
    pub(crate) trace: Option<TraceHook<E>>,
    /// Number of `apply_event` calls so far.
    pub(crate) steps: u64,
    /// Parallels whose regions are being processed, outermost first.
    pub(crate) parallel_scopes: Vec<ParallelScope>,
}

impl<C, E: Event> Machine<C, E> {
    pub(crate) fn from_parts(
        nodes: Vec<StateNode<C, E>>,
        registry: HashMap<String, StateId>,
        context: C,
        config: MachineConfig,
        trace: Option<TraceHook<E>>,
    ) -> Self {
        let journal = TransitionJournal::with_capacity(config.journal_capacity);
        Self {
            id: Uuid::new_v4(),
            nodes,
            registry,
            context,
            config,
            journal,
            trace,
            steps: 0,
            parallel_scopes: Vec::new(),
        }
    }

    /// Enter the initial configuration.
    ///
    /// Equivalent to `apply_event(None)`. Calling it again before any
    /// transition has fired changes nothing.
    pub fn start(&mut self) -> Result<StepResult, MachineError> {
        self.apply_event(None)
    }

    /// Process one event to completion.
    ///
    /// The event travels down the active path; afterwards conditional
    /// transitions are re-checked with no event until the configuration
    /// is stable. At most `max_transitions_per_step` re-check passes run;
    /// if a transition is still enabled after the last one, the step fails
    /// with [`MachineError::UnterminatedLoop`]. Deciding that evaluates the
    /// guards of the active states once more.
    ///
    /// A fresh machine enters its initial configuration before it sees the
    /// first event.
    ///
    /// The returned bits are the union of every pass of the step.
    pub fn apply_event(&mut self, event: Option<&E>) -> Result<StepResult, MachineError> {
        self.steps += 1;
        debug!(
            machine = %self.id,
            step = self.steps,
            event = kind_of(event),
            "applying event"
        );

        let mut result = self.pass(event)?;
        let mut total = result;
        let mut passes = 0;

        while result.run_to_complete && self.nodes[ROOT_ID.0].active {
            if passes == self.config.max_transitions_per_step {
                if !self.has_enabled_transition()? {
                    break;
                }
                let configuration = self.active_configuration();
                warn!(
                    machine = %self.id,
                    limit = passes,
                    ?configuration,
                    "unterminated transition loop"
                );
                return Err(MachineError::UnterminatedLoop {
                    limit: passes,
                    configuration,
                });
            }
            passes += 1;
            result = self.pass(None)?;
            total |= result;
        }

        Ok(total)
    }

    /// One walk of the active tree, reporting to the trace hook when the
    /// configuration changed.
    fn pass(&mut self, event: Option<&E>) -> Result<StepResult, MachineError> {
        let previous = self
            .trace
            .as_ref()
            .map(|_| (self.active_configuration(), self.active_leaves()));
        let result = self.process(ROOT_ID, event)?;

        if let Some((previous, previous_leaves)) = previous {
            if result.changed() {
                let current = self.active_configuration();
                let current_leaves = self.active_leaves();
                if let Some(hook) = &self.trace {
                    hook(&StepTrace {
                        previous: &previous,
                        current: &current,
                        previous_leaves: &previous_leaves,
                        current_leaves: &current_leaves,
                        event,
                        result,
                    });
                }
            }
        }

        Ok(result)
    }

    /// Resolve a state key.
    pub fn lookup(&self, key: &str) -> Result<StateId, MachineError> {
        self.registry
            .get(key)
            .copied()
            .ok_or_else(|| MachineError::UnknownState {
                key: key.to_string(),
            })
    }

    /// Key of a state id issued by this machine.
    pub fn key_of(&self, id: StateId) -> Option<&str> {
        if id == ROOT_ID {
            return None;
        }
        self.nodes.get(id.0).map(|node| node.key.as_str())
    }

    /// Whether the state is part of the active configuration.
    pub fn is_in_state(&self, key: &str) -> Result<bool, MachineError> {
        let id = self.lookup(key)?;
        Ok(self.nodes[id.0].active)
    }

    /// Whether the initial configuration has been entered.
    pub fn is_started(&self) -> bool {
        self.nodes[ROOT_ID.0].active
    }

    /// Keys of every active state in document order (parents before
    /// children, siblings in declaration order).
    pub fn active_configuration(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.collect_active(ROOT_ID, false, &mut keys);
        keys
    }

    /// Keys of the active leaves only; one per active region.
    pub fn active_leaves(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.collect_active(ROOT_ID, true, &mut keys);
        keys
    }

    fn collect_active(&self, id: StateId, leaves_only: bool, out: &mut Vec<String>) {
        for &child in self.nodes[id.0].children() {
            let node = &self.nodes[child.0];
            if !node.active {
                continue;
            }
            if !leaves_only || node.children().is_empty() {
                out.push(node.key.clone());
            }
            self.collect_active(child, leaves_only, out);
        }
    }

    /// How long an active state has been active; `None` when inactive.
    pub fn time_in_state(&self, key: &str) -> Result<Option<Duration>, MachineError> {
        let node = &self.nodes[self.lookup(key)?.0];
        if !node.active {
            return Ok(None);
        }
        Ok(node
            .last_entered
            .and_then(|at| Utc::now().signed_duration_since(at).to_std().ok()))
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// Mutable access to the context between steps.
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    pub fn journal(&self) -> &TransitionJournal {
        &self.journal
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Identifier attached to this machine's log records.
    pub fn instance_id(&self) -> Uuid {
        self.id
    }

    /// Number of `apply_event` calls so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of declared states, not counting the implicit root.
    pub fn state_count(&self) -> usize {
        self.nodes.len() - 1
    }
}

impl<C, E: Event> std::fmt::Debug for Machine<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("id", &self.id)
            .field("states", &self.state_count())
            .field("active", &self.active_configuration())
            .field("steps", &self.steps)
            .finish()
    }
}
