//! Composite states: recursive dispatch and default/history entry.

use super::engine::Machine;
use super::error::MachineError;
use super::node::{Shape, StateId};
use super::transition::{HistoryKind, StepResult};
use crate::core::Event;
use chrono::{DateTime, Utc};

/// How a container chooses which children to enter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EntryMode {
    Default,
    History(HistoryKind),
}

impl EntryMode {
    /// Mode for the level below a composite that just restored (or chose)
    /// its child. Flat history only reaches one level down.
    fn below(self) -> EntryMode {
        match self {
            EntryMode::History(HistoryKind::Deep) => self,
            _ => EntryMode::Default,
        }
    }
}

impl<C, E: Event> Machine<C, E> {
    /// Dispatch `event` into any node.
    pub(crate) fn process(
        &mut self,
        id: StateId,
        event: Option<&E>,
    ) -> Result<StepResult, MachineError> {
        match self.nodes[id.0].shape() {
            Shape::Leaf => self.check_transitions(id, event),
            Shape::Composite => self.process_composite(id, event),
            Shape::Parallel => self.process_parallel(id, event),
        }
    }

    /// Offer `event` to the active child first, then to the composite's
    /// own transitions.
    ///
    /// An event consumed below is not offered again at this level; the own
    /// check then runs with no event so conditional transitions still get
    /// their chance.
    fn process_composite(
        &mut self,
        id: StateId,
        event: Option<&E>,
    ) -> Result<StepResult, MachineError> {
        let mut result = StepResult::default();

        if !self.nodes[id.0].active {
            let mut entered = Vec::new();
            self.commit_entry(id, EntryMode::Default, Utc::now(), &mut entered);
            self.run_entry_actions(&entered, None)?;
            result |= StepResult {
                run_to_complete: true,
                entered: true,
                ..StepResult::default()
            };
        }

        let generation = self.nodes[id.0].generation;
        if let Some(child) = self.nodes[id.0].active_child() {
            result |= self.process(child, event)?;
        }
        if !self.is_current(id, generation) {
            return Ok(result);
        }

        let own_event = if result.consumed { None } else { event };
        result |= self.check_transitions(id, own_event)?;
        Ok(result)
    }

    /// Whether `id` is still active and has not been re-entered since its
    /// generation was sampled.
    pub(crate) fn is_current(&self, id: StateId, generation: u64) -> bool {
        let node = &self.nodes[id.0];
        node.active && node.generation == generation
    }

    /// Mark `id` entered and enter below it according to `mode`.
    ///
    /// Entered nodes are appended to `entered` outermost first; their entry
    /// actions are run afterwards by the caller.
    pub(crate) fn commit_entry(
        &mut self,
        id: StateId,
        mode: EntryMode,
        now: DateTime<Utc>,
        entered: &mut Vec<StateId>,
    ) {
        self.nodes[id.0].mark_entered(now);
        entered.push(id);

        match self.nodes[id.0].shape() {
            Shape::Leaf => {}
            Shape::Composite => {
                let Some(default_child) = self.nodes[id.0].default_child() else {
                    return;
                };
                // Deep and flat history restore the same child here; they
                // differ in how the levels below it are entered.
                let child = match mode {
                    EntryMode::Default => default_child,
                    EntryMode::History(_) => {
                        self.nodes[id.0].active_child().unwrap_or(default_child)
                    }
                };
                self.nodes[id.0].set_active_child(child);
                self.commit_entry(child, mode.below(), now, entered);
            }
            Shape::Parallel => self.commit_region_entry(id, mode, now, entered),
        }
    }
}
