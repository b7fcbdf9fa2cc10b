//! Transition resolution.
//!
//! Firing a transition happens in two phases. First the bookkeeping for
//! the whole transition is committed: every exited node is marked
//! inactive, every entered node active, and each composite on the entry
//! path records its new active child. Only then do the callbacks run, in
//! UML order: exit actions innermost first, the transition action, entry
//! actions outermost first. A failing callback therefore leaves a
//! consistent configuration behind; the callbacks after it are skipped.

use super::composite::EntryMode;
use super::engine::Machine;
use super::error::{CallbackPhase, MachineError};
use super::node::{Shape, StateId, StateKind, ROOT_ID};
use super::parallel::DeferredTransition;
use super::transition::StepResult;
use crate::core::{kind_of, Event, TransitionRecord};
use chrono::{DateTime, Utc};
use tracing::{debug, trace};

impl<C, E: Event> Machine<C, E> {
    /// Try the transitions of a single node against `event`.
    ///
    /// The first transition in declaration order whose trigger matches and
    /// whose guard passes fires. Nothing fires → empty result. Inside a
    /// region, a transition that leaves the enclosing parallel is only
    /// recorded; the parallel fires it once every region ran.
    pub(crate) fn check_transitions(
        &mut self,
        id: StateId,
        event: Option<&E>,
    ) -> Result<StepResult, MachineError> {
        let Some(index) = self.select_transition(id, event)? else {
            return Ok(StepResult::default());
        };

        if let Some(target) = self.nodes[id.0].transitions[index].target {
            let domain = self.transition_domain(id, target);
            if let Some(position) = self.deferring_scope(domain) {
                trace!(
                    machine = %self.id,
                    state = %self.nodes[id.0].key,
                    event = kind_of(event),
                    "transition deferred until all regions ran"
                );
                let generation = self.nodes[id.0].generation;
                self.parallel_scopes[position].deferred.push(DeferredTransition {
                    source: id,
                    index,
                    generation,
                    with_event: event.is_some(),
                });
                return Ok(StepResult {
                    consumed: true,
                    ..StepResult::default()
                });
            }
        }

        self.fire(id, index, event)
    }

    /// Whether a conditional pass over the current configuration would
    /// fire an external transition.
    pub(crate) fn has_enabled_transition(&self) -> Result<bool, MachineError> {
        for (slot, node) in self.nodes.iter().enumerate() {
            if !node.active {
                continue;
            }
            if let Some(index) = self.select_transition(StateId(slot), None)? {
                if node.transitions[index].target.is_some() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn select_transition(
        &self,
        id: StateId,
        event: Option<&E>,
    ) -> Result<Option<usize>, MachineError> {
        let node = &self.nodes[id.0];
        for (index, transition) in node.transitions.iter().enumerate() {
            if !transition.trigger.matches(event) {
                continue;
            }
            let passes = match &transition.guard {
                Some(guard) => guard.check(&self.context, event).map_err(|source| {
                    MachineError::callback(&node.key, CallbackPhase::Guard, source)
                })?,
                None => true,
            };
            if passes {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    pub(crate) fn fire(
        &mut self,
        source: StateId,
        index: usize,
        event: Option<&E>,
    ) -> Result<StepResult, MachineError> {
        let transition = &self.nodes[source.0].transitions[index];
        let (target, history) = (transition.target, transition.history);

        let Some(target) = target else {
            return self.fire_internal(source, index, event);
        };

        let domain = self.transition_domain(source, target);
        let now = Utc::now();

        let mut exited = Vec::new();
        let exit_root = self.child_toward(domain, source);
        self.commit_exit(exit_root, &mut exited);

        let path = self.entry_path(domain, target);
        let mut entered = Vec::new();
        self.nodes[domain.0].set_active_child(path[0]);
        self.commit_entry_path(&path, history.map(EntryMode::History), now, &mut entered);

        debug!(
            machine = %self.id,
            from = %self.nodes[source.0].key,
            to = %self.nodes[target.0].key,
            event = kind_of(event),
            exited = exited.len(),
            entered = entered.len(),
            "transition fired"
        );
        self.record(source, Some(target), event, now);

        self.run_exit_actions(&exited, event)?;
        if let Some(action) = &self.nodes[source.0].transitions[index].action {
            action
                .run(&mut self.context, event)
                .map_err(|err| {
                    MachineError::callback(&self.nodes[source.0].key, CallbackPhase::Action, err)
                })?;
        }
        self.run_entry_actions(&entered, event)?;

        Ok(StepResult {
            consumed: true,
            run_to_complete: true,
            entered: !entered.is_empty(),
            leaved: !exited.is_empty(),
        })
    }

    /// An internal transition runs its action without leaving its source.
    fn fire_internal(
        &mut self,
        source: StateId,
        index: usize,
        event: Option<&E>,
    ) -> Result<StepResult, MachineError> {
        debug!(
            machine = %self.id,
            state = %self.nodes[source.0].key,
            event = kind_of(event),
            "internal transition fired"
        );
        self.record(source, None, event, Utc::now());

        if let Some(action) = &self.nodes[source.0].transitions[index].action {
            action
                .run(&mut self.context, event)
                .map_err(|err| {
                    MachineError::callback(&self.nodes[source.0].key, CallbackPhase::Action, err)
                })?;
        }

        Ok(StepResult {
            consumed: true,
            ..StepResult::default()
        })
    }

    fn record(
        &mut self,
        source: StateId,
        target: Option<StateId>,
        event: Option<&E>,
        at: DateTime<Utc>,
    ) {
        let record = TransitionRecord {
            from: self.nodes[source.0].key.clone(),
            to: target.map(|id| self.nodes[id.0].key.clone()),
            event: event.map(|e| e.kind().to_string()),
            timestamp: at,
            step: self.steps,
        };
        self.journal.record(record);
    }

    /// The deepest strict common ancestor of `source` and `target`.
    ///
    /// A self-transition exits and re-enters its source. A transition
    /// between orthogonal regions exits and re-enters the whole parallel,
    /// so the domain never is a parallel state.
    pub(crate) fn transition_domain(&self, source: StateId, target: StateId) -> StateId {
        let source_path = &self.nodes[source.0].ancestors;
        let target_path = &self.nodes[target.0].ancestors;

        let mut domain = ROOT_ID;
        for (a, b) in source_path.iter().zip(target_path) {
            if a != b {
                break;
            }
            domain = *a;
        }

        while self.nodes[domain.0].shape() == Shape::Parallel {
            match self.nodes[domain.0].parent {
                Some(parent) => domain = parent,
                None => break,
            }
        }
        domain
    }

    /// The child of `ancestor` on the path down to `descendant` (which may
    /// be that child itself).
    pub(crate) fn child_toward(&self, ancestor: StateId, descendant: StateId) -> StateId {
        let depth = self.nodes[ancestor.0].depth();
        self.nodes[descendant.0]
            .ancestors
            .get(depth + 1)
            .copied()
            .unwrap_or(descendant)
    }

    /// Nodes strictly below `ancestor` down to and including `target`.
    pub(crate) fn entry_path(&self, ancestor: StateId, target: StateId) -> Vec<StateId> {
        let depth = self.nodes[ancestor.0].depth();
        let node = &self.nodes[target.0];
        let mut path: Vec<StateId> = node.ancestors.iter().skip(depth + 1).copied().collect();
        path.push(target);
        path
    }

    /// Mark `id` and its active descendants inactive, innermost first.
    /// Exiting an inactive node does nothing.
    pub(crate) fn commit_exit(&mut self, id: StateId, exited: &mut Vec<StateId>) {
        if !self.nodes[id.0].active {
            return;
        }
        let children: Vec<StateId> = match &self.nodes[id.0].kind {
            StateKind::Leaf => Vec::new(),
            StateKind::Composite { active_child, .. } => active_child.iter().copied().collect(),
            StateKind::Parallel { regions } => regions.clone(),
        };
        for child in children {
            self.commit_exit(child, exited);
        }
        self.nodes[id.0].active = false;
        exited.push(id);
    }

    /// Enter the explicit path `path[0] .. target`, then the target itself
    /// by default or history entry.
    ///
    /// Regions of a parallel on the path that the path does not descend
    /// into are default-entered.
    fn commit_entry_path(
        &mut self,
        path: &[StateId],
        history: Option<EntryMode>,
        now: DateTime<Utc>,
        entered: &mut Vec<StateId>,
    ) {
        let Some((&id, rest)) = path.split_first() else {
            return;
        };
        let Some(&next) = rest.first() else {
            self.commit_entry(id, history.unwrap_or(EntryMode::Default), now, entered);
            return;
        };

        self.nodes[id.0].mark_entered(now);
        entered.push(id);

        match self.nodes[id.0].shape() {
            Shape::Leaf => {}
            Shape::Composite => {
                self.nodes[id.0].set_active_child(next);
                self.commit_entry_path(rest, history, now, entered);
            }
            Shape::Parallel => {
                for region in self.nodes[id.0].children().to_vec() {
                    if region == next {
                        self.commit_entry_path(rest, history, now, entered);
                    } else {
                        self.commit_entry(region, EntryMode::Default, now, entered);
                    }
                }
            }
        }
    }

    pub(crate) fn run_exit_actions(
        &mut self,
        exited: &[StateId],
        event: Option<&E>,
    ) -> Result<(), MachineError> {
        for &id in exited {
            let node = &self.nodes[id.0];
            trace!(machine = %self.id, state = %node.key, "exit");
            if let Some(action) = &node.on_exit {
                action
                    .run(&mut self.context, event)
                    .map_err(|err| MachineError::callback(&node.key, CallbackPhase::Exit, err))?;
            }
        }
        Ok(())
    }

    pub(crate) fn run_entry_actions(
        &mut self,
        entered: &[StateId],
        event: Option<&E>,
    ) -> Result<(), MachineError> {
        for &id in entered {
            let node = &self.nodes[id.0];
            trace!(machine = %self.id, state = %node.key, "entry");
            if let Some(action) = &node.on_entry {
                action
                    .run(&mut self.context, event)
                    .map_err(|err| MachineError::callback(&node.key, CallbackPhase::Entry, err))?;
            }
        }
        Ok(())
    }
}
