//! State nodes stored in the machine's arena.

use super::transition::Transition;
use crate::core::{Action, Event};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Index of a state in its machine's arena.
///
/// Ids are only meaningful for the machine that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub(crate) usize);

impl StateId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The implicit top-level composite always occupies slot zero.
pub(crate) const ROOT_ID: StateId = StateId(0);

/// What a state contains.
#[derive(Debug)]
pub(crate) enum StateKind {
    Leaf,
    Composite {
        children: Vec<StateId>,
        default_child: StateId,
        /// Last entered child. Survives exit so history can restore it;
        /// `None` until the composite is entered for the first time.
        active_child: Option<StateId>,
    },
    Parallel {
        regions: Vec<StateId>,
    },
}

/// Shape of a node without its payload, for dispatching while `self` is
/// borrowed mutably.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Shape {
    Leaf,
    Composite,
    Parallel,
}

pub(crate) struct StateNode<C, E: Event> {
    pub(crate) key: String,
    pub(crate) parent: Option<StateId>,
    /// Strict ancestors, root first.
    pub(crate) ancestors: Vec<StateId>,
    pub(crate) kind: StateKind,
    pub(crate) transitions: Vec<Transition<C, E>>,
    pub(crate) on_entry: Option<Action<C, E>>,
    pub(crate) on_exit: Option<Action<C, E>>,
    pub(crate) active: bool,
    /// Bumped on every entry; lets a container notice it was exited and
    /// re-entered while one of its children was processing.
    pub(crate) generation: u64,
    pub(crate) last_entered: Option<DateTime<Utc>>,
}

impl<C, E: Event> StateNode<C, E> {
    pub(crate) fn new(key: String, parent: Option<StateId>, kind: StateKind) -> Self {
        Self {
            key,
            parent,
            ancestors: Vec::new(),
            kind,
            transitions: Vec::new(),
            on_entry: None,
            on_exit: None,
            active: false,
            generation: 0,
            last_entered: None,
        }
    }

    pub(crate) fn shape(&self) -> Shape {
        match self.kind {
            StateKind::Leaf => Shape::Leaf,
            StateKind::Composite { .. } => Shape::Composite,
            StateKind::Parallel { .. } => Shape::Parallel,
        }
    }

    /// Children of a composite, regions of a parallel, nothing for a leaf.
    pub(crate) fn children(&self) -> &[StateId] {
        match &self.kind {
            StateKind::Leaf => &[],
            StateKind::Composite { children, .. } => children,
            StateKind::Parallel { regions } => regions,
        }
    }

    pub(crate) fn active_child(&self) -> Option<StateId> {
        match self.kind {
            StateKind::Composite { active_child, .. } => active_child,
            _ => None,
        }
    }

    pub(crate) fn default_child(&self) -> Option<StateId> {
        match self.kind {
            StateKind::Composite { default_child, .. } => Some(default_child),
            _ => None,
        }
    }

    pub(crate) fn set_active_child(&mut self, child: StateId) {
        if let StateKind::Composite { active_child, .. } = &mut self.kind {
            *active_child = Some(child);
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.ancestors.len()
    }

    pub(crate) fn mark_entered(&mut self, at: DateTime<Utc>) {
        self.active = true;
        self.generation += 1;
        self.last_entered = Some(at);
    }
}
