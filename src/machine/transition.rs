//! Resolved transitions and the result bits of a processing pass.

use super::node::StateId;
use crate::core::{Action, Event, Guard};
use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

/// What makes a transition eligible.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// Matches events whose [`Event::kind`] equals the given name.
    Event(String),
    /// Matches on every pass, with or without an event. Only the guard
    /// decides whether it fires.
    Conditional,
}

impl Trigger {
    pub fn matches<E: Event>(&self, event: Option<&E>) -> bool {
        match self {
            Trigger::Event(kind) => event.is_some_and(|e| e.kind() == kind.as_str()),
            Trigger::Conditional => true,
        }
    }
}

/// History pseudostate attached to a transition destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryKind {
    /// Restore the full previously active path below the destination.
    Deep,
    /// Restore only the destination's previous child; default-enter below.
    Flat,
}

/// A transition whose source and destination resolved at build time.
pub(crate) struct Transition<C, E: Event> {
    pub(crate) trigger: Trigger,
    pub(crate) guard: Option<Guard<C, E>>,
    pub(crate) action: Option<Action<C, E>>,
    /// `None` for internal transitions.
    pub(crate) target: Option<StateId>,
    pub(crate) history: Option<HistoryKind>,
}

/// Result bits of processing an event (or a conditional pass).
///
/// Results of nested processing are merged with `|`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepResult {
    /// A transition fired for the event.
    pub consumed: bool,
    /// The configuration changed; conditional transitions must be
    /// re-checked before the step is complete.
    pub run_to_complete: bool,
    /// At least one state was entered.
    pub entered: bool,
    /// At least one state was exited.
    pub leaved: bool,
}

impl StepResult {
    pub fn changed(&self) -> bool {
        self.entered || self.leaved
    }
}

impl BitOr for StepResult {
    type Output = StepResult;

    fn bitor(self, rhs: StepResult) -> StepResult {
        StepResult {
            consumed: self.consumed || rhs.consumed,
            run_to_complete: self.run_to_complete || rhs.run_to_complete,
            entered: self.entered || rhs.entered,
            leaved: self.leaved || rhs.leaved,
        }
    }
}

impl BitOrAssign for StepResult {
    fn bitor_assign(&mut self, rhs: StepResult) {
        *self = *self | rhs;
    }
}

/// What the trace hook sees after a pass that changed the configuration.
#[derive(Debug)]
pub struct StepTrace<'a, E> {
    /// Active configuration before the pass, in document order.
    pub previous: &'a [String],
    /// Active configuration after the pass.
    pub current: &'a [String],
    /// Active leaf states before the pass.
    pub previous_leaves: &'a [String],
    pub current_leaves: &'a [String],
    /// The triggering event; `None` on conditional passes.
    pub event: Option<&'a E>,
    pub result: StepResult,
}

/// Observer invoked with every [`StepTrace`].
pub type TraceHook<E> = Box<dyn Fn(&StepTrace<'_, E>) + Send + Sync>;
