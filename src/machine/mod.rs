//! The statechart execution engine.
//!
//! # Key Concepts
//!
//! - **Arena**: every state lives in one table owned by the [`Machine`];
//!   parents, children and regions refer to each other by [`StateId`]
//! - **Run-to-completion**: [`Machine::apply_event`] processes one event
//!   and then re-checks conditional transitions until nothing fires
//! - **Consumption**: an event consumed by a child is not offered to its
//!   ancestors; every region of a parallel still sees it
//! - **History**: composites remember their last active child, so
//!   transitions marked with a [`HistoryKind`] can restore it

mod composite;
mod engine;
mod error;
mod node;
mod parallel;
mod resolve;
mod transition;

pub use engine::Machine;
pub use error::{CallbackPhase, MachineError};
pub use node::StateId;
pub use transition::{HistoryKind, StepResult, StepTrace, TraceHook, Trigger};

pub(crate) use node::{StateKind, StateNode, ROOT_ID};
pub(crate) use transition::Transition;
