//! Core statechart types.
//!
//! This module contains the building blocks the engine is assembled from:
//! - Events via the `Event` trait
//! - Guard predicates and entry/exit/transition actions
//! - The journal of fired transitions

mod action;
mod event;
mod guard;
mod journal;

pub use action::{Action, CallbackError};
pub use event::Event;
pub use guard::Guard;
pub use journal::{TransitionJournal, TransitionRecord};

pub(crate) use event::kind_of;
