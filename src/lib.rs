//! Statechart: a hierarchical state machine runtime
//!
//! States form a tree. Composite states have exactly one active child,
//! parallel states keep every region active at once, and leaves hold no
//! children. Events travel down the active path and are handled by the
//! innermost state with a matching transition; conditional transitions are
//! then re-checked until the configuration settles.
//!
//! # Core Concepts
//!
//! - **Builder**: states and transitions are declared by key with
//!   [`MachineBuilder`] and checked once, at build time
//! - **Machine**: owns the state tree and a user context `C`, and applies
//!   events of type `E` to completion
//! - **History**: transitions can re-enter a composite through its deep or
//!   flat history instead of its default child
//! - **Queued mode**: a [`dispatch::Dispatcher`] owns a machine in a tokio
//!   task and applies submitted events in order
//!
//! # Example
//!
//! ```rust
//! use statechart::builder::{event_transition, MachineBuilder};
//! use statechart::ROOT;
//!
//! let mut light = MachineBuilder::<(), &'static str>::new()
//!     .composite("Light", ROOT, "Red")
//!     .leaf("Red", "Light")
//!     .leaf("Green", "Light")
//!     .leaf("Yellow", "Light")
//!     .add_transition(event_transition("Red", "Tick", "Green"))
//!     .add_transition(event_transition("Green", "Tick", "Yellow"))
//!     .add_transition(event_transition("Yellow", "Tick", "Red"))
//!     .build(())
//!     .unwrap();
//!
//! light.start().unwrap();
//! assert!(light.is_in_state("Red").unwrap());
//!
//! light.apply_event(Some(&"Tick")).unwrap();
//! assert!(light.is_in_state("Green").unwrap());
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod machine;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder, TransitionBuilder, ROOT};
pub use config::MachineConfig;
pub use core::{Action, CallbackError, Event, Guard, TransitionJournal, TransitionRecord};
pub use dispatch::{DispatchError, Dispatcher, DispatcherHandle, EventSender};
pub use machine::{HistoryKind, Machine, MachineError, StateId, StepResult, StepTrace};
