//! Runtime errors raised while applying events.

use crate::core::CallbackError;
use std::fmt;
use thiserror::Error;

/// Which user callback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackPhase {
    Guard,
    Exit,
    Action,
    Entry,
}

impl fmt::Display for CallbackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackPhase::Guard => "Guard",
            CallbackPhase::Exit => "Exit",
            CallbackPhase::Action => "Transition action",
            CallbackPhase::Entry => "Entry",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while a machine processes events
#[derive(Debug, Error)]
pub enum MachineError {
    #[error(
        "Unterminated transition loop: still transitioning after {limit} run-to-completion passes (active: {configuration:?})"
    )]
    UnterminatedLoop {
        limit: usize,
        configuration: Vec<String>,
    },

    #[error("Unknown state '{key}'")]
    UnknownState { key: String },

    #[error("{phase} callback of state '{state}' failed: {source}")]
    Callback {
        state: String,
        phase: CallbackPhase,
        #[source]
        source: CallbackError,
    },
}

impl MachineError {
    pub(crate) fn callback(state: &str, phase: CallbackPhase, source: CallbackError) -> Self {
        MachineError::Callback {
            state: state.to_string(),
            phase,
            source,
        }
    }
}
