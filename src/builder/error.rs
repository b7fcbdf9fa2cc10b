//! Build errors for machine and transition builders.

use thiserror::Error;

/// Errors that can occur when building machines and transitions.
///
/// `MachineBuilder::build` checks the whole definition before failing;
/// when it finds more than one problem they are returned together as
/// [`BuildError::Multiple`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Transition source state not specified. Call .from(state)")]
    MissingFromState,

    #[error("Transition from '{from}' has no target. Call .to(state) or .internal()")]
    MissingToState { from: String },

    #[error("Internal transition from '{from}' cannot have a target or history")]
    InternalWithTarget { from: String },

    #[error("State '{key}' is declared more than once")]
    DuplicateState { key: String },

    #[error("State '{key}' is not declared")]
    UnknownState { key: String },

    #[error("State '{state}' names unknown parent '{parent}'")]
    UnknownParent { state: String, parent: String },

    #[error("State '{state}' cannot be nested in leaf '{parent}'")]
    ParentIsLeaf { state: String, parent: String },

    #[error("State '{state}' is part of a parent cycle")]
    ParentCycle { state: String },

    #[error("Composite '{composite}' has no children")]
    EmptyComposite { composite: String },

    #[error("Composite '{composite}' has no default child")]
    MissingDefault { composite: String },

    #[error("Composite '{composite}' has more than one default child: {candidates:?}")]
    MultipleDefaults {
        composite: String,
        candidates: Vec<String>,
    },

    #[error("Default '{child}' of composite '{composite}' is not one of its children")]
    DefaultNotChild { composite: String, child: String },

    #[error("Parallel '{parallel}' has no regions")]
    EmptyParallel { parallel: String },

    #[error("Region '{region}' of parallel '{parallel}' must be a composite")]
    RegionNotComposite { parallel: String, region: String },

    #[error("Region list of parallel '{parallel}' does not match its children at '{region}'")]
    RegionMismatch { parallel: String, region: String },

    #[error("Transition from '{from}' targets unknown state '{to}'")]
    UnresolvedTarget { from: String, to: String },

    #[error("Invalid machine configuration: {0}")]
    InvalidConfig(String),

    #[error("{} problems found: {}", .0.len(), join(.0))]
    Multiple(Vec<BuildError>),
}

impl BuildError {
    /// Flatten into the individual problems.
    pub fn problems(&self) -> Vec<&BuildError> {
        match self {
            BuildError::Multiple(errors) => {
                errors.iter().flat_map(|error| error.problems()).collect()
            }
            single => vec![single],
        }
    }
}

fn join(errors: &[BuildError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
