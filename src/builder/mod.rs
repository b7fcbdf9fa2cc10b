//! Builder API for declaring statecharts.
//!
//! This module provides fluent builders and macros for declaring the state
//! tree and its transitions by key. Keys are resolved, and the whole
//! definition checked, once [`MachineBuilder::build`] is called.

pub mod error;
pub mod machine;
pub mod macros;
pub mod transition;

pub use error::BuildError;
pub use machine::{MachineBuilder, ROOT};
pub use transition::{TransitionBuilder, TransitionDef};

use crate::core::{Event, Guard};
use crate::machine::Trigger;

/// Create a transition fired by events of one kind.
///
/// # Example
///
/// ```
/// use statechart::builder::event_transition;
///
/// let transition = event_transition::<(), &'static str>("Red", "Tick", "Green");
/// assert_eq!(transition.to(), Some("Green"));
/// ```
pub fn event_transition<C, E: Event>(
    from: impl Into<String>,
    kind: impl Into<String>,
    to: impl Into<String>,
) -> TransitionDef<C, E> {
    TransitionDef {
        from: from.into(),
        to: Some(to.into()),
        trigger: Trigger::Event(kind.into()),
        guard: None,
        action: None,
        history: None,
    }
}

/// Create a conditional transition that fires whenever `guard` holds.
///
/// # Example
///
/// ```
/// use statechart::builder::conditional_transition;
///
/// let transition = conditional_transition::<u32, &'static str, _>(
///     "Charging",
///     "Charged",
///     |level, _| *level >= 100,
/// );
/// assert!(!transition.is_internal());
/// ```
pub fn conditional_transition<C, E, F>(
    from: impl Into<String>,
    to: impl Into<String>,
    guard: F,
) -> TransitionDef<C, E>
where
    C: 'static,
    E: Event,
    F: Fn(&C, Option<&E>) -> bool + Send + Sync + 'static,
{
    TransitionDef {
        from: from.into(),
        to: Some(to.into()),
        trigger: Trigger::Conditional,
        guard: Some(Guard::new(guard)),
        action: None,
        history: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_transition_builds() {
        let transition = event_transition::<(), &'static str>("Red", "Tick", "Green");

        assert_eq!(transition.from(), "Red");
        assert_eq!(transition.to(), Some("Green"));
        assert!(transition.trigger().matches(Some(&"Tick")));
        assert!(!transition.trigger().matches(Some(&"Tock")));
        assert!(!transition.trigger().matches::<&'static str>(None));
    }

    #[test]
    fn conditional_transition_respects_guard() {
        let transition =
            conditional_transition::<u32, &'static str, _>("Charging", "Charged", |level, _| {
                *level >= 100
            });

        assert_eq!(transition.trigger(), &Trigger::Conditional);
        let guard = transition.guard.as_ref().unwrap();
        assert!(guard.check(&100, None).unwrap());
        assert!(!guard.check(&40, None).unwrap());
    }
}
