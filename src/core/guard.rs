//! Guard predicates for controlling state transitions.
//!
//! Guards are side-effect-free predicates that decide whether a matching
//! transition may fire. They see the machine context and the triggering
//! event, if any.

use super::action::CallbackError;
use super::event::Event;

type Predicate<C, E> = Box<dyn Fn(&C, Option<&E>) -> Result<bool, CallbackError> + Send + Sync>;

/// Predicate that determines if a transition can fire.
///
/// Guards are evaluated in transition declaration order; the first
/// transition whose trigger matches and whose guard passes wins.
///
/// # Example
///
/// ```rust
/// use statechart::core::Guard;
///
/// struct Counter {
///     ticks: u32,
/// }
///
/// let enough = Guard::<Counter, &'static str>::new(|ctx, _event| ctx.ticks >= 3);
///
/// assert!(!enough.check(&Counter { ticks: 1 }, None).unwrap());
/// assert!(enough.check(&Counter { ticks: 3 }, Some(&"Tick")).unwrap());
/// ```
pub struct Guard<C, E: Event> {
    predicate: Predicate<C, E>,
}

impl<C, E: Event> Guard<C, E> {
    /// Create a guard from an infallible predicate.
    ///
    /// The predicate must be deterministic and free of side effects; the
    /// engine may evaluate it on every run-to-completion pass.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C, Option<&E>) -> bool + Send + Sync + 'static,
        C: 'static,
    {
        Guard {
            predicate: Box::new(move |ctx: &C, event: Option<&E>| Ok(predicate(ctx, event))),
        }
    }

    /// Create a guard whose evaluation can fail.
    ///
    /// A failure aborts the current step and is reported to the caller of
    /// [`Machine::apply_event`](crate::machine::Machine::apply_event);
    /// the configuration is left untouched.
    pub fn fallible<F>(predicate: F) -> Self
    where
        F: Fn(&C, Option<&E>) -> Result<bool, CallbackError> + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    /// Evaluate the guard.
    pub fn check(&self, context: &C, event: Option<&E>) -> Result<bool, CallbackError> {
        (self.predicate)(context, event)
    }
}

impl<C, E: Event> std::fmt::Debug for Guard<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Guard")
    }
}
