//! Builder for declaring transitions.

use crate::builder::error::BuildError;
use crate::core::{Action, Event, Guard};
use crate::machine::{HistoryKind, Trigger};

/// A declared transition, referring to states by key.
///
/// Keys are resolved when the machine is built; an unresolvable key is a
/// build error, never a runtime one.
pub struct TransitionDef<C, E: Event> {
    pub(crate) from: String,
    pub(crate) to: Option<String>,
    pub(crate) trigger: Trigger,
    pub(crate) guard: Option<Guard<C, E>>,
    pub(crate) action: Option<Action<C, E>>,
    pub(crate) history: Option<HistoryKind>,
}

impl<C, E: Event> TransitionDef<C, E> {
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Destination key; `None` for internal transitions.
    pub fn to(&self) -> Option<&str> {
        self.to.as_deref()
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn history(&self) -> Option<HistoryKind> {
        self.history
    }

    pub fn is_internal(&self) -> bool {
        self.to.is_none()
    }
}

/// Builder for constructing transitions with a fluent API.
///
/// Without [`on`](Self::on) the transition is conditional: it is checked
/// on every pass and fires as soon as its guard holds.
///
/// # Example
///
/// ```rust
/// use statechart::builder::TransitionBuilder;
/// use statechart::machine::HistoryKind;
///
/// let transition = TransitionBuilder::<u32, &'static str>::new()
///     .from("Standby")
///     .on("Wake")
///     .when(|battery, _| *battery > 10)
///     .to("Player")
///     .history(HistoryKind::Deep)
///     .build()
///     .unwrap();
///
/// assert_eq!(transition.to(), Some("Player"));
/// ```
pub struct TransitionBuilder<C, E: Event> {
    from: Option<String>,
    to: Option<String>,
    trigger: Trigger,
    guard: Option<Guard<C, E>>,
    action: Option<Action<C, E>>,
    history: Option<HistoryKind>,
    internal: bool,
}

impl<C, E: Event> TransitionBuilder<C, E> {
    /// Create a new transition builder.
    pub fn new() -> Self {
        Self {
            from: None,
            to: None,
            trigger: Trigger::Conditional,
            guard: None,
            action: None,
            history: None,
            internal: false,
        }
    }

    /// Set the source state (required).
    pub fn from(mut self, key: impl Into<String>) -> Self {
        self.from = Some(key.into());
        self
    }

    /// Set the destination state (required unless internal).
    pub fn to(mut self, key: impl Into<String>) -> Self {
        self.to = Some(key.into());
        self
    }

    /// Fire only for events of this kind.
    pub fn on(mut self, kind: impl Into<String>) -> Self {
        self.trigger = Trigger::Event(kind.into());
        self
    }

    /// Add a guard (optional).
    pub fn guard(mut self, guard: Guard<C, E>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure (optional).
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&C, Option<&E>) -> bool + Send + Sync + 'static,
        C: 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Set the transition action (optional).
    pub fn action(mut self, action: Action<C, E>) -> Self {
        self.action = Some(action);
        self
    }

    /// Set an infallible transition action using a closure (optional).
    pub fn run<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C, Option<&E>) + Send + Sync + 'static,
        C: 'static,
    {
        self.action = Some(Action::new(f));
        self
    }

    /// Enter a composite or parallel destination through its history.
    pub fn history(mut self, kind: HistoryKind) -> Self {
        self.history = Some(kind);
        self
    }

    /// Run only the action; the source is neither exited nor re-entered.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// Build the transition.
    pub fn build(self) -> Result<TransitionDef<C, E>, BuildError> {
        let from = self.from.ok_or(BuildError::MissingFromState)?;

        if self.internal {
            if self.to.is_some() || self.history.is_some() {
                return Err(BuildError::InternalWithTarget { from });
            }
        } else if self.to.is_none() {
            return Err(BuildError::MissingToState { from });
        }

        Ok(TransitionDef {
            from,
            to: self.to,
            trigger: self.trigger,
            guard: self.guard,
            action: self.action,
            history: self.history,
        })
    }
}

impl<C, E: Event> Default for TransitionBuilder<C, E> {
    fn default() -> Self {
        Self::new()
    }
}
