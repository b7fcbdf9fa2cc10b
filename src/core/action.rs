//! Entry, exit and transition actions.

use super::event::Event;
use thiserror::Error;

/// Error returned by a user callback.
///
/// The engine never retries a failed callback; the error is wrapped in
/// [`MachineError::Callback`](crate::machine::MachineError::Callback) and
/// handed to whoever applied the event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

type Callback<C, E> = Box<dyn Fn(&mut C, Option<&E>) -> Result<(), CallbackError> + Send + Sync>;

/// A callback run on state entry, state exit, or when a transition fires.
///
/// Actions receive the machine context mutably and the triggering event,
/// if the step was driven by one. They must not block.
///
/// # Example
///
/// ```rust
/// use statechart::core::Action;
///
/// let log_entry = Action::<Vec<String>, &'static str>::new(|log, event| {
///     log.push(format!("entered on {:?}", event));
/// });
///
/// let mut log = Vec::new();
/// log_entry.run(&mut log, Some(&"Tick")).unwrap();
/// assert_eq!(log, vec!["entered on Some(\"Tick\")".to_string()]);
/// ```
pub struct Action<C, E: Event> {
    callback: Callback<C, E>,
}

impl<C, E: Event> Action<C, E> {
    /// Create an action that cannot fail.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut C, Option<&E>) + Send + Sync + 'static,
        C: 'static,
    {
        Action {
            callback: Box::new(move |ctx: &mut C, event: Option<&E>| {
                f(ctx, event);
                Ok(())
            }),
        }
    }

    /// Create an action that may fail.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&mut C, Option<&E>) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Action {
            callback: Box::new(f),
        }
    }

    pub fn run(&self, context: &mut C, event: Option<&E>) -> Result<(), CallbackError> {
        (self.callback)(context, event)
    }
}

impl<C, E: Event> std::fmt::Debug for Action<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Action")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infallible_action_mutates_context() {
        let action = Action::<u32, &'static str>::new(|count, _| *count += 1);
        let mut count = 0;

        action.run(&mut count, None).unwrap();
        action.run(&mut count, Some(&"Tick")).unwrap();

        assert_eq!(count, 2);
    }

    #[test]
    fn fallible_action_propagates_error() {
        let action = Action::<u32, &'static str>::fallible(|count, _| {
            if *count == 0 {
                return Err("nothing to release".into());
            }
            *count -= 1;
            Ok(())
        });

        let mut count = 1;
        assert!(action.run(&mut count, None).is_ok());
        assert_eq!(count, 0);

        let err = action.run(&mut count, None).unwrap_err();
        assert_eq!(err.message(), "nothing to release");
    }

    #[test]
    fn callback_error_from_string() {
        let err: CallbackError = String::from("disk full").into();
        assert_eq!(err.to_string(), "disk full");
    }
}
