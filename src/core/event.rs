//! Core Event trait for values delivered to a state machine.
//!
//! The engine treats events as opaque, immutable values. The only thing
//! it ever asks of an event is its kind, which transitions match against.

use std::fmt::Debug;

/// Trait for events delivered to a statechart.
///
/// Payloads are never inspected by the engine; guards and actions receive
/// the full event and may look at whatever they need.
///
/// # Required Traits
///
/// - `Debug`: Events must be debuggable for diagnostics
/// - `Send`: Events cross into the queued dispatcher's worker task
///
/// # Example
///
/// ```rust
/// use statechart::core::Event;
///
/// #[derive(Debug)]
/// enum DoorEvent {
///     Open,
///     Close,
///     Lock { code: u32 },
/// }
///
/// impl Event for DoorEvent {
///     fn kind(&self) -> &str {
///         match self {
///             Self::Open => "Open",
///             Self::Close => "Close",
///             Self::Lock { .. } => "Lock",
///         }
///     }
/// }
///
/// assert_eq!(DoorEvent::Lock { code: 1234 }.kind(), "Lock");
/// ```
pub trait Event: Debug + Send + 'static {
    /// The discriminator transitions are matched against.
    fn kind(&self) -> &str;
}

impl Event for &'static str {
    fn kind(&self) -> &str {
        self
    }
}

impl Event for String {
    fn kind(&self) -> &str {
        self.as_str()
    }
}

/// Kind of an optional event, for log records.
pub(crate) fn kind_of<E: Event>(event: Option<&E>) -> &str {
    event.map_or("<none>", |e| e.kind())
}
