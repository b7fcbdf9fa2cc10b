//! Macros for ergonomic statechart declarations.

/// Generate an [`Event`](crate::core::Event) implementation for simple enums.
///
/// Each variant's kind is its own name, so transitions can be declared
/// with `.on("Variant")`.
///
/// # Example
///
/// ```
/// use statechart::core::Event;
/// use statechart::event_enum;
///
/// event_enum! {
///     pub enum PlayerEvent {
///         Play,
///         Pause,
///         Sleep,
///         Wake,
///     }
/// }
///
/// assert_eq!(PlayerEvent::Sleep.kind(), "Sleep");
/// ```
#[macro_export]
macro_rules! event_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::Event for $name {
            fn kind(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::Event;

    event_enum! {
        enum TestEvent {
            Tick,
            Reset,
        }
    }

    #[test]
    fn event_enum_macro_generates_trait() {
        assert_eq!(TestEvent::Tick.kind(), "Tick");
        assert_eq!(TestEvent::Reset.kind(), "Reset");
    }

    #[test]
    fn event_enum_supports_visibility() {
        event_enum! {
            pub enum PublicEvent {
                Open,
            }
        }

        assert_eq!(PublicEvent::Open.kind(), "Open");
    }

    #[test]
    fn event_enum_serializes_by_name() {
        let json = serde_json::to_string(&TestEvent::Reset).unwrap();
        assert_eq!(json, "\"Reset\"");
    }
}
