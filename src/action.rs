//! Actions and change events.
//!
//! An action is "something happened, a store should react". Concrete actions are
//! plain enums whose variants carry their payloads; each action enum is its own
//! routing key on the bus.
//!
//! ```rust
//! use fluxdispatch::Action;
//!
//! #[derive(Debug)]
//! enum UploadAction {
//!     UploadLog { uuid: String, start_immediately: bool },
//!     ResetUploadStates,
//! }
//!
//! impl Action for UploadAction {
//!     fn variant_name(&self) -> &'static str {
//!         match self {
//!             Self::UploadLog { .. } => "UploadLog",
//!             Self::ResetUploadStates => "ResetUploadStates",
//!         }
//!     }
//! }
//!
//! let action = UploadAction::ResetUploadStates;
//! assert_eq!(action.label(), "UploadAction-ResetUploadStates");
//! ```

use std::fmt;

/// A dispatchable action.
pub trait Action: fmt::Debug + Send + Sync + 'static {
    /// Name of the variant, e.g. `"Increment"`.
    fn variant_name(&self) -> &'static str;

    /// Name of the action type, e.g. `"CounterAction"`.
    fn type_name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// `<TypeName>-<VariantName>`, as written to the dispatch log.
    fn label(&self) -> String {
        format!("{}-{}", self.type_name(), self.variant_name())
    }
}

/// Notification that a store's observable state changed.
///
/// A change event may carry an error describing why the change was a failure.
pub trait ChangeEvent: Send + Sync + 'static {
    /// Error carried by a failed change.
    type Error: fmt::Debug + Send + Sync + 'static;

    /// The error, if this change reports a failure.
    fn error(&self) -> Option<&Self::Error> {
        None
    }

    /// True if this change reports a failure.
    fn is_error(&self) -> bool {
        self.error().is_some()
    }
}

/// Rust type name without module path or generic arguments.
///
/// `short_type_name::<Vec<String>>()` is `"Vec"`.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum CounterAction {
        Increment,
        Add(i64),
    }

    impl Action for CounterAction {
        fn variant_name(&self) -> &'static str {
            match self {
                Self::Increment => "Increment",
                Self::Add(_) => "Add",
            }
        }
    }

    #[derive(Debug)]
    enum UploadError {
        NoConnection,
    }

    struct Uploaded {
        error: Option<UploadError>,
    }

    impl ChangeEvent for Uploaded {
        type Error = UploadError;

        fn error(&self) -> Option<&UploadError> {
            self.error.as_ref()
        }
    }

    struct Plain;

    impl ChangeEvent for Plain {
        type Error = std::convert::Infallible;
    }

    #[test]
    fn action_label_uses_short_type_name() {
        assert_eq!(CounterAction::Increment.type_name(), "CounterAction");
        assert_eq!(CounterAction::Add(3).label(), "CounterAction-Add");
    }

    #[test]
    fn short_type_name_strips_path_and_generics() {
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
        assert_eq!(short_type_name::<u8>(), "u8");
    }

    #[test]
    fn change_event_error_flag() {
        assert!(!Plain.is_error());
        assert!(!Uploaded { error: None }.is_error());

        let failed = Uploaded {
            error: Some(UploadError::NoConnection),
        };
        assert!(failed.is_error());
        assert!(matches!(failed.error(), Some(UploadError::NoConnection)));
    }
}
