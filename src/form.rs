use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Seam between the retry policies and whatever renders form feedback.
///
/// Call sites attach a validation message to a named field when a request
/// fails terminally; how (and whether) the message is displayed is the
/// host's concern.
pub trait FormSink {
    /// Attaches a validation message to a named form field.
    fn set_field_error(&self, field: &str, message: &str);
}

/// Thread-safe field → message map, the bundled [`FormSink`] implementation.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Mutex<HashMap<String, String>>,
}

impl FieldErrors {
    /// Creates an empty error map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Message currently attached to `field`, if any.
    pub fn get(&self, field: &str) -> Option<String> {
        self.lock().get(field).cloned()
    }

    /// Whether no field currently carries an error.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes all field errors, typically before re-submitting a form.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FormSink for FieldErrors {
    fn set_field_error(&self, field: &str, message: &str) {
        self.lock().insert(field.to_owned(), message.to_owned());
    }
}
