use crate::validate::ValidationError;

/// Turns structured validation errors into user-facing text.
pub trait MessageFormatter: Send + Sync {
    fn format(&self, error: &ValidationError) -> String;
}

/// Formatter that yields the message key itself; useful when localisation
/// happens further out.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyFormatter;

impl MessageFormatter for KeyFormatter {
    fn format(&self, error: &ValidationError) -> String {
        error.kind.message_key()
    }
}
