//! User-facing messages and warnings raised during a transaction.

/// Messages, warnings and an optional application error for one transaction.
///
/// The owning [`Transaction`](crate::Transaction) decides when appends are
/// allowed; the broker itself only stores and drains.
#[derive(Debug, Clone, Default)]
pub struct MessageBroker {
    messages: Vec<String>,
    warnings: Vec<String>,
    application_error: Option<String>,
}

impl MessageBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Set the application error. A later call replaces an earlier one.
    pub fn set_application_error(&mut self, error: impl Into<String>) {
        self.application_error = Some(error.into());
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn application_error(&self) -> Option<&str> {
        self.application_error.as_deref()
    }

    pub fn drain_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    pub fn drain_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Take the application error, leaving none behind.
    pub fn take_application_error(&mut self) -> Option<String> {
        self.application_error.take()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.warnings.is_empty() && self.application_error.is_none()
    }
}
