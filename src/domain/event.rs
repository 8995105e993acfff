use {
    super::audit::AuditEntry,
    super::fields::{FieldValue, Fields},
    super::level::LogLevel,
};

/// One structured log event handed to the audit sink.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub level: LogLevel,
    pub fields: Fields,
    pub template: String,
    /// Message of the error that accompanied the event, if any.
    pub error: Option<String>,
}

impl LogEvent {
    pub fn new(level: LogLevel, template: impl Into<String>) -> Self {
        Self {
            level,
            fields: Fields::new(),
            template: template.into(),
            error: None,
        }
    }

    pub fn information(template: impl Into<String>) -> Self {
        Self::new(LogLevel::Information, template)
    }

    pub fn warning(template: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, template)
    }

    pub fn debug(template: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, template)
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key, value);
        self
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_error(mut self, error: &dyn std::error::Error) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Rendered message, with the error appended as ` | Exception: <message>`.
    pub fn render(&self) -> String {
        let message = self.fields.render(&self.template);
        match &self.error {
            Some(err) => format!("{message} | Exception: {err}"),
            None => message,
        }
    }
}

/// What the sink did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    /// Rendered message was blank; nothing was logged.
    Dropped,
    /// Sent to the forward pipeline only.
    Forwarded,
    /// Forwarded, stored and published.
    Persisted(AuditEntry),
}
