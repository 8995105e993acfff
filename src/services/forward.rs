use {
    crate::domain::{event::LogEvent, level::LogLevel},
    std::fmt::Write as _,
};

/// The ordinary log pipeline that every non-dropped event reaches.
pub trait ForwardSink: Send + Sync {
    /// `message` is the event's rendered message, error suffix included.
    fn forward(&self, event: &LogEvent, message: &str);
}

/// Re-emits events through `tracing` under the `audit_feed::forward` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingForward;

impl ForwardSink for TracingForward {
    fn forward(&self, event: &LogEvent, message: &str) {
        let fields = format_fields(event);
        match event.level {
            LogLevel::Trace => {
                tracing::trace!(target: "audit_feed::forward", fields = %fields, "{message}")
            }
            LogLevel::Debug => {
                tracing::debug!(target: "audit_feed::forward", fields = %fields, "{message}")
            }
            LogLevel::Information => {
                tracing::info!(target: "audit_feed::forward", fields = %fields, "{message}")
            }
            LogLevel::Warning => {
                tracing::warn!(target: "audit_feed::forward", fields = %fields, "{message}")
            }
            LogLevel::Error | LogLevel::Critical => tracing::error!(
                target: "audit_feed::forward",
                severity = event.level.as_str(),
                fields = %fields,
                "{message}"
            ),
        }
    }
}

fn format_fields(event: &LogEvent) -> String {
    let mut out = String::new();
    for (i, (key, value)) in event.fields.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{key}={value}");
    }
    out
}
