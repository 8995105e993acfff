use {
    crate::domain::{audit::AuditEntry, error::AuditError, id::SubjectId, wire::HubMethod},
    std::{future::Future, pin::Pin, sync::Arc},
};

pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AuditError>> + Send + 'a>>;

/// What callers of a hub connection can observe. Automatic reconnects happen
/// while `Connected` and are not visible here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

pub type EntryHandler = Arc<dyn Fn(AuditEntry) + Send + Sync>;
pub type ReconnectHandler = Arc<dyn Fn() + Send + Sync>;

/// Callbacks a transport raises from its receive loop.
#[derive(Clone)]
pub struct ConnectionHandlers {
    pub on_entry: EntryHandler,
    /// Runs after an automatic reconnect, once invocations can be sent again.
    pub on_reconnected: ReconnectHandler,
}

/// Transport to the group channel hub.
pub trait HubConnection: Send + Sync {
    fn state(&self) -> ConnectionState;

    /// Open the connection. On failure the state stays `Disconnected`.
    fn start(&self) -> TransportFuture<'_>;

    /// Close the connection. No handler runs once this resolves.
    fn stop(&self) -> TransportFuture<'_>;

    /// Call a hub method and wait for its completion.
    fn invoke(&self, method: HubMethod, subject_id: SubjectId) -> TransportFuture<'_>;

    fn set_handlers(&self, handlers: ConnectionHandlers);
}
