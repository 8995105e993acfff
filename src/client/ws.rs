//! WebSocket transport for the hub, with automatic reconnect.

use {
    super::connection::{ConnectionHandlers, ConnectionState, HubConnection, TransportFuture},
    crate::domain::{
        error::AuditError,
        id::SubjectId,
        wire::{ClientFrame, HubMethod, ServerFrame},
    },
    futures::{SinkExt, StreamExt},
    parking_lot::{Mutex, RwLock},
    std::{
        collections::HashMap,
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    },
    tokio::{
        net::TcpStream,
        sync::{mpsc, oneshot, watch},
        task::JoinHandle,
    },
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
    tracing::{debug, info, warn},
    url::Url,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const INVOKE_TIMEOUT: Duration = Duration::from_secs(5);
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

pub struct WsHubConnection {
    url: Url,
    shared: Arc<Shared>,
    // Serialises start/stop against each other.
    session: tokio::sync::Mutex<Option<Session>>,
}

struct Session {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Shared {
    connected: Mutex<bool>,
    handlers: RwLock<Option<ConnectionHandlers>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<ClientFrame>>>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Result<(), AuditError>>>>,
    next_invocation: AtomicU64,
}

enum SessionEnd {
    Shutdown,
    Lost,
}

impl WsHubConnection {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            shared: Arc::new(Shared::default()),
            session: tokio::sync::Mutex::new(None),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn start_inner(&self) -> Result<(), AuditError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Ok(());
        }

        let socket = open(&self.url).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // Installed before returning: an invoke issued right after `start`
        // queues here until the session task picks it up.
        let outbound = self.shared.install_outbound();
        *self.shared.connected.lock() = true;
        let task = tokio::spawn(run_session(
            self.url.clone(),
            self.shared.clone(),
            socket,
            outbound,
            shutdown_rx,
        ));
        *session = Some(Session {
            shutdown: shutdown_tx,
            task,
        });
        info!(url = %self.url, "hub connection started");
        Ok(())
    }

    async fn stop_inner(&self) -> Result<(), AuditError> {
        let mut session = self.session.lock().await;
        let Some(Session { shutdown, task }) = session.take() else {
            return Ok(());
        };

        let _ = shutdown.send(true);
        let joined = task.await;
        *self.shared.connected.lock() = false;
        self.shared.outbound.lock().take();
        self.shared.fail_pending("connection stopped");
        info!(url = %self.url, "hub connection stopped");

        joined.map_err(|e| AuditError::Transport(format!("hub session task failed: {e}")))
    }

    async fn invoke_inner(&self, method: HubMethod, subject_id: SubjectId) -> Result<(), AuditError> {
        let outbound = self
            .shared
            .outbound
            .lock()
            .clone()
            .ok_or_else(|| AuditError::Transport("hub connection is not connected".into()))?;

        let invocation_id = self.shared.next_invocation.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(invocation_id, tx);

        let frame = ClientFrame::Invoke {
            invocation_id,
            target: method,
            subject_id,
        };
        if outbound.send(frame).is_err() {
            self.shared.pending.lock().remove(&invocation_id);
            return Err(AuditError::Transport("hub connection closed".into()));
        }

        match tokio::time::timeout(INVOKE_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AuditError::Transport(
                "hub connection closed before completion".into(),
            )),
            Err(_) => {
                self.shared.pending.lock().remove(&invocation_id);
                Err(AuditError::Transport(format!(
                    "{method:?} timed out after {INVOKE_TIMEOUT:?}"
                )))
            }
        }
    }
}

impl HubConnection for WsHubConnection {
    fn state(&self) -> ConnectionState {
        if *self.shared.connected.lock() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    fn start(&self) -> TransportFuture<'_> {
        Box::pin(self.start_inner())
    }

    fn stop(&self) -> TransportFuture<'_> {
        Box::pin(self.stop_inner())
    }

    fn invoke(&self, method: HubMethod, subject_id: SubjectId) -> TransportFuture<'_> {
        Box::pin(self.invoke_inner(method, subject_id))
    }

    fn set_handlers(&self, handlers: ConnectionHandlers) {
        *self.shared.handlers.write() = Some(handlers);
    }
}

impl Drop for WsHubConnection {
    fn drop(&mut self) {
        if let Some(Session { shutdown, task }) = self.session.get_mut().take() {
            let _ = shutdown.send(true);
            task.abort();
        }
    }
}

impl Shared {
    fn fail_pending(&self, reason: &str) {
        for (_, tx) in self.pending.lock().drain() {
            let _ = tx.send(Err(AuditError::Transport(reason.to_string())));
        }
    }

    fn install_outbound(&self) -> mpsc::UnboundedReceiver<ClientFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.outbound.lock() = Some(tx);
        rx
    }

    fn handlers(&self) -> Option<ConnectionHandlers> {
        self.handlers.read().clone()
    }
}

async fn open(url: &Url) -> Result<WsStream, AuditError> {
    let (socket, _) = connect_async(url.as_str())
        .await
        .map_err(|e| AuditError::Transport(format!("connect to {url}: {e}")))?;
    Ok(socket)
}

/// Owns the socket for the lifetime of one started connection, reconnecting
/// whenever it drops until shutdown is signalled.
async fn run_session(
    url: Url,
    shared: Arc<Shared>,
    socket: WsStream,
    outbound: mpsc::UnboundedReceiver<ClientFrame>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut first = Some((socket, outbound));

    loop {
        let (ws, outbound, reconnected) = match first.take() {
            Some((ws, outbound)) => (ws, outbound, false),
            None => match reconnect(&url, &mut shutdown).await {
                Some(ws) => (ws, shared.install_outbound(), true),
                None => return,
            },
        };

        let end = drive(ws, outbound, &shared, &mut shutdown, reconnected).await;
        shared.outbound.lock().take();
        shared.fail_pending("hub connection lost");

        match end {
            SessionEnd::Shutdown => return,
            SessionEnd::Lost => {
                warn!(url = %url, "hub connection lost, reconnecting");
            }
        }
    }
}

async fn reconnect(url: &Url, shutdown: &mut watch::Receiver<bool>) -> Option<WsStream> {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        tokio::select! {
            _ = shutdown.changed() => return None,
            _ = tokio::time::sleep(backoff) => {}
        }

        match open(url).await {
            Ok(ws) => {
                info!(url = %url, "hub connection re-established");
                return Some(ws);
            }
            Err(e) => {
                debug!(error = %e, ?backoff, "hub reconnect attempt failed");
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

async fn drive(
    ws: WsStream,
    mut out_rx: mpsc::UnboundedReceiver<ClientFrame>,
    shared: &Shared,
    shutdown: &mut watch::Receiver<bool>,
    reconnected: bool,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();

    if reconnected {
        if let Some(handlers) = shared.handlers() {
            (handlers.on_reconnected)();
        }
    }

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                let _ = sink.send(Message::Close(None)).await;
                return SessionEnd::Shutdown;
            }
            Some(frame) = out_rx.recv() => {
                if send_frame(&mut sink, &frame).await.is_err() {
                    return SessionEnd::Lost;
                }
            }
            msg = stream.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Lost,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!(error = %e, "hub receive error");
                        return SessionEnd::Lost;
                    }
                };

                match serde_json::from_str::<ServerFrame>(&text) {
                    Ok(ServerFrame::EntryAdded { entry }) => {
                        if let Some(handlers) = shared.handlers() {
                            (handlers.on_entry)(entry);
                        }
                    }
                    Ok(ServerFrame::Completion { invocation_id, error }) => {
                        if let Some(tx) = shared.pending.lock().remove(&invocation_id) {
                            let _ = tx.send(match error {
                                None => Ok(()),
                                Some(e) => Err(AuditError::Transport(e)),
                            });
                        }
                    }
                    Ok(ServerFrame::Ping) => {
                        if send_frame(&mut sink, &ClientFrame::Pong).await.is_err() {
                            return SessionEnd::Lost;
                        }
                    }
                    Err(e) => debug!(error = %e, "ignoring malformed hub frame"),
                }
            }
        }
    }
}

async fn send_frame<S>(sink: &mut S, frame: &ClientFrame) -> Result<(), AuditError>
where
    S: futures::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = serde_json::to_string(frame)?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| AuditError::Transport(e.to_string()))
}
