use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use super::close::close_code;
use crate::error::GatewayError;

/// How long a locally closed socket waits for the server's close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Notifications a transport delivers back to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Open,
    Message(String),
    Close { code: u16, reason: String },
    Error(String),
}

/// Where a transport delivers its notifications. Each `open` gets its own
/// sink; events from a superseded connection are discarded by the client.
#[derive(Clone)]
pub struct TransportSink {
    deliver: Arc<dyn Fn(TransportEvent) -> bool + Send + Sync>,
}

impl TransportSink {
    pub fn new<F>(deliver: F) -> Self
    where
        F: Fn(TransportEvent) -> bool + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    /// Returns `false` once the client is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        (self.deliver)(event)
    }

    pub fn open(&self) -> bool {
        self.emit(TransportEvent::Open)
    }

    pub fn message(&self, text: impl Into<String>) -> bool {
        self.emit(TransportEvent::Message(text.into()))
    }

    pub fn close(&self, code: u16, reason: impl Into<String>) -> bool {
        self.emit(TransportEvent::Close {
            code,
            reason: reason.into(),
        })
    }

    pub fn error(&self, err: impl fmt::Display) -> bool {
        self.emit(TransportEvent::Error(err.to_string()))
    }
}

impl fmt::Debug for TransportSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSink").finish_non_exhaustive()
    }
}

/// A duplex text-message channel to the gateway.
///
/// Methods must return without waiting on I/O; progress is reported
/// through the [`TransportSink`] handed to `open`.
pub trait Transport: Send + 'static {
    fn open(&mut self, address: &str, sink: TransportSink);

    fn send(&mut self, text: String) -> Result<(), GatewayError>;

    fn close(&mut self, code: u16, reason: &str);
}

/// WebSocket transport on tokio-tungstenite.
#[derive(Debug, Default)]
pub struct WsTransport {
    outbound: Option<mpsc::UnboundedSender<Message>>,
    socket: Option<SocketTask>,
}

/// The task driving one connection.
#[derive(Debug)]
struct SocketTask {
    handle: JoinHandle<()>,
    /// Set once the WebSocket handshake has completed.
    established: Arc<AtomicBool>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for WsTransport {
    fn open(&mut self, address: &str, sink: TransportSink) {
        // An established connection still winding down keeps running detached.
        self.close(close_code::GOING_AWAY, "superseded");

        let (tx, rx) = mpsc::unbounded_channel();
        let established = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run_socket(
            address.to_string(),
            rx,
            sink,
            established.clone(),
        ));
        self.outbound = Some(tx);
        self.socket = Some(SocketTask {
            handle,
            established,
        });
    }

    fn send(&mut self, text: String) -> Result<(), GatewayError> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| GatewayError::Connection("transport is not open".to_string()))?;
        outbound
            .send(Message::Text(text.into()))
            .map_err(|_| GatewayError::Connection("transport is closed".to_string()))
    }

    fn close(&mut self, code: u16, reason: &str) {
        if let Some(socket) = self.socket.take() {
            if !socket.established.load(Ordering::Acquire) {
                // Still inside connect_async: nothing to say goodbye to.
                socket.handle.abort();
            }
        }
        if let Some(outbound) = self.outbound.take() {
            let frame = CloseFrame {
                code: CloseCode::from(code),
                reason: reason.to_string().into(),
            };
            let _ = outbound.send(Message::Close(Some(frame)));
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close(close_code::GOING_AWAY, "client dropped");
    }
}

async fn run_socket(
    address: String,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    sink: TransportSink,
    established: Arc<AtomicBool>,
) {
    let ws = match connect_async(address.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            tracing::warn!("failed to connect to {address}: {e}");
            sink.error(e);
            return;
        }
    };
    established.store(true, Ordering::Release);
    tracing::debug!("connected to {address}");
    if !sink.open() {
        return;
    }

    let (mut ws_sink, mut ws_stream) = ws.split();

    loop {
        tokio::select! {
            msg = outbound.recv() => {
                let msg = msg.unwrap_or_else(|| {
                    Message::Close(Some(CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client dropped".to_string().into(),
                    }))
                });
                let local_close = match &msg {
                    Message::Close(frame) => Some(
                        frame
                            .as_ref()
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((close_code::NORMAL, String::new())),
                    ),
                    _ => None,
                };
                if let Err(e) = ws_sink.send(msg).await {
                    sink.error(e);
                    return;
                }
                if let Some((code, reason)) = local_close {
                    // Drain until the server answers the close or the grace runs out.
                    let _ = tokio::time::timeout(CLOSE_GRACE, async {
                        while let Some(Ok(msg)) = ws_stream.next().await {
                            if msg.is_close() {
                                break;
                            }
                        }
                    })
                    .await;
                    sink.close(code, reason);
                    return;
                }
            }
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !sink.message(text.as_str()) {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((close_code::ABNORMAL, String::new()));
                        tracing::debug!("server closed connection: {code} {reason}");
                        sink.close(code, reason);
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        sink.error(e);
                        return;
                    }
                    None => {
                        sink.close(close_code::ABNORMAL, "connection reset");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_close_during_handshake_drops_the_socket() {
        // Accepts TCP but never answers the upgrade request.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut transport = WsTransport::new();
        let (tx, mut events) = mpsc::unbounded_channel();
        transport.open(
            &format!("ws://127.0.0.1:{port}/ws"),
            TransportSink::new(move |event| tx.send(event).is_ok()),
        );

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("GET /ws"));

        transport.close(close_code::CONNECT_TIMEOUT, "connect timeout");

        let eof = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;
        assert!(eof.is_ok(), "client socket still open after close");
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_before_open_fails() {
        let mut transport = WsTransport::new();
        assert!(matches!(
            transport.send("{}".to_string()),
            Err(GatewayError::Connection(_))
        ));
    }
}
