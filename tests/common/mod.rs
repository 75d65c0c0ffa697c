#![allow(dead_code)]

use std::time::Duration;

use accordclient::gateway::intents::Intents;
use accordclient::{GatewayConfig, GatewayEvent};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

pub const TOKEN: &str = "MTIzNDU2Nzg5.GhIjKl.abc-DEF_123";
pub const WAIT: Duration = Duration::from_secs(5);

/// What the fake gateway saw from the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(Value),
    Close(u16),
}

/// One accepted client connection, driven by the test.
pub struct ServerConn {
    incoming: mpsc::UnboundedReceiver<Frame>,
    outgoing: mpsc::UnboundedSender<Message>,
}

impl ServerConn {
    pub fn send(&self, msg: Value) {
        let _ = self.outgoing.send(Message::Text(msg.to_string().into()));
    }

    pub fn hello(&self, heartbeat_interval: u64) {
        self.send(serde_json::json!({
            "op": 5,
            "data": { "heartbeat_interval": heartbeat_interval }
        }));
    }

    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.outgoing.send(Message::Close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        })));
    }

    pub async fn recv(&mut self) -> Frame {
        tokio::time::timeout(WAIT, self.incoming.recv())
            .await
            .expect("timed out waiting for the client")
            .expect("client connection ended")
    }

    /// Next text frame with the given opcode, skipping heartbeats and
    /// anything else.
    pub async fn recv_op(&mut self, op: u64) -> Value {
        loop {
            if let Frame::Text(msg) = self.recv().await {
                if msg["op"] == op {
                    return msg;
                }
            }
        }
    }
}

/// A minimal gateway server on a random local port.
pub struct FakeGateway {
    pub url: String,
    conns: mpsc::UnboundedReceiver<ServerConn>,
}

impl FakeGateway {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, conns) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                let (mut sink, mut stream) = ws.split();
                let (in_tx, incoming) = mpsc::unbounded_channel();
                let (outgoing, mut out_rx) = mpsc::unbounded_channel::<Message>();

                tokio::spawn(async move {
                    while let Some(msg) = out_rx.recv().await {
                        let closing = msg.is_close();
                        if sink.send(msg).await.is_err() || closing {
                            break;
                        }
                    }
                });
                tokio::spawn(async move {
                    while let Some(Ok(msg)) = stream.next().await {
                        match msg {
                            Message::Text(text) => {
                                if let Ok(value) = serde_json::from_str(text.as_str()) {
                                    let _ = in_tx.send(Frame::Text(value));
                                }
                            }
                            Message::Close(frame) => {
                                let code = frame.map(|f| u16::from(f.code)).unwrap_or(1005);
                                let _ = in_tx.send(Frame::Close(code));
                                break;
                            }
                            _ => {}
                        }
                    }
                });

                if tx.send(ServerConn { incoming, outgoing }).is_err() {
                    break;
                }
            }
        });

        Self {
            url: format!("ws://127.0.0.1:{}/ws", addr.port()),
            conns,
        }
    }

    pub async fn accept(&mut self) -> ServerConn {
        tokio::time::timeout(WAIT, self.conns.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("listener stopped")
    }

    pub fn config(&self) -> GatewayConfig {
        GatewayConfig::new(TOKEN, Intents::non_privileged()).with_address(self.url.clone())
    }
}

/// Wait for the first event matching `pred`.
pub async fn wait_for<F>(events: &mut broadcast::Receiver<GatewayEvent>, mut pred: F) -> GatewayEvent
where
    F: FnMut(&GatewayEvent) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
