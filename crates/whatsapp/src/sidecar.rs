//! WebSocket connection to the WhatsApp Web sidecar.
//!
//! The sidecar owns the browser session; we exchange JSON frames with it.
//! Outbound sends are matched to their acknowledgement by request id.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    anyhow::Context as _,
    chatrelay_channels::{Error, Result},
    chatrelay_config::WhatsAppConfig,
    futures::{SinkExt, StreamExt},
    tokio::{
        net::TcpStream,
        sync::{Mutex, mpsc, oneshot},
    },
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
    tracing::{debug, info, warn},
};

use crate::types::{GatewayMessage, SidecarMessage};

/// Upper bound for the delay between connection attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Receives every sidecar frame except acknowledgements.
pub type MessageCallback = Arc<dyn Fn(SidecarMessage) + Send + Sync>;

/// Resolves with the close reason once the connection has ended.
pub type DisconnectReceiver = oneshot::Receiver<Option<String>>;

type AckOutcome = std::result::Result<(), String>;
type PendingAcks = Arc<Mutex<HashMap<String, oneshot::Sender<AckOutcome>>>>;
type SidecarSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live connection to the sidecar. Dropping it closes the socket.
pub struct SidecarHandle {
    write_tx: mpsc::UnboundedSender<String>,
    pending: PendingAcks,
    connected: Arc<AtomicBool>,
    ack_timeout: Duration,
}

impl SidecarHandle {
    pub async fn connect(
        url: &str,
        ack_timeout: Duration,
        callback: MessageCallback,
    ) -> anyhow::Result<(Self, DisconnectReceiver)> {
        let (socket, _response) = connect_async(url)
            .await
            .with_context(|| format!("failed to connect to whatsapp sidecar at {url}"))?;
        info!(url, "connected to whatsapp sidecar");

        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let pending = PendingAcks::default();
        let connected = Arc::new(AtomicBool::new(true));
        let (closed_tx, closed_rx) = oneshot::channel();

        tokio::spawn(connection_loop(
            socket,
            write_rx,
            Arc::clone(&pending),
            Arc::clone(&connected),
            callback,
            closed_tx,
        ));

        Ok((
            Self {
                write_tx,
                pending,
                connected,
                ack_timeout,
            },
            closed_rx,
        ))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Send a frame and wait for the sidecar to acknowledge it.
    pub async fn request(&self, message: GatewayMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::unavailable("whatsapp sidecar is not connected"));
        }

        let request_id = message.request_id().to_owned();
        let json = serde_json::to_string(&message)?;
        let (ack_tx, ack_rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.clone(), ack_tx);

        if self.write_tx.send(json).is_err() {
            self.pending.lock().await.remove(&request_id);
            return Err(Error::unavailable("whatsapp sidecar connection closed"));
        }

        match tokio::time::timeout(self.ack_timeout, ack_rx).await {
            Ok(Ok(Ok(()))) => {
                debug!(request_id, "sidecar acknowledged delivery");
                Ok(())
            },
            Ok(Ok(Err(reason))) => Err(Error::rejected("whatsapp_web", reason)),
            Ok(Err(_)) => Err(Error::unavailable(
                "whatsapp sidecar disconnected before acknowledging",
            )),
            Err(_) => {
                self.pending.lock().await.remove(&request_id);
                Err(Error::Timeout(self.ack_timeout))
            },
        }
    }
}

/// Connect, retrying with exponential backoff while the sidecar is starting.
pub async fn connect_with_retry(
    config: &WhatsAppConfig,
    callback: MessageCallback,
) -> anyhow::Result<(SidecarHandle, DisconnectReceiver)> {
    let attempts = config.connect_attempts.max(1);
    let ack_timeout = Duration::from_secs(config.ack_timeout_secs);
    let mut backoff = Duration::from_millis(config.connect_backoff_ms);
    let mut attempt = 1;

    loop {
        match SidecarHandle::connect(&config.sidecar_url, ack_timeout, Arc::clone(&callback)).await
        {
            Ok(connection) => return Ok(connection),
            Err(e) if attempt < attempts => {
                warn!(attempt, attempts, delay = ?backoff, error = %e, "sidecar not reachable, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
                attempt += 1;
            },
            Err(e) => return Err(e.context(format!("gave up after {attempts} attempts"))),
        }
    }
}

async fn connection_loop(
    socket: SidecarSocket,
    mut write_rx: mpsc::UnboundedReceiver<String>,
    pending: PendingAcks,
    connected: Arc<AtomicBool>,
    callback: MessageCallback,
    closed_tx: oneshot::Sender<Option<String>>,
) {
    let (mut sink, mut reader) = socket.split();

    let reason = loop {
        tokio::select! {
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => route_frame(text.as_str(), &pending, &callback).await,
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = sink.send(Message::Pong(data)).await {
                        break Some(e.to_string());
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    break frame.map(|f| f.reason.as_str().to_owned());
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => break Some(e.to_string()),
                None => break None,
            },
            json = write_rx.recv() => match json {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        break Some(e.to_string());
                    }
                },
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break None;
                },
            },
        }
    };

    connected.store(false, Ordering::SeqCst);
    // Dropping the senders fails every request still waiting for an ack.
    pending.lock().await.clear();
    debug!(?reason, "whatsapp sidecar connection ended");
    let _ = closed_tx.send(reason);
}

async fn route_frame(text: &str, pending: &PendingAcks, callback: &MessageCallback) {
    match serde_json::from_str::<SidecarMessage>(text) {
        Ok(SidecarMessage::Ack {
            request_id,
            success,
            error,
        }) => {
            let Some(waiter) = pending.lock().await.remove(&request_id) else {
                debug!(request_id, "ack for unknown request");
                return;
            };
            let outcome = if success {
                Ok(())
            } else {
                Err(error.unwrap_or_else(|| "sidecar refused the message".into()))
            };
            let _ = waiter.send(outcome);
        },
        Ok(message) => callback(message),
        Err(e) => warn!(error = %e, "ignoring unrecognised sidecar frame"),
    }
}
