//! Connection driver
//!
//! Owns the WebSocket. Each connection runs a writer task fed by an mpsc
//! queue, the heartbeat monitor, and a receive loop that feeds frames to the
//! [`SessionMachine`] and carries out the resulting actions. When the
//! transport drops, the driver reconnects and resumes.

use super::heartbeat::{HeartbeatExit, HeartbeatMonitor};
use super::machine::{Action, SessionMachine};
use super::session::{SessionHandle, SessionState};
use crate::error::{GatewayError, GatewayResult};
use crate::events::{EventBus, ON_CONNECT};
use crate::protocol::{CloseCode, Envelope};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Time allowed for flushing queued frames and the close handshake
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Close code sent when dropping a connection we intend to resume.
/// 1000 and 1001 would invalidate the session.
const RESUMABLE_CLOSE_CODE: u16 = 4000;

/// Transport-level settings for one session
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Gateway URL used for the first connection
    pub url: String,
    /// Wait before reconnecting after a drop
    pub reconnect_delay: Duration,
    /// Consecutive failed reconnects before giving up
    pub max_reconnect_attempts: u32,
    /// Capacity of the outbound frame queue
    pub outbound_buffer: usize,
    /// Treat unacknowledged heartbeats as a dead connection
    pub zombie_detection: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            url: "wss://gateway.discord.gg/?v=9&encoding=json".to_string(),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_attempts: 5,
            outbound_buffer: 100,
            zombie_detection: true,
        }
    }
}

/// How a single connection ended
#[derive(Debug)]
enum ConnectionEnd {
    /// `close()` was called
    Closed,
    /// Unrecoverable protocol failure
    Fatal(GatewayError),
    /// The transport went away; maybe reconnect
    Dropped { code: Option<u16>, reason: String },
}

impl ConnectionEnd {
    fn dropped(reason: impl Into<String>) -> Self {
        Self::Dropped {
            code: None,
            reason: reason.into(),
        }
    }

    /// Close code we send on our side of the teardown
    fn close_code(&self) -> u16 {
        match self {
            Self::Closed | Self::Fatal(_) => 1000,
            Self::Dropped { .. } => RESUMABLE_CLOSE_CODE,
        }
    }
}

/// Runs one session until it closes or fails for good
pub struct SessionDriver {
    settings: DriverSettings,
    machine: SessionMachine,
    session: SessionHandle,
    bus: Arc<EventBus>,
}

impl SessionDriver {
    #[must_use]
    pub fn new(settings: DriverSettings, machine: SessionMachine, bus: Arc<EventBus>) -> Self {
        let session = machine.session().clone();
        Self {
            settings,
            machine,
            session,
            bus,
        }
    }

    /// Connect and run until the session ends.
    ///
    /// # Errors
    /// - `Transport` when the very first connection cannot be opened
    /// - `MalformedPayload` / `FatalInvalidSession` from the protocol
    /// - `Closed` when the server closes with a code that forbids reconnecting
    /// - `ConnectionLost` when reconnect attempts run out
    pub async fn run(mut self) -> GatewayResult<()> {
        let mut attempts: u32 = 0;
        let mut first = true;

        let result = loop {
            if self.session.is_close_requested() {
                break Ok(());
            }

            let url = self.connect_url();
            self.session.set_state(SessionState::Connecting);
            tracing::info!(url = %url, attempt = attempts, "Connecting to gateway");

            let end = match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok((stream, _response)) => {
                    first = false;
                    self.run_connection(stream).await
                }
                Err(e) if first => break Err(GatewayError::from(e)),
                Err(e) => ConnectionEnd::dropped(e.to_string()),
            };

            match end {
                ConnectionEnd::Closed => break Ok(()),
                ConnectionEnd::Fatal(err) => break Err(err),
                ConnectionEnd::Dropped { code, reason } => {
                    if !CloseCode::allows_reconnect(code) {
                        let code = code.unwrap_or_default();
                        tracing::error!(code, reason = %reason, "Gateway closed the session");
                        break Err(GatewayError::closed(code, reason));
                    }

                    // A handshake that completed resets the budget
                    if self.session.state() == SessionState::Active {
                        attempts = 0;
                    }
                    attempts += 1;
                    if attempts > self.settings.max_reconnect_attempts {
                        tracing::error!(attempts = attempts - 1, "Reconnect attempts exhausted");
                        break Err(GatewayError::ConnectionLost {
                            attempts: attempts - 1,
                        });
                    }

                    tracing::warn!(
                        code = ?code,
                        reason = %reason,
                        attempt = attempts,
                        delay_ms = self.settings.reconnect_delay.as_millis(),
                        "Connection dropped, reconnecting"
                    );

                    tokio::select! {
                        () = tokio::time::sleep(self.settings.reconnect_delay) => {}
                        () = self.session.close_requested() => break Ok(()),
                    }
                }
            }
        };

        self.session.set_state(SessionState::Closed);
        result
    }

    /// URL for the next connection: the resume URL from READY when known
    fn connect_url(&self) -> String {
        match self.session.resume_url() {
            Some(resume) if self.session.session_id().is_some() => {
                with_query_of(&resume, &self.settings.url)
            }
            _ => self.settings.url.clone(),
        }
    }

    async fn run_connection(&mut self, stream: WsStream) -> ConnectionEnd {
        let (sink, mut stream) = stream.split();
        let (tx, rx) = mpsc::channel::<Envelope>(self.settings.outbound_buffer.max(1));
        let writer = spawn_writer(sink, rx);

        self.machine.connection_opened();
        tracing::info!("Gateway connection established");
        self.bus.emit(ON_CONNECT, Value::Null).await;

        let mut heartbeat: Option<HeartbeatMonitor> = None;
        let mut delayed: Option<JoinHandle<()>> = None;

        let end = loop {
            if self.session.is_close_requested() {
                break ConnectionEnd::Closed;
            }

            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let envelope = match Envelope::from_json(&text) {
                            Ok(envelope) => envelope,
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to decode gateway frame");
                                break ConnectionEnd::Fatal(e);
                            }
                        };
                        tracing::trace!(frame = %envelope, "Frame received");

                        let actions = match self.machine.handle(envelope) {
                            Ok(actions) => actions,
                            Err(e) => break ConnectionEnd::Fatal(e),
                        };
                        if let Err(end) = self.execute(actions, &tx, &mut heartbeat, &mut delayed).await {
                            break end;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        break ConnectionEnd::Fatal(GatewayError::MalformedPayload(
                            "binary frames are not supported".to_string(),
                        ));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                            .unwrap_or((None, String::new()));
                        tracing::info!(code = ?code, reason = %reason, "Gateway closed the connection");
                        break ConnectionEnd::Dropped { code, reason };
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong are answered by tungstenite
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "WebSocket error");
                        break ConnectionEnd::dropped(e.to_string());
                    }
                    None => break ConnectionEnd::dropped("stream ended"),
                },
                exit = wait_heartbeat(&mut heartbeat) => {
                    break ConnectionEnd::dropped(exit.to_string());
                }
                () = self.session.close_requested() => break ConnectionEnd::Closed,
            }
        };

        // Teardown
        if let Some(monitor) = heartbeat.take() {
            monitor.cancel();
        }
        if let Some(pending) = delayed.take() {
            pending.abort();
        }
        drop(tx);
        close_writer(writer, end.close_code()).await;

        tracing::debug!(end = ?end, "Gateway connection closed");
        end
    }

    /// Carry out the machine's actions in order
    async fn execute(
        &self,
        actions: Vec<Action>,
        tx: &mpsc::Sender<Envelope>,
        heartbeat: &mut Option<HeartbeatMonitor>,
        delayed: &mut Option<JoinHandle<()>>,
    ) -> Result<(), ConnectionEnd> {
        for action in actions {
            match action {
                Action::StartHeartbeat(interval) => {
                    if let Some(previous) = heartbeat.take() {
                        previous.cancel();
                    }
                    *heartbeat = Some(HeartbeatMonitor::start(
                        interval,
                        self.session.clone(),
                        tx.clone(),
                        self.settings.zombie_detection,
                    ));
                }
                Action::Send(envelope) => send(tx, envelope).await?,
                Action::SendAfter(delay, envelope) => {
                    // Runs beside the receive loop so ACKs keep being read
                    if let Some(previous) = delayed.take() {
                        previous.abort();
                    }
                    *delayed = Some(spawn_delayed_send(
                        delay,
                        envelope,
                        tx.clone(),
                        self.session.clone(),
                    ));
                }
                Action::Publish { event, data } => {
                    self.bus.emit(&event, data).await;
                }
            }
        }
        Ok(())
    }
}

async fn send(tx: &mpsc::Sender<Envelope>, envelope: Envelope) -> Result<(), ConnectionEnd> {
    tracing::trace!(frame = %envelope, "Frame queued");
    tx.send(envelope)
        .await
        .map_err(|_| ConnectionEnd::dropped("outbound channel closed"))
}

/// Send `envelope` after `delay` unless the session closes first
fn spawn_delayed_send(
    delay: Duration,
    envelope: Envelope,
    tx: mpsc::Sender<Envelope>,
    session: SessionHandle,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = tokio::time::sleep(delay) => {
                if send(&tx, envelope).await.is_err() {
                    tracing::debug!("Connection gone before delayed frame was sent");
                }
            }
            () = session.close_requested() => {}
        }
    })
}

/// Resolves when the heartbeat task stops on its own; pending while none runs
async fn wait_heartbeat(heartbeat: &mut Option<HeartbeatMonitor>) -> HeartbeatExit {
    match heartbeat.as_mut() {
        Some(monitor) => monitor.stopped().await,
        None => std::future::pending().await,
    }
}

fn spawn_writer(mut sink: WsSink, mut rx: mpsc::Receiver<Envelope>) -> JoinHandle<WsSink> {
    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            if let Err(e) = sink.send(Message::Text(envelope.to_json())).await {
                tracing::warn!(error = %e, "Failed to send frame to WebSocket");
                break;
            }
        }
        sink
    })
}

/// Flush the writer, then send a close frame with `code`
async fn close_writer(writer: JoinHandle<WsSink>, code: u16) {
    let flushed = tokio::time::timeout(TEARDOWN_TIMEOUT, writer).await;
    let Ok(Ok(mut sink)) = flushed else {
        tracing::debug!("Writer did not finish in time");
        return;
    };

    let frame = CloseFrame {
        code: WsCloseCode::from(code),
        reason: "".into(),
    };
    let close = async {
        let _ = sink.send(Message::Close(Some(frame))).await;
        let _ = sink.close().await;
    };
    let _ = tokio::time::timeout(TEARDOWN_TIMEOUT, close).await;
}

/// Carry the query string of `base` (version, encoding) over to `url`
fn with_query_of(url: &str, base: &str) -> String {
    match base.split_once('?') {
        Some((_, query)) if !url.contains('?') => {
            format!("{}/?{query}", url.trim_end_matches('/'))
        }
        _ => url.to_string(),
    }
}
