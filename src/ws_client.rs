// Real-time room channel for live veto collaboration.
//
// Messages travel as JSON envelopes `{type, data}`. Outbound requests ask
// the server to run a veto action for the room's session; inbound
// broadcasts carry the updated session, which the consumer adopts
// wholesale. The channel keeps itself alive with an application-level
// ping every 30 seconds and reconnects with doubling backoff until either
// the attempt budget runs out or the owner asks to disconnect.

use std::time::Duration;

use futures_util::stream::{SplitSink, Stream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::session::model::VetoSession;
use crate::veto::Team;

/// Keep-alive cadence for the application-level ping envelope.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);
/// Base reconnect delay; each attempt doubles it.
pub const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(2000);
/// Ceiling for the doubled reconnect delay.
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_millis(30_000);
/// Reconnect attempts before the channel gives up.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

const CHANNEL_CAPACITY: usize = 256;

/// Wire envelope carried in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

/// Events emitted by the channel to the application layer.
#[derive(Debug)]
pub enum ChannelEvent {
    /// The socket is open and the server accepted the room subscription.
    Connected,
    /// The connection dropped. `will_retry` is false once the attempt
    /// budget is spent; an owner-requested disconnect emits nothing.
    Disconnected { will_retry: bool },
    /// A broadcast carried a full session snapshot to adopt.
    SessionUpdate(Box<VetoSession>),
    /// Another participant passed the turn; no session attached.
    TurnSwapped,
    /// The server reported an error envelope.
    ServerError(String),
}

// ---------------------------------------------------------------------------
// Outbound request builders
// ---------------------------------------------------------------------------

pub fn ban_request(session_id: u64, map_id: u64, team: Team) -> Envelope {
    Envelope::new(
        "veto:ban",
        json!({ "session_id": session_id, "map_id": map_id, "team": team }),
    )
}

pub fn pick_request(session_id: u64, map_id: u64, team: Team) -> Envelope {
    Envelope::new(
        "veto:pick",
        json!({ "session_id": session_id, "map_id": map_id, "team": team }),
    )
}

pub fn swap_request() -> Envelope {
    Envelope::new("veto:swap", json!({}))
}

pub fn start_request() -> Envelope {
    Envelope::new("veto:start", json!({}))
}

pub fn reset_request() -> Envelope {
    Envelope::new("veto:reset", json!({}))
}

fn ping_request() -> Envelope {
    Envelope::new("ping", json!({}))
}

fn pong_reply() -> Envelope {
    Envelope::new("pong", json!({ "message": "pong" }))
}

fn parse_error_reply(raw: &str) -> Envelope {
    Envelope::new(
        "error",
        json!({ "message": "Failed to parse message", "raw": raw }),
    )
}

// ---------------------------------------------------------------------------
// Inbound event mapping
// ---------------------------------------------------------------------------

/// Map one parsed envelope to an application event, or nothing when the
/// envelope is pure plumbing. Malformed session payloads are logged and
/// dropped rather than adopted.
pub fn event_from_envelope(envelope: Envelope) -> Option<ChannelEvent> {
    match envelope.kind.as_str() {
        "room:state" => session_from(&envelope.data, "veto_session"),
        "veto:ban" | "veto:pick" | "veto:start" | "veto:reset" => {
            session_from(&envelope.data, "session")
        }
        // The swap broadcast carries no session; the consumer re-queries
        // or flips its local view.
        "veto:swap" => {
            session_from(&envelope.data, "session").or(Some(ChannelEvent::TurnSwapped))
        }
        "pong" => None,
        "error" => {
            let message = envelope
                .data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unspecified server error")
                .to_string();
            Some(ChannelEvent::ServerError(message))
        }
        other => {
            debug!(kind = other, "ignoring unrecognized envelope");
            None
        }
    }
}

fn session_from(data: &Value, key: &str) -> Option<ChannelEvent> {
    let payload = data.get(key)?;
    if payload.is_null() {
        return None;
    }
    match serde_json::from_value::<VetoSession>(payload.clone()) {
        Ok(session) => Some(ChannelEvent::SessionUpdate(Box::new(session))),
        Err(e) => {
            warn!("discarding malformed session payload: {e}");
            None
        }
    }
}

/// Backoff before reconnect `attempt` (1-based): the base delay doubled
/// per attempt, capped.
pub fn reconnect_delay(attempt: u32) -> Duration {
    let base = INITIAL_RECONNECT_DELAY.as_millis() as u64;
    let cap = MAX_RECONNECT_DELAY.as_millis() as u64;
    Duration::from_millis((base << attempt.min(8)).min(cap))
}

// ---------------------------------------------------------------------------
// Frame pump
// ---------------------------------------------------------------------------

/// Read frames from `stream`, forwarding application events through
/// `events` and protocol replies (pongs, parse-error reports) through
/// `replies`. Returns `Err(())` when the event receiver is gone,
/// signalling the owner has shut down.
///
/// Generic over the stream so it can be driven from in-memory frames in
/// tests without opening sockets.
pub async fn pump_frames<St>(
    mut stream: St,
    events: &mpsc::Sender<ChannelEvent>,
    replies: &mpsc::Sender<Envelope>,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let raw = text.to_string();
                match serde_json::from_str::<Envelope>(&raw) {
                    Ok(envelope) if envelope.kind == "ping" => {
                        if replies.send(pong_reply()).await.is_err() {
                            return Err(());
                        }
                    }
                    Ok(envelope) => {
                        if let Some(event) = event_from_envelope(envelope) {
                            if events.send(event).await.is_err() {
                                return Err(());
                            }
                        }
                    }
                    Err(e) => {
                        warn!("unparseable channel payload: {e}");
                        if replies.send(parse_error_reply(&raw)).await.is_err() {
                            return Err(());
                        }
                    }
                }
            }
            Ok(Message::Close(_)) => {
                info!("server closed the room channel");
                break;
            }
            Err(e) => {
                warn!("room channel error: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Connection driver
// ---------------------------------------------------------------------------

enum Command {
    Send(Envelope),
    Shutdown,
}

enum Drive {
    /// Owner requested disconnect; no further events.
    Shutdown,
    /// Transport dropped out from under us; eligible for reconnect.
    ConnectionLost,
    /// Event receiver dropped; nobody is listening anymore.
    OwnerGone,
}

/// Handle to a live room subscription. Dropping the handle (or calling
/// [`disconnect`](Self::disconnect)) closes the socket and abandons any
/// pending reconnect.
pub struct RoomChannel {
    cmd_tx: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl RoomChannel {
    /// Open a channel to `room_id`, authenticating with `token`. Events
    /// arrive on the returned receiver; the connection (and its reconnect
    /// loop) lives on a background task.
    pub fn connect(
        ws_base: &str,
        room_id: u64,
        token: &str,
    ) -> (Self, mpsc::Receiver<ChannelEvent>) {
        let url = room_url(ws_base, room_id, token);
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(run_channel(url, events_tx, cmd_rx));
        (Self { cmd_tx, task }, events_rx)
    }

    /// Queue an envelope for the server. Returns false once the channel
    /// has shut down.
    pub async fn send(&self, envelope: Envelope) -> bool {
        self.cmd_tx.send(Command::Send(envelope)).await.is_ok()
    }

    /// Close the socket and stop reconnecting. Idempotent with respect to
    /// an already-dead channel.
    pub async fn disconnect(self) {
        let _ = self.cmd_tx.send(Command::Shutdown).await;
        let _ = self.task.await;
    }
}

fn room_url(ws_base: &str, room_id: u64, token: &str) -> String {
    format!(
        "{}/ws/room/{room_id}?token={token}",
        ws_base.trim_end_matches('/')
    )
}

async fn run_channel(
    url: String,
    events: mpsc::Sender<ChannelEvent>,
    mut cmd_rx: mpsc::Receiver<Command>,
) {
    let mut attempts: u32 = 0;
    loop {
        match tokio_tungstenite::connect_async(&url).await {
            Ok((ws, _response)) => {
                attempts = 0;
                if events.send(ChannelEvent::Connected).await.is_err() {
                    return;
                }
                match drive_connection(ws, &events, &mut cmd_rx).await {
                    Drive::Shutdown | Drive::OwnerGone => return,
                    Drive::ConnectionLost => {}
                }
            }
            Err(e) => {
                warn!("room channel connect failed: {e}");
            }
        }

        attempts += 1;
        if attempts > MAX_RECONNECT_ATTEMPTS {
            let _ = events
                .send(ChannelEvent::Disconnected { will_retry: false })
                .await;
            return;
        }
        if events
            .send(ChannelEvent::Disconnected { will_retry: true })
            .await
            .is_err()
        {
            return;
        }

        let delay = reconnect_delay(attempts);
        info!(
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "reconnecting room channel"
        );
        let deadline = tokio::time::Instant::now() + delay;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Shutdown) | None => return,
                    Some(Command::Send(_)) => {
                        warn!("room channel is reconnecting, outbound message dropped");
                    }
                },
            }
        }
    }
}

/// Drive one live connection: pump inbound frames, write queued outbound
/// envelopes and replies, and keep the ping cadence.
async fn drive_connection<S>(
    ws: WebSocketStream<S>,
    events: &mpsc::Sender<ChannelEvent>,
    cmd_rx: &mut mpsc::Receiver<Command>,
) -> Drive
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, stream) = ws.split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<Envelope>(16);
    let mut ping = tokio::time::interval_at(
        tokio::time::Instant::now() + PING_INTERVAL,
        PING_INTERVAL,
    );
    let mut pump = std::pin::pin!(pump_frames(stream, events, &reply_tx));

    loop {
        tokio::select! {
            result = &mut pump => {
                return match result {
                    Ok(()) => Drive::ConnectionLost,
                    Err(()) => Drive::OwnerGone,
                };
            }
            Some(reply) = reply_rx.recv() => {
                if send_envelope(&mut sink, reply).await.is_err() {
                    return Drive::ConnectionLost;
                }
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send(envelope)) => {
                    if send_envelope(&mut sink, envelope).await.is_err() {
                        return Drive::ConnectionLost;
                    }
                }
                Some(Command::Shutdown) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Drive::Shutdown;
                }
            },
            _ = ping.tick() => {
                if send_envelope(&mut sink, ping_request()).await.is_err() {
                    return Drive::ConnectionLost;
                }
            }
        }
    }
}

async fn send_envelope<S>(
    sink: &mut SplitSink<WebSocketStream<S>, Message>,
    envelope: Envelope,
) -> Result<(), WsError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let text = match serde_json::to_string(&envelope) {
        Ok(text) => text,
        Err(e) => {
            warn!("dropping unencodable outbound envelope: {e}");
            return Ok(());
        }
    };
    sink.send(Message::Text(text.into())).await
}
