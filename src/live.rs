// Live session orchestration.
//
// The central event loop that coordinates room-channel pushes, turn-timer
// expiry and caller commands into a single stream of view updates for an
// embedding UI. Owns the session synchronizer and the timer; all veto
// mutations happen synchronously inside the event that triggers them.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::VetoTransport;
use crate::session::sync::{SessionSync, VetoView};
use crate::timer::{TurnExpired, TurnTimer};
use crate::veto::{LogEntry, Side, Team};
use crate::ws_client::{swap_request, ChannelEvent, RoomChannel};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Caller requests into the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ban a map by display name.
    Ban(String),
    /// Pick a map by display name.
    Pick(String),
    /// Choose a starting side for the most recent pick.
    SelectSide(Side, Team),
    /// Move a not-started session into progress.
    Start,
    /// Ask the room to pass the turn (live channel only).
    Swap,
    /// Wipe the session back to its fresh state.
    Reset,
    /// Stop the timer, close the channel and end the loop.
    Quit,
}

/// Updates pushed to the embedding UI.
#[derive(Debug)]
pub enum LiveUpdate {
    /// Fresh projection after an adopted session change.
    Snapshot(Box<SessionSnapshot>),
    /// Room channel connectivity changed.
    Connection { connected: bool, will_retry: bool },
    /// Another participant passed the turn.
    TurnSwapped,
    /// The turn timer ran out and no auto-pass was requested.
    TurnExpired,
    /// A command or a server push failed; prior state is unchanged.
    Error(String),
}

/// Everything a UI needs to render one session state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub view: VetoView,
    pub log: Vec<LogEntry>,
    pub connected: bool,
}

// ---------------------------------------------------------------------------
// LiveState
// ---------------------------------------------------------------------------

/// The complete live-loop state.
pub struct LiveState<T: VetoTransport> {
    pub sync: SessionSync<T>,
    pub timer: TurnTimer,
    /// Outbound half of the room channel, when one is attached. Swap
    /// requests and auto-pass both need it; everything else goes through
    /// the synchronizer's transport.
    pub channel: Option<RoomChannel>,
    /// When true, timer expiry sends a swap request instead of only
    /// notifying the UI.
    pub auto_pass: bool,
    pub connected: bool,
    /// Team whose turn the running timer currently covers. `None` forces
    /// a restart on the next adoption.
    last_turn: Option<Team>,
}

impl<T: VetoTransport> LiveState<T> {
    pub fn new(sync: SessionSync<T>, timer: TurnTimer) -> Self {
        Self {
            sync,
            timer,
            channel: None,
            auto_pass: false,
            connected: false,
            last_turn: None,
        }
    }

    pub fn with_channel(mut self, channel: RoomChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_auto_pass(mut self, enabled: bool) -> Self {
        self.auto_pass = enabled;
        self
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the live session event loop.
///
/// Listens on three channels using `tokio::select!`:
/// 1. Push events from the room channel (when one is attached)
/// 2. Turn-timer expiry
/// 3. Caller commands
///
/// Pushes [`LiveUpdate`]s through `updates_tx` for the embedding UI.
pub async fn run<T: VetoTransport>(
    mut channel_rx: Option<mpsc::Receiver<ChannelEvent>>,
    mut expired_rx: mpsc::Receiver<TurnExpired>,
    mut cmd_rx: mpsc::Receiver<Command>,
    updates_tx: mpsc::Sender<LiveUpdate>,
    mut state: LiveState<T>,
) -> anyhow::Result<()> {
    info!("live session loop started");

    // Track whether each side channel is still open. A closed receiver is
    // replaced by a pending future so tokio::select! never spins on it.
    let mut channel_open = channel_rx.is_some();
    let mut timer_open = true;

    // A session loaded before the loop started gets an initial snapshot.
    if state.sync.session().is_some() {
        refresh_timer(&mut state);
        push_snapshot(&state, &updates_tx).await;
    }

    loop {
        tokio::select! {
            // --- Room channel pushes ---
            event = next_channel_event(&mut channel_rx), if channel_open => {
                match event {
                    Some(event) => {
                        handle_channel_event(&mut state, event, &updates_tx).await;
                    }
                    None => {
                        debug!("room channel task ended");
                        channel_open = false;
                        state.connected = false;
                    }
                }
            }

            // --- Turn timer expiry ---
            expiry = expired_rx.recv(), if timer_open => {
                match expiry {
                    Some(TurnExpired) => {
                        handle_turn_expiry(&mut state, &updates_tx).await;
                    }
                    None => {
                        debug!("timer channel closed");
                        timer_open = false;
                    }
                }
            }

            // --- Caller commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Quit) => {
                        info!("quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_command(&mut state, cmd, &updates_tx).await;
                    }
                    None => {
                        info!("command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    shutdown(state).await;
    Ok(())
}

async fn next_channel_event(
    rx: &mut Option<mpsc::Receiver<ChannelEvent>>,
) -> Option<ChannelEvent> {
    match rx.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Event handlers
// ---------------------------------------------------------------------------

async fn handle_command<T: VetoTransport>(
    state: &mut LiveState<T>,
    cmd: Command,
    updates: &mpsc::Sender<LiveUpdate>,
) {
    let result = match cmd {
        Command::Ban(name) => state.sync.ban_map(&name).await,
        Command::Pick(name) => state.sync.pick_map(&name).await,
        Command::SelectSide(side, team) => state.sync.select_side(side, team).await,
        Command::Start => state.sync.start_session().await,
        Command::Reset => state.sync.reset_session().await,
        Command::Swap => {
            // Swaps have no REST endpoint; they only exist on the wire
            // channel, which relays them to every room participant.
            let sent = match &state.channel {
                Some(channel) => channel.send(swap_request()).await,
                None => false,
            };
            if !sent {
                let _ = updates
                    .send(LiveUpdate::Error(
                        "turn swap needs a live room channel".to_string(),
                    ))
                    .await;
            }
            return;
        }
        // Handled by the loop before dispatch.
        Command::Quit => return,
    };

    match result {
        Ok(()) => {
            refresh_timer(state);
            push_snapshot(state, updates).await;
        }
        Err(e) => {
            warn!("command failed: {e}");
            let _ = updates.send(LiveUpdate::Error(e.to_string())).await;
        }
    }
}

async fn handle_channel_event<T: VetoTransport>(
    state: &mut LiveState<T>,
    event: ChannelEvent,
    updates: &mpsc::Sender<LiveUpdate>,
) {
    match event {
        ChannelEvent::Connected => {
            info!("room channel connected");
            state.connected = true;
            let _ = updates
                .send(LiveUpdate::Connection {
                    connected: true,
                    will_retry: false,
                })
                .await;
        }
        ChannelEvent::Disconnected { will_retry } => {
            warn!("room channel disconnected (will_retry={will_retry})");
            state.connected = false;
            let _ = updates
                .send(LiveUpdate::Connection {
                    connected: false,
                    will_retry,
                })
                .await;
        }
        ChannelEvent::SessionUpdate(session) => {
            if state.sync.apply_remote_update(*session) {
                refresh_timer(state);
                push_snapshot(state, updates).await;
            }
        }
        ChannelEvent::TurnSwapped => {
            // The server relays swaps without touching the session, so only
            // the turn clock moves here.
            debug!("turn passed by a room participant");
            if state.timer.is_running() {
                state.timer.start();
            }
            let _ = updates.send(LiveUpdate::TurnSwapped).await;
        }
        ChannelEvent::ServerError(message) => {
            warn!("server reported an error: {message}");
            let _ = updates.send(LiveUpdate::Error(message)).await;
        }
    }
}

async fn handle_turn_expiry<T: VetoTransport>(
    state: &mut LiveState<T>,
    updates: &mpsc::Sender<LiveUpdate>,
) {
    info!("turn timer expired");
    if state.auto_pass {
        if let Some(channel) = &state.channel {
            if channel.send(swap_request()).await {
                debug!("requested a turn pass after expiry");
                return;
            }
            warn!("turn pass request failed, channel is gone");
        }
    }
    let _ = updates.send(LiveUpdate::TurnExpired).await;
}

// ---------------------------------------------------------------------------
// Derived-state upkeep
// ---------------------------------------------------------------------------

/// Bring the timer in line with the freshly adopted session: restart it
/// when the turn changed, stop it when the veto is finished or not yet
/// started, and pick up the session's configured duration.
fn refresh_timer<T: VetoTransport>(state: &mut LiveState<T>) {
    let Some(view) = state.sync.view() else {
        state.timer.stop();
        state.last_turn = None;
        return;
    };

    if let Some(session) = state.sync.session() {
        let secs = session.timer_seconds;
        if secs != state.timer.duration_secs() {
            state.timer.set_duration(secs);
            state.last_turn = None;
        }
    }

    if !view.started || view.finished {
        state.timer.stop();
        state.last_turn = None;
    } else if state.last_turn != Some(view.current_team) {
        state.timer.start();
        state.last_turn = Some(view.current_team);
    }
}

async fn push_snapshot<T: VetoTransport>(
    state: &LiveState<T>,
    updates: &mpsc::Sender<LiveUpdate>,
) {
    if let Some(view) = state.sync.view() {
        let snapshot = SessionSnapshot {
            view,
            log: state.sync.log().to_vec(),
            connected: state.connected,
        };
        let _ = updates.send(LiveUpdate::Snapshot(Box::new(snapshot))).await;
    }
}

async fn shutdown<T: VetoTransport>(mut state: LiveState<T>) {
    state.timer.stop();
    if let Some(channel) = state.channel.take() {
        channel.disconnect().await;
    }
}
