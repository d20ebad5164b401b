// Ownership of the authoritative session and its derived read-only state.
//
// One `SessionSync` instance owns the session for one veto; every transition
// goes through the transport and the returned session replaces the old one
// wholesale. Derived state (the view projection and the textual log) is
// recomputed from the adopted snapshot, never patched in place, so an
// optimistic local edit can never race a pushed update into a half-merged
// state.

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{TransportError, VetoTransport};
use crate::session::model::{
    normalize_maps, CreateSessionRequest, GameMap, MapRecord, NextAction, VetoSession,
};
use crate::veto::log;
use crate::veto::{LogEntry, Side, Team};

/// Failures surfaced to the caller. Prior adopted state is always left
/// untouched when one of these is returned.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no session loaded")]
    NotLoaded,
    #[error("map '{0}' is not in the session pool")]
    MapNotResolved(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Read-only projection of a session for UI rendering. Computed purely from
/// the latest adopted snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VetoView {
    pub current_team: Team,
    pub bans: Vec<String>,
    pub picked_maps: Vec<String>,
    pub finished: bool,
    pub started: bool,
    pub selected_map: Option<String>,
}

/// Project the view for `session`, resolving map names against the session
/// first and `fallback` second.
pub fn project_view(session: &VetoSession, fallback: &[GameMap]) -> VetoView {
    let name_of =
        |map_id: u64| log::resolve_name(session, fallback, map_id).to_string();
    VetoView {
        current_team: session.current_team,
        bans: session.banned_map_ids().into_iter().map(name_of).collect(),
        picked_maps: session.picked_map_ids().into_iter().map(name_of).collect(),
        finished: session.is_finished(),
        started: session.has_started(),
        selected_map: session.selected_map_id.map(name_of),
    }
}

/// Client-side keeper of one authoritative veto session.
pub struct SessionSync<T: VetoTransport> {
    transport: T,
    session: Option<VetoSession>,
    log: Vec<LogEntry>,
    fallback_pool: Vec<GameMap>,
}

impl<T: VetoTransport> SessionSync<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            session: None,
            log: Vec::new(),
            fallback_pool: Vec::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session(&self) -> Option<&VetoSession> {
        self.session.as_ref()
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Current view projection, when a session is loaded.
    pub fn view(&self) -> Option<VetoView> {
        self.session
            .as_ref()
            .map(|s| project_view(s, &self.fallback_pool))
    }

    /// Install the secondary pool used when a slim session payload arrives
    /// without its embedded pool. Mixed-shape records are normalized here,
    /// once, at the boundary.
    pub fn set_fallback_pool(&mut self, records: Vec<MapRecord>) {
        self.fallback_pool = normalize_maps(records);
    }

    /// Create a new session and adopt it. The log restarts with a single
    /// creation line.
    pub async fn create_session(
        &mut self,
        request: &CreateSessionRequest,
    ) -> Result<(), SyncError> {
        let session = self.transport.create_session(request).await?;
        self.log.clear();
        self.log.push(LogEntry::new(log::session_created_line(
            &session.kind.to_string(),
            &session.team_a_name,
            &session.team_b_name,
        )));
        self.session = Some(session);
        Ok(())
    }

    /// Fetch a session by id, adopt it and rebuild the log from its actions.
    pub async fn load_session(&mut self, id: u64) -> Result<(), SyncError> {
        let session = self.transport.session_by_id(id).await?;
        self.adopt(session);
        Ok(())
    }

    /// Same as [`load_session`](Self::load_session) but through an opaque
    /// share token.
    pub async fn load_shared(&mut self, token: &str) -> Result<(), SyncError> {
        let session = self.transport.session_by_token(token).await?;
        self.adopt(session);
        Ok(())
    }

    /// Adopt a session pushed over the real-time channel. Updates without a
    /// valid identity, or for a different session than the loaded one, are
    /// discarded and leave all state exactly as it was. Returns whether the
    /// update was adopted.
    pub fn apply_remote_update(&mut self, session: VetoSession) -> bool {
        if session.id == 0 {
            warn!("discarding pushed session without a valid id");
            return false;
        }
        if let Some(current) = &self.session {
            if current.id != session.id {
                warn!(
                    current_id = current.id,
                    pushed_id = session.id,
                    "discarding pushed session for a different veto"
                );
                return false;
            }
        }
        self.adopt(session);
        true
    }

    /// Ban `map_name` as the team whose turn it is. On success the returned
    /// session becomes authoritative and one optimistic log line is
    /// appended; a later full rebuild may render the step differently.
    pub async fn ban_map(&mut self, map_name: &str) -> Result<(), SyncError> {
        let target = self.prepare_action(map_name)?;
        let updated = self
            .transport
            .ban_map(target.session_id, target.map_id, target.team)
            .await?;
        self.session = Some(updated);
        self.log.push(LogEntry::new(log::ban_line(
            &target.team_name,
            &target.map_name,
        )));
        Ok(())
    }

    /// Pick `map_name` as the team whose turn it is. Same adoption and
    /// optimistic-log behavior as [`ban_map`](Self::ban_map).
    pub async fn pick_map(&mut self, map_name: &str) -> Result<(), SyncError> {
        let target = self.prepare_action(map_name)?;
        let updated = self
            .transport
            .pick_map(target.session_id, target.map_id, target.team)
            .await?;
        self.session = Some(updated);
        self.log.push(LogEntry::new(log::pick_line(
            &target.team_name,
            &target.map_name,
        )));
        Ok(())
    }

    /// Choose the starting side for the most recent pick. Unlike ban and
    /// pick this rebuilds the whole log, so side annotations and step order
    /// always agree with the server.
    pub async fn select_side(&mut self, side: Side, team: Team) -> Result<(), SyncError> {
        let session_id = self.current()?.id;
        let updated = self.transport.select_side(session_id, side, team).await?;
        self.adopt(updated);
        Ok(())
    }

    /// Explicitly open the session for actions.
    pub async fn start_session(&mut self) -> Result<(), SyncError> {
        let session_id = self.current()?.id;
        let updated = self.transport.start_session(session_id).await?;
        self.adopt(updated);
        Ok(())
    }

    /// Wipe the session back to its pristine state and clear the log.
    pub async fn reset_session(&mut self) -> Result<(), SyncError> {
        let session_id = self.current()?.id;
        let updated = self.transport.reset_session(session_id).await?;
        self.session = Some(updated);
        self.log.clear();
        Ok(())
    }

    /// Ask the collaborator what is legal next. Never mutates local state.
    pub async fn next_action(&self) -> Result<NextAction, SyncError> {
        let session_id = self.current()?.id;
        Ok(self.transport.next_action(session_id).await?)
    }

    /// Replace the authoritative session and rebuild every derived piece.
    fn adopt(&mut self, session: VetoSession) {
        debug!(session_id = session.id, status = ?session.status, "adopting session");
        self.log = log::rebuild_log(&session, &self.fallback_pool);
        self.session = Some(session);
    }

    fn current(&self) -> Result<&VetoSession, SyncError> {
        self.session.as_ref().ok_or(SyncError::NotLoaded)
    }

    /// Resolve everything a ban or pick needs before any request is sent:
    /// the map id, the map's canonical name, and the acting team with its
    /// display name. Resolution failures mean nothing was sent.
    fn prepare_action(&self, map_name: &str) -> Result<ActionTarget, SyncError> {
        let session = self.current()?;
        let map = session
            .pool_maps()
            .iter()
            .chain(self.fallback_pool.iter())
            .find(|m| m.name == map_name)
            .ok_or_else(|| SyncError::MapNotResolved(map_name.to_string()))?;
        Ok(ActionTarget {
            session_id: session.id,
            map_id: map.id,
            map_name: map.name.clone(),
            team: session.current_team,
            team_name: session.team_name(session.current_team).to_string(),
        })
    }
}

/// Everything a ban or pick request and its optimistic log line need,
/// captured before the session is replaced.
struct ActionTarget {
    session_id: u64,
    map_id: u64,
    map_name: String,
    team: Team,
    team_name: String,
}
