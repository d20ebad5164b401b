// Wire-format data model for veto sessions, actions, maps, and pools.
//
// Field names and casing follow the backend's JSON contract (snake_case).
// The session object is authoritative and adopted wholesale; nothing in this
// module mutates a session in place beyond what the in-process collaborator
// in `local` does when it plays the server role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::veto::{Side, Team};

/// Server-side cap on per-turn timer length, in seconds. Zero disables the
/// countdown for a session.
pub const MAX_TIMER_SECONDS: u32 = 300;

// ---------------------------------------------------------------------------
// Maps and pools
// ---------------------------------------------------------------------------

/// Canonical map record as served by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMap {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub is_competitive: bool,
}

/// Older client-cached map shape with camelCase keys. Only ever read; it is
/// normalized to [`GameMap`] at the boundary and never used directly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMap {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub image_url: String,
    pub is_competitive: bool,
}

/// A map record in either of the two wire shapes.
///
/// `Legacy` is tried first: its required `isCompetitive` key is what tells
/// the shapes apart, while the canonical shape tolerates missing optional
/// fields. Call sites never branch on shape; they normalize immediately.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MapRecord {
    Legacy(LegacyMap),
    Canonical(GameMap),
}

impl MapRecord {
    /// Normalize to the canonical record.
    pub fn into_canonical(self) -> GameMap {
        match self {
            MapRecord::Canonical(map) => map,
            MapRecord::Legacy(map) => GameMap {
                id: map.id,
                name: map.name,
                slug: map.slug,
                image_url: map.image_url,
                is_competitive: map.is_competitive,
            },
        }
    }
}

/// Normalize a batch of mixed-shape map records.
pub fn normalize_maps(records: Vec<MapRecord>) -> Vec<GameMap> {
    records.into_iter().map(MapRecord::into_canonical).collect()
}

/// A named set of maps scoped to one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPool {
    pub id: u64,
    pub game_id: u64,
    pub name: String,
    /// Pool category as reported by the backend, e.g. "competitive" or
    /// "custom". Loosely specified upstream, so kept as a plain string.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub maps: Vec<GameMap>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Session enums
// ---------------------------------------------------------------------------

/// Match format of a veto session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VetoKind {
    Bo1,
    Bo3,
    Bo5,
}

impl fmt::Display for VetoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VetoKind::Bo1 => write!(f, "bo1"),
            VetoKind::Bo3 => write!(f, "bo3"),
            VetoKind::Bo5 => write!(f, "bo5"),
        }
    }
}

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Finished,
    Cancelled,
}

/// Kind of a recorded veto action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Ban,
    Pick,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Ban => write!(f, "ban"),
            ActionKind::Pick => write!(f, "pick"),
        }
    }
}

/// What the schedule expects next, as reported by the next-action query.
/// `Both` appears only at the bo5 choice step. Side-selection and finished
/// states are signalled through the flags on [`NextAction`], not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionRequirement {
    Ban,
    Pick,
    Both,
}

// ---------------------------------------------------------------------------
// Session and actions
// ---------------------------------------------------------------------------

/// One recorded step of a veto: a ban or a pick, with optional side choice
/// attached to picks after the opposing team selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VetoAction {
    pub id: u64,
    pub map_id: u64,
    /// Embedded map record when the backend expands it; may be absent.
    #[serde(default)]
    pub map: Option<GameMap>,
    pub team: Team,
    pub action_type: ActionKind,
    pub step_number: u32,
    #[serde(default)]
    pub selected_side: Option<Side>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Authoritative server-held veto session.
///
/// The client never edits a session field-by-field: every transition is
/// requested from the collaborator, which returns the new canonical session
/// to be adopted wholesale (replace, not merge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VetoSession {
    pub id: u64,
    #[serde(default)]
    pub game_id: u64,
    pub map_pool_id: u64,
    /// Embedded pool when the backend expands it; may be absent on slim
    /// payloads, in which case name resolution falls back elsewhere.
    #[serde(default)]
    pub map_pool: Option<MapPool>,
    #[serde(rename = "type")]
    pub kind: VetoKind,
    pub status: SessionStatus,
    pub team_a_name: String,
    pub team_b_name: String,
    pub current_team: Team,
    #[serde(default)]
    pub selected_map_id: Option<u64>,
    #[serde(default)]
    pub selected_side: Option<Side>,
    #[serde(default)]
    pub timer_seconds: u32,
    #[serde(default)]
    pub share_token: String,
    #[serde(default)]
    pub actions: Vec<VetoAction>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl VetoSession {
    /// Whether any veto step has been taken or the session has concluded.
    pub fn has_started(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::InProgress | SessionStatus::Finished
        )
    }

    pub fn is_finished(&self) -> bool {
        self.status == SessionStatus::Finished
    }

    /// Display name for `team`.
    pub fn team_name(&self, team: Team) -> &str {
        match team {
            Team::A => &self.team_a_name,
            Team::B => &self.team_b_name,
        }
    }

    /// Maps of the embedded pool, or an empty slice when the payload is slim.
    pub fn pool_maps(&self) -> &[GameMap] {
        self.map_pool.as_ref().map(|p| p.maps.as_slice()).unwrap_or(&[])
    }

    /// Resolve a map name by id against the embedded pool, falling back to
    /// the map record embedded in any action that references the id.
    pub fn map_name(&self, map_id: u64) -> Option<&str> {
        if let Some(map) = self.pool_maps().iter().find(|m| m.id == map_id) {
            return Some(&map.name);
        }
        self.actions
            .iter()
            .filter_map(|a| a.map.as_ref())
            .find(|m| m.id == map_id)
            .map(|m| m.name.as_str())
    }

    /// Actions ordered by step number, regardless of arrival order.
    pub fn actions_by_step(&self) -> Vec<&VetoAction> {
        let mut ordered: Vec<&VetoAction> = self.actions.iter().collect();
        ordered.sort_by_key(|a| a.step_number);
        ordered
    }

    /// Ids of banned maps in step order.
    pub fn banned_map_ids(&self) -> Vec<u64> {
        self.actions_by_step()
            .iter()
            .filter(|a| a.action_type == ActionKind::Ban)
            .map(|a| a.map_id)
            .collect()
    }

    /// Ids of picked maps in step order.
    pub fn picked_map_ids(&self) -> Vec<u64> {
        self.actions_by_step()
            .iter()
            .filter(|a| a.action_type == ActionKind::Pick)
            .map(|a| a.map_id)
            .collect()
    }

    /// Structural validity check mirroring the backend's rules. Returns the
    /// offending rule as a message; used when hosting sessions in-process.
    pub fn validate(&self) -> Result<(), String> {
        if self.timer_seconds > MAX_TIMER_SECONDS {
            return Err(format!(
                "timer_seconds must be between 0 and {MAX_TIMER_SECONDS}"
            ));
        }
        if self.team_a_name.trim().is_empty() {
            return Err("team_a_name must not be empty".to_string());
        }
        if self.team_b_name.trim().is_empty() {
            return Err("team_b_name must not be empty".to_string());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Requests and queries
// ---------------------------------------------------------------------------

/// Body of a create-session request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub map_pool_id: u64,
    pub game_id: u64,
    #[serde(rename = "type")]
    pub kind: VetoKind,
    pub team_a_name: String,
    pub team_b_name: String,
    pub timer_seconds: u32,
}

/// Body of a create-custom-pool request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePoolRequest {
    pub game_id: u64,
    pub name: String,
    pub map_ids: Vec<u64>,
}

/// Read-only description of the next legal step, used to gate UI controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextAction {
    pub action_type: ActionRequirement,
    pub current_step: u32,
    pub current_team: Team,
    pub can_ban: bool,
    pub can_pick: bool,
    pub needs_side_selection: bool,
    #[serde(default)]
    pub side_selection_team: Option<Team>,
    #[serde(default)]
    pub message: Option<String>,
}
