// Display-log reconstruction from a session's action history.
//
// The log is never authoritative: it is cleared and rebuilt wholesale from
// `VetoSession.actions` ordered by step number, so replaying the same session
// always yields the same lines no matter how its actions arrived. The message
// templates here are also used by the local engine so both paths narrate a
// veto the same way.

use crate::session::model::{ActionKind, GameMap, VetoSession};
use crate::veto::LogEntry;

/// Label substituted when a map id cannot be resolved against any known pool.
pub const UNKNOWN_MAP_LABEL: &str = "unknown map";

// ---------------------------------------------------------------------------
// Message templates
// ---------------------------------------------------------------------------

pub fn start_line(team_name: &str) -> String {
    format!("Veto started. {team_name} bans first.")
}

pub fn ban_line(team_name: &str, map_name: &str) -> String {
    format!("{team_name} bans {map_name}.")
}

pub fn pick_line(team_name: &str, map_name: &str) -> String {
    format!("{team_name} picks {map_name}.")
}

pub fn auto_pick_line(map_name: &str) -> String {
    format!("One map remains: {map_name}. It is picked automatically.")
}

pub fn swap_line(team_name: &str) -> String {
    format!("Turn passed to {team_name}.")
}

pub fn session_created_line(kind: &str, team_a: &str, team_b: &str) -> String {
    format!("Veto session ({kind}) created: {team_a} vs {team_b}.")
}

// ---------------------------------------------------------------------------
// Reconstruction
// ---------------------------------------------------------------------------

/// Rebuild the whole display log from a session's action history.
///
/// Actions are replayed in `step_number` order regardless of arrival order.
/// Map names resolve against the session's own pool first, then embedded
/// per-action map records, then `fallback`; an id that resolves nowhere gets
/// the sentinel label instead of failing. A finished session with a selected
/// map gains one trailing auto-pick line.
pub fn rebuild_log(session: &VetoSession, fallback: &[GameMap]) -> Vec<LogEntry> {
    let mut log = Vec::new();

    for action in session.actions_by_step() {
        let team_name = session.team_name(action.team);
        let map_name = resolve_name(session, fallback, action.map_id);
        let message = match action.action_type {
            ActionKind::Ban => ban_line(team_name, map_name),
            ActionKind::Pick => pick_line(team_name, map_name),
        };
        log.push(LogEntry::new(message));
    }

    if session.is_finished() {
        if let Some(map_id) = session.selected_map_id {
            log.push(LogEntry::new(auto_pick_line(resolve_name(
                session, fallback, map_id,
            ))));
        }
    }

    log
}

/// Resolve a map name for display, falling back to the sentinel label.
pub fn resolve_name<'a>(
    session: &'a VetoSession,
    fallback: &'a [GameMap],
    map_id: u64,
) -> &'a str {
    session
        .map_name(map_id)
        .or_else(|| {
            fallback
                .iter()
                .find(|m| m.id == map_id)
                .map(|m| m.name.as_str())
        })
        .unwrap_or(UNKNOWN_MAP_LABEL)
}
