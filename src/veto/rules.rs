// Turn schedule and legality rules shared by every format.
//
// These mirror the backend's rule set so that the in-process collaborator
// and UI gating agree with what the server would decide. All functions are
// pure over the session's action list; step parity alone decides the acting
// team, and the per-format schedule decides the action kind.

use thiserror::Error;

use crate::session::model::{
    ActionKind, ActionRequirement, GameMap, NextAction, SessionStatus, VetoAction, VetoKind,
    VetoSession,
};
use crate::veto::Team;

/// Rule violations, matching the backend's error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VetoRuleError {
    #[error("session not found")]
    SessionNotFound,
    #[error("session is already finished")]
    SessionFinished,
    #[error("session is already started")]
    SessionAlreadyStarted,
    #[error("invalid action")]
    InvalidAction,
    #[error("map not found")]
    MapNotFound,
    #[error("map is already banned")]
    MapAlreadyBanned,
    #[error("map is already picked")]
    MapAlreadyPicked,
    #[error("not your turn")]
    NotYourTurn,
    #[error("map pool not found")]
    MapPoolNotFound,
    #[error("invalid map pool")]
    InvalidMapPool,
    #[error("map pool must have at least one map")]
    PoolHasNoMaps,
    #[error("cannot delete system map pool")]
    CannotDeleteSystemPool,
    #[error("invalid session: {0}")]
    InvalidSession(String),
}

/// Step about to be taken: executed actions + 1.
pub fn current_step(actions: &[VetoAction]) -> u32 {
    actions.len() as u32 + 1
}

/// Acting team for a step. Team A opens; parity alternates regardless of
/// format.
pub fn team_for_step(step: u32) -> Team {
    if step % 2 == 1 {
        Team::A
    } else {
        Team::B
    }
}

/// The action kind the schedule expects at the next step.
///
/// bo3 picks at steps 3 and 6. bo5 leaves step 4 as the acting team's choice
/// and complements it at step 5 (a step-4 ban makes step 5 a pick, and the
/// other way around), then picks at steps 6, 9 and 12. Everything else, and
/// all of bo1, is a ban.
pub fn next_requirement(kind: VetoKind, actions: &[VetoAction]) -> ActionRequirement {
    let step = current_step(actions);
    match kind {
        VetoKind::Bo1 => ActionRequirement::Ban,
        VetoKind::Bo3 => {
            if step == 3 || step == 6 {
                ActionRequirement::Pick
            } else {
                ActionRequirement::Ban
            }
        }
        VetoKind::Bo5 => {
            if step == 4 {
                return ActionRequirement::Both;
            }
            if step == 5 {
                return match last_by_step(actions) {
                    Some(prev) if prev.action_type == ActionKind::Ban => ActionRequirement::Pick,
                    _ => ActionRequirement::Ban,
                };
            }
            if step == 6 || step == 9 || step == 12 {
                ActionRequirement::Pick
            } else {
                ActionRequirement::Ban
            }
        }
    }
}

/// Whether the veto has reached its terminal state. bo1 ends when one map
/// is left in contention; bo3 and bo5 end after 2 and 4 picks (the decider
/// comes out of the remaining maps, so more than one may still be
/// available).
pub fn is_finished(kind: VetoKind, actions: &[VetoAction], available_count: usize) -> bool {
    match kind {
        VetoKind::Bo1 => available_count == 1,
        VetoKind::Bo3 => pick_count(actions) == 2,
        VetoKind::Bo5 => pick_count(actions) == 4,
    }
}

/// Maps neither banned nor picked, in pool order.
pub fn available_maps<'a>(maps: &'a [GameMap], actions: &[VetoAction]) -> Vec<&'a GameMap> {
    maps.iter()
        .filter(|m| {
            !actions
                .iter()
                .any(|a| a.map_id == m.id)
        })
        .collect()
}

/// Whether `team` may take `action` now. Requires an open session, the
/// team's own turn by parity, and an action kind matching the schedule
/// (the bo5 choice step admits both kinds).
pub fn can_perform(
    status: SessionStatus,
    kind: VetoKind,
    action: ActionKind,
    team: Team,
    actions: &[VetoAction],
) -> bool {
    if status != SessionStatus::InProgress && status != SessionStatus::NotStarted {
        return false;
    }
    if team_for_step(current_step(actions)) != team {
        return false;
    }
    let required = next_requirement(kind, actions);
    match action {
        ActionKind::Ban => {
            required == ActionRequirement::Ban || required == ActionRequirement::Both
        }
        ActionKind::Pick => {
            required == ActionRequirement::Pick || required == ActionRequirement::Both
        }
    }
}

/// Which team chooses the starting side after a pick at `pick_step`.
/// Always the team opposite the picker; bo1 has no side selection.
pub fn side_selection_team(kind: VetoKind, pick_step: u32) -> Option<Team> {
    match kind {
        VetoKind::Bo1 => None,
        VetoKind::Bo3 => match pick_step {
            3 => Some(Team::B),
            6 => Some(Team::A),
            _ => None,
        },
        VetoKind::Bo5 => Some(team_for_step(pick_step).opponent()),
    }
}

/// Whether the most recent action is a pick still waiting for its side.
pub fn needs_side_selection(kind: VetoKind, actions: &[VetoAction]) -> bool {
    let Some(last) = last_by_step(actions) else {
        return false;
    };
    if last.action_type != ActionKind::Pick {
        return false;
    }
    if last.selected_side.is_some() {
        return false;
    }
    side_selection_team(kind, last.step_number).is_some()
}

/// Build the next-action description for a session, mirroring the backend's
/// query: a pending side selection blocks everything else (even a session
/// whose picks are all in), then a finished session reports nothing legal,
/// otherwise the schedule's requirement with its can-ban/can-pick flags.
pub fn next_action(session: &VetoSession) -> Result<NextAction, VetoRuleError> {
    let pool = session
        .map_pool
        .as_ref()
        .ok_or(VetoRuleError::MapPoolNotFound)?;

    let available = available_maps(&pool.maps, &session.actions);
    let step = current_step(&session.actions);
    let team = team_for_step(step);

    if needs_side_selection(session.kind, &session.actions) {
        let side_team = last_by_step(&session.actions)
            .and_then(|a| side_selection_team(session.kind, a.step_number));
        return Ok(NextAction {
            action_type: ActionRequirement::Ban,
            current_step: step,
            current_team: side_team.unwrap_or(team),
            can_ban: false,
            can_pick: false,
            needs_side_selection: true,
            side_selection_team: side_team,
            message: Some("Side selection required".to_string()),
        });
    }

    if is_finished(session.kind, &session.actions, available.len()) {
        return Ok(NextAction {
            action_type: ActionRequirement::Ban,
            current_step: step,
            current_team: team,
            can_ban: false,
            can_pick: false,
            needs_side_selection: false,
            side_selection_team: None,
            message: Some("Veto process is finished".to_string()),
        });
    }

    let required = next_requirement(session.kind, &session.actions);
    Ok(NextAction {
        action_type: required,
        current_step: step,
        current_team: team,
        can_ban: required == ActionRequirement::Ban || required == ActionRequirement::Both,
        can_pick: required == ActionRequirement::Pick || required == ActionRequirement::Both,
        needs_side_selection: false,
        side_selection_team: None,
        message: None,
    })
}

fn pick_count(actions: &[VetoAction]) -> usize {
    actions
        .iter()
        .filter(|a| a.action_type == ActionKind::Pick)
        .count()
}

/// The action with the highest step number. Wire order is not trusted.
fn last_by_step(actions: &[VetoAction]) -> Option<&VetoAction> {
    actions.iter().max_by_key(|a| a.step_number)
}
