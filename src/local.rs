// In-process collaborator that plays the server role.
//
// State lives behind a mutex and every flow follows the backend's order of
// checks, so clients exercise the same rule surface with or without a
// network. Two deliberate departures from the server: the decider map and
// its side are chosen deterministically (lowest remaining id, attack)
// instead of randomly, and share tokens come from a clock-and-counter mint
// instead of an RNG.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::api::{TransportError, VetoTransport};
use crate::session::model::{
    ActionKind, CreatePoolRequest, CreateSessionRequest, GameMap, MapPool, NextAction,
    SessionStatus, VetoAction, VetoKind, VetoSession,
};
use crate::veto::rules::{self, VetoRuleError};
use crate::veto::{Side, Team};

#[derive(Default)]
struct LocalState {
    sessions: BTreeMap<u64, VetoSession>,
    pools: BTreeMap<u64, MapPool>,
    maps: BTreeMap<u64, GameMap>,
    next_session_id: u64,
    next_pool_id: u64,
    next_action_id: u64,
    token_counter: u64,
}

impl LocalState {
    fn mint_token(&mut self) -> String {
        self.token_counter += 1;
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0) as u64;
        // Same width as the server's 16-byte hex tokens.
        format!("{nanos:016x}{:016x}", self.token_counter)
    }
}

/// Serverless [`VetoTransport`] holding sessions and pools in memory.
pub struct LocalTransport {
    inner: Mutex<LocalState>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LocalState::default()),
        }
    }

    /// Register a ready-made pool (and its maps) as a system pool, the way
    /// the server ships game-default pools. Returns the stored pool.
    pub fn seed_pool(&self, game_id: u64, name: &str, maps: Vec<GameMap>) -> MapPool {
        let mut state = self.state();
        for map in &maps {
            state.maps.insert(map.id, map.clone());
        }
        state.next_pool_id += 1;
        let pool = MapPool {
            id: state.next_pool_id,
            game_id,
            name: name.to_string(),
            kind: "competitive".to_string(),
            is_system: true,
            maps,
            created_at: Utc::now(),
        };
        state.pools.insert(pool.id, pool.clone());
        pool
    }

    fn state(&self) -> MutexGuard<'_, LocalState> {
        self.inner.lock().expect("local state mutex poisoned")
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Close out a session whose veto just completed: bo1 takes the sole
/// remaining map, bo3/bo5 take the lowest-id remaining map as decider plus
/// an attack-side default where the server would randomize.
fn finish_session(session: &mut VetoSession, available: &[&GameMap]) {
    match session.kind {
        VetoKind::Bo1 => {
            if available.len() == 1 {
                session.selected_map_id = Some(available[0].id);
            }
        }
        _ => {
            if let Some(decider) = available.iter().min_by_key(|m| m.id) {
                session.selected_map_id = Some(decider.id);
                session.selected_side = Some(Side::Attack);
            }
        }
    }
    if session.selected_map_id.is_some() {
        session.finished_at = Some(Utc::now());
    }
    session.status = SessionStatus::Finished;
    debug!(
        session_id = session.id,
        selected_map_id = ?session.selected_map_id,
        "session finished"
    );
}

#[async_trait]
impl VetoTransport for LocalTransport {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<VetoSession, TransportError> {
        let mut state = self.state();
        let pool = state
            .pools
            .get(&request.map_pool_id)
            .cloned()
            .ok_or(VetoRuleError::MapPoolNotFound)?;
        if pool.game_id != request.game_id {
            return Err(VetoRuleError::InvalidMapPool.into());
        }
        if pool.maps.is_empty() {
            return Err(VetoRuleError::PoolHasNoMaps.into());
        }

        let token = state.mint_token();
        state.next_session_id += 1;
        let session = VetoSession {
            id: state.next_session_id,
            game_id: request.game_id,
            map_pool_id: request.map_pool_id,
            map_pool: Some(pool),
            kind: request.kind,
            status: SessionStatus::NotStarted,
            team_a_name: request.team_a_name.clone(),
            team_b_name: request.team_b_name.clone(),
            current_team: Team::A,
            selected_map_id: None,
            selected_side: None,
            timer_seconds: request.timer_seconds,
            share_token: token,
            actions: Vec::new(),
            created_at: Utc::now(),
            finished_at: None,
        };
        session.validate().map_err(VetoRuleError::InvalidSession)?;

        debug!(session_id = session.id, kind = %session.kind, "session created");
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn session_by_id(&self, id: u64) -> Result<VetoSession, TransportError> {
        self.state()
            .sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| VetoRuleError::SessionNotFound.into())
    }

    async fn session_by_token(&self, token: &str) -> Result<VetoSession, TransportError> {
        self.state()
            .sessions
            .values()
            .find(|s| s.share_token == token)
            .cloned()
            .ok_or_else(|| VetoRuleError::SessionNotFound.into())
    }

    async fn ban_map(
        &self,
        session_id: u64,
        map_id: u64,
        team: Team,
    ) -> Result<VetoSession, TransportError> {
        let mut state = self.state();
        let mut session = state
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(VetoRuleError::SessionNotFound)?;

        if matches!(
            session.status,
            SessionStatus::Finished | SessionStatus::Cancelled
        ) {
            return Err(VetoRuleError::SessionFinished.into());
        }

        let pool = state
            .pools
            .get(&session.map_pool_id)
            .cloned()
            .ok_or(VetoRuleError::MapPoolNotFound)?;
        let map = state
            .maps
            .get(&map_id)
            .cloned()
            .ok_or(VetoRuleError::MapNotFound)?;
        if !pool.maps.iter().any(|m| m.id == map_id) {
            return Err(VetoRuleError::MapNotFound.into());
        }

        // A ban on a fresh session starts it implicitly.
        if session.status == SessionStatus::NotStarted {
            session.status = SessionStatus::InProgress;
        }

        let available = rules::available_maps(&pool.maps, &session.actions);
        if !available.iter().any(|m| m.id == map_id) {
            return Err(VetoRuleError::MapAlreadyBanned.into());
        }
        if !rules::can_perform(
            session.status,
            session.kind,
            ActionKind::Ban,
            team,
            &session.actions,
        ) {
            return Err(VetoRuleError::NotYourTurn.into());
        }

        let step = rules::current_step(&session.actions);
        state.next_action_id += 1;
        session.actions.push(VetoAction {
            id: state.next_action_id,
            map_id,
            map: Some(map),
            team,
            action_type: ActionKind::Ban,
            step_number: step,
            selected_side: None,
            created_at: Utc::now(),
        });

        // The turn passes even when this ban ends the veto.
        session.current_team = session.current_team.opponent();

        let remaining = rules::available_maps(&pool.maps, &session.actions);
        if rules::is_finished(session.kind, &session.actions, remaining.len()) {
            finish_session(&mut session, &remaining);
        }

        state.sessions.insert(session_id, session.clone());
        Ok(session)
    }

    async fn pick_map(
        &self,
        session_id: u64,
        map_id: u64,
        team: Team,
    ) -> Result<VetoSession, TransportError> {
        let mut state = self.state();
        let mut session = state
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(VetoRuleError::SessionNotFound)?;

        if matches!(
            session.status,
            SessionStatus::Finished | SessionStatus::Cancelled
        ) {
            return Err(VetoRuleError::SessionFinished.into());
        }
        if session.kind == VetoKind::Bo1 {
            return Err(VetoRuleError::InvalidAction.into());
        }

        let pool = state
            .pools
            .get(&session.map_pool_id)
            .cloned()
            .ok_or(VetoRuleError::MapPoolNotFound)?;
        let map = state
            .maps
            .get(&map_id)
            .cloned()
            .ok_or(VetoRuleError::MapNotFound)?;
        if !pool.maps.iter().any(|m| m.id == map_id) {
            return Err(VetoRuleError::MapNotFound.into());
        }

        if session.status == SessionStatus::NotStarted {
            session.status = SessionStatus::InProgress;
        }

        let available = rules::available_maps(&pool.maps, &session.actions);
        if !available.iter().any(|m| m.id == map_id) {
            return Err(VetoRuleError::MapAlreadyPicked.into());
        }
        if !rules::can_perform(
            session.status,
            session.kind,
            ActionKind::Pick,
            team,
            &session.actions,
        ) {
            return Err(VetoRuleError::NotYourTurn.into());
        }

        let step = rules::current_step(&session.actions);
        state.next_action_id += 1;
        session.actions.push(VetoAction {
            id: state.next_action_id,
            map_id,
            map: Some(map),
            team,
            action_type: ActionKind::Pick,
            step_number: step,
            selected_side: None,
            created_at: Utc::now(),
        });

        session.current_team = session.current_team.opponent();

        // A pick that still owes a side choice keeps the session open; the
        // finish transition happens in select_side.
        let remaining = rules::available_maps(&pool.maps, &session.actions);
        if !rules::needs_side_selection(session.kind, &session.actions)
            && rules::is_finished(session.kind, &session.actions, remaining.len())
        {
            finish_session(&mut session, &remaining);
        }

        state.sessions.insert(session_id, session.clone());
        Ok(session)
    }

    async fn select_side(
        &self,
        session_id: u64,
        side: Side,
        team: Team,
    ) -> Result<VetoSession, TransportError> {
        let mut state = self.state();
        let mut session = state
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(VetoRuleError::SessionNotFound)?;

        // Side selection is still legal on a finished session; only a
        // cancelled one refuses.
        if session.status == SessionStatus::Cancelled {
            return Err(VetoRuleError::SessionFinished.into());
        }

        let Some(last) = session
            .actions
            .iter_mut()
            .max_by_key(|a| a.step_number)
        else {
            return Err(VetoRuleError::InvalidAction.into());
        };
        if last.action_type != ActionKind::Pick {
            return Err(VetoRuleError::InvalidAction.into());
        }
        if last.selected_side.is_some() {
            return Err(VetoRuleError::InvalidAction.into());
        }
        let chooser = rules::side_selection_team(session.kind, last.step_number);
        if chooser != Some(team) {
            return Err(VetoRuleError::NotYourTurn.into());
        }
        last.selected_side = Some(side);

        if session.status != SessionStatus::Finished {
            if let Some(pool) = state.pools.get(&session.map_pool_id) {
                let remaining = rules::available_maps(&pool.maps, &session.actions);
                if rules::is_finished(session.kind, &session.actions, remaining.len()) {
                    finish_session(&mut session, &remaining);
                }
            }
        }

        state.sessions.insert(session_id, session.clone());
        Ok(session)
    }

    async fn start_session(&self, session_id: u64) -> Result<VetoSession, TransportError> {
        let mut state = self.state();
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or(VetoRuleError::SessionNotFound)?;
        if session.status != SessionStatus::NotStarted {
            return Err(VetoRuleError::SessionAlreadyStarted.into());
        }
        session.status = SessionStatus::InProgress;
        debug!(session_id, "session started");
        Ok(session.clone())
    }

    async fn reset_session(&self, session_id: u64) -> Result<VetoSession, TransportError> {
        let mut state = self.state();
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or(VetoRuleError::SessionNotFound)?;
        session.actions.clear();
        session.status = SessionStatus::NotStarted;
        session.current_team = Team::A;
        session.selected_map_id = None;
        session.selected_side = None;
        session.finished_at = None;
        debug!(session_id, "session reset");
        Ok(session.clone())
    }

    async fn next_action(&self, session_id: u64) -> Result<NextAction, TransportError> {
        let state = self.state();
        let session = state
            .sessions
            .get(&session_id)
            .ok_or(VetoRuleError::SessionNotFound)?;
        Ok(rules::next_action(session)?)
    }

    async fn map_pools(&self, game_id: u64) -> Result<Vec<MapPool>, TransportError> {
        Ok(self
            .state()
            .pools
            .values()
            .filter(|p| p.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn create_map_pool(
        &self,
        request: &CreatePoolRequest,
    ) -> Result<MapPool, TransportError> {
        let mut state = self.state();
        if request.map_ids.is_empty() {
            return Err(VetoRuleError::PoolHasNoMaps.into());
        }
        let mut maps = Vec::with_capacity(request.map_ids.len());
        for map_id in &request.map_ids {
            let map = state
                .maps
                .get(map_id)
                .cloned()
                .ok_or(VetoRuleError::MapNotFound)?;
            maps.push(map);
        }
        state.next_pool_id += 1;
        let pool = MapPool {
            id: state.next_pool_id,
            game_id: request.game_id,
            name: request.name.clone(),
            kind: "custom".to_string(),
            is_system: false,
            maps,
            created_at: Utc::now(),
        };
        state.pools.insert(pool.id, pool.clone());
        Ok(pool)
    }

    async fn delete_map_pool(&self, pool_id: u64) -> Result<(), TransportError> {
        let mut state = self.state();
        let pool = state
            .pools
            .get(&pool_id)
            .ok_or(VetoRuleError::MapPoolNotFound)?;
        if pool.is_system {
            return Err(VetoRuleError::CannotDeleteSystemPool.into());
        }
        state.pools.remove(&pool_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valorant_maps() -> Vec<GameMap> {
        ["Ascent", "Bind", "Breeze", "Fracture", "Haven", "Icebox", "Split"]
            .iter()
            .enumerate()
            .map(|(i, name)| GameMap {
                id: i as u64 + 1,
                name: name.to_string(),
                slug: name.to_lowercase(),
                image_url: String::new(),
                is_competitive: true,
            })
            .collect()
    }

    fn request(pool: &MapPool, kind: VetoKind) -> CreateSessionRequest {
        CreateSessionRequest {
            map_pool_id: pool.id,
            game_id: pool.game_id,
            kind,
            team_a_name: "Alpha".into(),
            team_b_name: "Bravo".into(),
            timer_seconds: 20,
        }
    }

    fn rule(err: TransportError) -> VetoRuleError {
        match err {
            TransportError::Rule(rule) => rule,
            other => panic!("expected rule error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_session_requires_a_matching_nonempty_pool() {
        let transport = LocalTransport::new();
        let pool = transport.seed_pool(1, "Competitive", valorant_maps());

        let mut bad = request(&pool, VetoKind::Bo1);
        bad.map_pool_id = 99;
        assert_eq!(
            rule(transport.create_session(&bad).await.unwrap_err()),
            VetoRuleError::MapPoolNotFound
        );

        let mut bad = request(&pool, VetoKind::Bo1);
        bad.game_id = 2;
        assert_eq!(
            rule(transport.create_session(&bad).await.unwrap_err()),
            VetoRuleError::InvalidMapPool
        );

        let mut bad = request(&pool, VetoKind::Bo1);
        bad.team_b_name = "  ".into();
        assert!(matches!(
            rule(transport.create_session(&bad).await.unwrap_err()),
            VetoRuleError::InvalidSession(_)
        ));
    }

    #[tokio::test]
    async fn created_sessions_get_unique_share_tokens() {
        let transport = LocalTransport::new();
        let pool = transport.seed_pool(1, "Competitive", valorant_maps());
        let a = transport
            .create_session(&request(&pool, VetoKind::Bo1))
            .await
            .unwrap();
        let b = transport
            .create_session(&request(&pool, VetoKind::Bo1))
            .await
            .unwrap();
        assert_eq!(a.share_token.len(), 32);
        assert_ne!(a.share_token, b.share_token);

        let fetched = transport.session_by_token(&a.share_token).await.unwrap();
        assert_eq!(fetched.id, a.id);
        assert_eq!(
            rule(transport.session_by_token("nope").await.unwrap_err()),
            VetoRuleError::SessionNotFound
        );
    }

    #[tokio::test]
    async fn bo1_bans_run_to_a_selected_map() {
        let transport = LocalTransport::new();
        let pool = transport.seed_pool(1, "Competitive", valorant_maps());
        let session = transport
            .create_session(&request(&pool, VetoKind::Bo1))
            .await
            .unwrap();

        // Ban everything except Fracture (id 4), alternating turns.
        let mut last = session.clone();
        for (i, map_id) in [1, 2, 3, 5, 6, 7].into_iter().enumerate() {
            let team = if i % 2 == 0 { Team::A } else { Team::B };
            last = transport.ban_map(session.id, map_id, team).await.unwrap();
        }

        assert_eq!(last.status, SessionStatus::Finished);
        assert_eq!(last.selected_map_id, Some(4));
        assert!(last.finished_at.is_some());
        // The server flips the turn even on the closing ban.
        assert_eq!(last.current_team, Team::A);
        assert_eq!(last.actions.len(), 6);
    }

    #[tokio::test]
    async fn first_ban_starts_a_fresh_session() {
        let transport = LocalTransport::new();
        let pool = transport.seed_pool(1, "Competitive", valorant_maps());
        let session = transport
            .create_session(&request(&pool, VetoKind::Bo1))
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::NotStarted);

        let updated = transport.ban_map(session.id, 1, Team::A).await.unwrap();
        assert_eq!(updated.status, SessionStatus::InProgress);
    }

    #[tokio::test]
    async fn ban_rejections_follow_the_server_taxonomy() {
        let transport = LocalTransport::new();
        let pool = transport.seed_pool(1, "Competitive", valorant_maps());
        let session = transport
            .create_session(&request(&pool, VetoKind::Bo1))
            .await
            .unwrap();

        assert_eq!(
            rule(transport.ban_map(99, 1, Team::A).await.unwrap_err()),
            VetoRuleError::SessionNotFound
        );
        assert_eq!(
            rule(transport.ban_map(session.id, 42, Team::A).await.unwrap_err()),
            VetoRuleError::MapNotFound
        );
        assert_eq!(
            rule(transport.ban_map(session.id, 1, Team::B).await.unwrap_err()),
            VetoRuleError::NotYourTurn
        );

        transport.ban_map(session.id, 1, Team::A).await.unwrap();
        assert_eq!(
            rule(transport.ban_map(session.id, 1, Team::B).await.unwrap_err()),
            VetoRuleError::MapAlreadyBanned
        );

        for (i, map_id) in [2, 3, 5, 6, 7].into_iter().enumerate() {
            let team = if i % 2 == 0 { Team::B } else { Team::A };
            transport.ban_map(session.id, map_id, team).await.unwrap();
        }
        assert_eq!(
            rule(transport.ban_map(session.id, 4, Team::A).await.unwrap_err()),
            VetoRuleError::SessionFinished
        );
    }

    #[tokio::test]
    async fn picks_are_rejected_in_bo1() {
        let transport = LocalTransport::new();
        let pool = transport.seed_pool(1, "Competitive", valorant_maps());
        let session = transport
            .create_session(&request(&pool, VetoKind::Bo1))
            .await
            .unwrap();
        assert_eq!(
            rule(transport.pick_map(session.id, 1, Team::A).await.unwrap_err()),
            VetoRuleError::InvalidAction
        );
    }

    #[tokio::test]
    async fn bo3_runs_through_picks_sides_and_a_decider() {
        let transport = LocalTransport::new();
        let pool = transport.seed_pool(1, "Competitive", valorant_maps());
        let session = transport
            .create_session(&request(&pool, VetoKind::Bo3))
            .await
            .unwrap();
        let id = session.id;

        transport.ban_map(id, 1, Team::A).await.unwrap();
        transport.ban_map(id, 2, Team::B).await.unwrap();
        let after_pick = transport.pick_map(id, 3, Team::A).await.unwrap();
        assert_eq!(after_pick.status, SessionStatus::InProgress);

        // The query reports the pick as blocking until the opposing team
        // chooses a side; the picker cannot choose for them.
        let next = transport.next_action(id).await.unwrap();
        assert!(next.needs_side_selection);
        assert_eq!(next.side_selection_team, Some(Team::B));
        assert!(!next.can_ban && !next.can_pick);
        assert_eq!(
            rule(
                transport
                    .select_side(id, Side::Attack, Team::A)
                    .await
                    .unwrap_err()
            ),
            VetoRuleError::NotYourTurn
        );

        let sided = transport
            .select_side(id, Side::Attack, Team::B)
            .await
            .unwrap();
        let pick = sided.actions.iter().find(|a| a.step_number == 3).unwrap();
        assert_eq!(pick.selected_side, Some(Side::Attack));

        transport.ban_map(id, 5, Team::B).await.unwrap();
        transport.ban_map(id, 6, Team::A).await.unwrap();
        let second_pick = transport.pick_map(id, 7, Team::B).await.unwrap();
        // Still open: the second pick owes a side choice.
        assert_eq!(second_pick.status, SessionStatus::InProgress);

        let finished = transport
            .select_side(id, Side::Defence, Team::A)
            .await
            .unwrap();
        assert_eq!(finished.status, SessionStatus::Finished);
        // Fracture (id 4) is the lowest id left after bans 1,2,5,6 and
        // picks 3,7, so it becomes the decider.
        assert_eq!(finished.selected_map_id, Some(4));
        assert_eq!(finished.selected_side, Some(Side::Attack));
        assert!(finished.finished_at.is_some());
    }

    #[tokio::test]
    async fn side_selection_needs_an_unsided_pick() {
        let transport = LocalTransport::new();
        let pool = transport.seed_pool(1, "Competitive", valorant_maps());
        let session = transport
            .create_session(&request(&pool, VetoKind::Bo3))
            .await
            .unwrap();
        let id = session.id;

        assert_eq!(
            rule(
                transport
                    .select_side(id, Side::Attack, Team::B)
                    .await
                    .unwrap_err()
            ),
            VetoRuleError::InvalidAction
        );

        transport.ban_map(id, 1, Team::A).await.unwrap();
        assert_eq!(
            rule(
                transport
                    .select_side(id, Side::Attack, Team::B)
                    .await
                    .unwrap_err()
            ),
            VetoRuleError::InvalidAction
        );

        transport.ban_map(id, 2, Team::B).await.unwrap();
        transport.pick_map(id, 3, Team::A).await.unwrap();
        transport
            .select_side(id, Side::Attack, Team::B)
            .await
            .unwrap();
        assert_eq!(
            rule(
                transport
                    .select_side(id, Side::Defence, Team::B)
                    .await
                    .unwrap_err()
            ),
            VetoRuleError::InvalidAction
        );
    }

    #[tokio::test]
    async fn start_is_single_shot_and_reset_restores_a_fresh_session() {
        let transport = LocalTransport::new();
        let pool = transport.seed_pool(1, "Competitive", valorant_maps());
        let session = transport
            .create_session(&request(&pool, VetoKind::Bo1))
            .await
            .unwrap();

        let started = transport.start_session(session.id).await.unwrap();
        assert_eq!(started.status, SessionStatus::InProgress);
        assert_eq!(
            rule(transport.start_session(session.id).await.unwrap_err()),
            VetoRuleError::SessionAlreadyStarted
        );

        transport.ban_map(session.id, 1, Team::A).await.unwrap();
        transport.ban_map(session.id, 2, Team::B).await.unwrap();

        let reset = transport.reset_session(session.id).await.unwrap();
        assert_eq!(reset.status, SessionStatus::NotStarted);
        assert_eq!(reset.current_team, Team::A);
        assert!(reset.actions.is_empty());
        assert!(reset.selected_map_id.is_none());
        assert!(reset.finished_at.is_none());
    }

    #[tokio::test]
    async fn custom_pools_can_be_created_and_deleted_but_system_pools_stay() {
        let transport = LocalTransport::new();
        let system = transport.seed_pool(1, "Competitive", valorant_maps());

        assert_eq!(
            rule(
                transport
                    .create_map_pool(&CreatePoolRequest {
                        game_id: 1,
                        name: "Empty".into(),
                        map_ids: vec![],
                    })
                    .await
                    .unwrap_err()
            ),
            VetoRuleError::PoolHasNoMaps
        );

        let custom = transport
            .create_map_pool(&CreatePoolRequest {
                game_id: 1,
                name: "Trio".into(),
                map_ids: vec![1, 2, 3],
            })
            .await
            .unwrap();
        assert_eq!(custom.maps.len(), 3);
        assert!(!custom.is_system);
        assert_eq!(custom.kind, "custom");

        let pools = transport.map_pools(1).await.unwrap();
        assert_eq!(pools.len(), 2);

        assert_eq!(
            rule(transport.delete_map_pool(system.id).await.unwrap_err()),
            VetoRuleError::CannotDeleteSystemPool
        );
        transport.delete_map_pool(custom.id).await.unwrap();
        assert_eq!(transport.map_pools(1).await.unwrap().len(), 1);
    }
}
