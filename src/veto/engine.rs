// Local pure veto engine for demo and disconnected flows.
//
// Implements the bo1 "ban to the last map" rules as a plain state machine:
// no transport, no clock, no authority other than itself. Connected sessions
// use the server-derived path in `session::sync` instead; both paths must
// produce the same observable semantics for the same ban order.

use tracing::debug;

use crate::veto::log;
use crate::veto::{LogEntry, Team};

/// Result of a [`VetoEngine::ban`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanOutcome {
    /// The ban was recorded and the turn passed to the other team.
    Recorded,
    /// The ban was recorded and left a single map, which became the pick.
    /// The acting team keeps the turn marker; the veto is finished.
    AutoPicked(String),
    /// The call was illegal in the current state; nothing changed.
    Rejected,
}

/// Pure veto state machine over a named map pool.
///
/// Lifecycle: `idle` (not started) -> `active` (started, not finished) ->
/// `done` (finished). All mutating calls outside their legal state are
/// silent no-ops; they never touch state and never emit log entries.
#[derive(Debug, Clone)]
pub struct VetoEngine {
    pool: Vec<String>,
    team_a_name: String,
    team_b_name: String,
    current_team: Team,
    bans: Vec<String>,
    picked_map: Option<String>,
    started: bool,
    finished: bool,
    log: Vec<LogEntry>,
}

impl VetoEngine {
    /// Create an engine over `pool` with default team names.
    pub fn new(pool: Vec<String>) -> Self {
        Self {
            pool,
            team_a_name: "Team A".to_string(),
            team_b_name: "Team B".to_string(),
            current_team: Team::A,
            bans: Vec::new(),
            picked_map: None,
            started: false,
            finished: false,
            log: Vec::new(),
        }
    }

    /// Replace both team display names. Names only affect log lines.
    pub fn set_team_names(&mut self, team_a: impl Into<String>, team_b: impl Into<String>) {
        self.team_a_name = team_a.into();
        self.team_b_name = team_b.into();
    }

    /// Display name for `team`.
    pub fn team_name(&self, team: Team) -> &str {
        match team {
            Team::A => &self.team_a_name,
            Team::B => &self.team_b_name,
        }
    }

    /// Begin the veto. Legal only before the first start; returns `false`
    /// (and changes nothing, including the log) when already started or done.
    pub fn start(&mut self) -> bool {
        if self.started || self.finished {
            debug!("start ignored: veto already started or finished");
            return false;
        }
        self.started = true;
        self.log.push(LogEntry::new(log::start_line(
            self.team_name(self.current_team),
        )));
        true
    }

    /// Ban `map` for the team currently on turn.
    ///
    /// Rejected without any state change when the veto is not active, the map
    /// is not in the pool, or the map is already banned. A ban that leaves
    /// exactly one map finishes the veto: the remaining map becomes the pick,
    /// an auto-pick log line is appended, and the turn does not flip.
    pub fn ban(&mut self, map: &str) -> BanOutcome {
        if !self.started || self.finished {
            debug!(map, "ban ignored: veto not active");
            return BanOutcome::Rejected;
        }
        if !self.pool.iter().any(|m| m == map) {
            debug!(map, "ban ignored: map not in pool");
            return BanOutcome::Rejected;
        }
        if self.bans.iter().any(|m| m == map) {
            debug!(map, "ban ignored: map already banned");
            return BanOutcome::Rejected;
        }

        self.bans.push(map.to_string());
        self.log.push(LogEntry::new(log::ban_line(
            self.team_name(self.current_team),
            map,
        )));

        let remaining: Vec<&String> = self
            .pool
            .iter()
            .filter(|m| !self.bans.contains(m))
            .collect();

        if remaining.len() == 1 {
            let last = remaining[0].clone();
            self.picked_map = Some(last.clone());
            self.finished = true;
            self.log.push(LogEntry::new(log::auto_pick_line(&last)));
            BanOutcome::AutoPicked(last)
        } else {
            self.current_team = self.current_team.opponent();
            BanOutcome::Recorded
        }
    }

    /// Pass the turn to the other team. Legal only while active.
    pub fn swap_team(&mut self) -> bool {
        if !self.started || self.finished {
            debug!("swap ignored: veto not active");
            return false;
        }
        self.current_team = self.current_team.opponent();
        self.log.push(LogEntry::new(log::swap_line(
            self.team_name(self.current_team),
        )));
        true
    }

    /// Return to `idle`: empty bans, no pick, cleared log, team A on turn.
    /// Valid from any state.
    pub fn reset(&mut self) {
        self.current_team = Team::A;
        self.bans.clear();
        self.picked_map = None;
        self.started = false;
        self.finished = false;
        self.log.clear();
    }

    /// Replace the map pool and reset to `idle`.
    pub fn initialize_pool(&mut self, maps: Vec<String>) {
        self.pool = maps;
        self.reset();
    }

    // -- read-only accessors ------------------------------------------------

    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    pub fn bans(&self) -> &[String] {
        &self.bans
    }

    /// Maps still in contention, in pool order.
    pub fn remaining(&self) -> Vec<&str> {
        self.pool
            .iter()
            .filter(|m| !self.bans.contains(m))
            .map(String::as_str)
            .collect()
    }

    pub fn picked_map(&self) -> Option<&str> {
        self.picked_map.as_deref()
    }

    pub fn current_team(&self) -> Team {
        self.current_team
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valorant_pool() -> Vec<String> {
        ["Bind", "Haven", "Split", "Ascent", "Icebox", "Breeze", "Fracture"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn make_engine() -> VetoEngine {
        VetoEngine::new(valorant_pool())
    }

    /// Snapshot of the observable state, for no-op assertions.
    fn snapshot(engine: &VetoEngine) -> (Team, Vec<String>, Option<String>, bool, bool, usize) {
        (
            engine.current_team(),
            engine.bans().to_vec(),
            engine.picked_map().map(str::to_string),
            engine.started(),
            engine.finished(),
            engine.log().len(),
        )
    }

    #[test]
    fn starts_idle_with_team_a() {
        let engine = make_engine();
        assert_eq!(engine.current_team(), Team::A);
        assert!(engine.bans().is_empty());
        assert!(engine.picked_map().is_none());
        assert!(!engine.started());
        assert!(!engine.finished());
        assert!(engine.log().is_empty());
    }

    #[test]
    fn start_activates_and_logs_once() {
        let mut engine = make_engine();
        assert!(engine.start());
        assert!(engine.started());
        assert_eq!(engine.log().len(), 1);
        assert!(engine.log()[0].message.contains("Team A"));
    }

    #[test]
    fn start_twice_produces_no_duplicate_log_entry() {
        let mut engine = make_engine();
        assert!(engine.start());
        assert!(!engine.start());
        assert!(engine.started());
        assert_eq!(engine.log().len(), 1);
    }

    #[test]
    fn ban_before_start_is_a_no_op() {
        let mut engine = make_engine();
        let before = snapshot(&engine);
        assert_eq!(engine.ban("Bind"), BanOutcome::Rejected);
        assert_eq!(snapshot(&engine), before);
    }

    #[test]
    fn ban_records_map_and_flips_team() {
        let mut engine = make_engine();
        engine.start();
        assert_eq!(engine.ban("Bind"), BanOutcome::Recorded);
        assert_eq!(engine.bans(), ["Bind".to_string()]);
        assert_eq!(engine.current_team(), Team::B);
        assert_eq!(engine.ban("Haven"), BanOutcome::Recorded);
        assert_eq!(engine.current_team(), Team::A);
    }

    #[test]
    fn ban_uses_team_names_in_log() {
        let mut engine = make_engine();
        engine.set_team_names("Phantoms", "Operators");
        engine.start();
        engine.ban("Bind");
        engine.ban("Haven");
        assert!(engine.log()[1].message.contains("Phantoms"));
        assert!(engine.log()[1].message.contains("Bind"));
        assert!(engine.log()[2].message.contains("Operators"));
    }

    #[test]
    fn duplicate_ban_is_a_no_op() {
        let mut engine = make_engine();
        engine.start();
        engine.ban("Bind");
        let before = snapshot(&engine);
        assert_eq!(engine.ban("Bind"), BanOutcome::Rejected);
        assert_eq!(snapshot(&engine), before);
    }

    #[test]
    fn unknown_map_ban_is_a_no_op() {
        let mut engine = make_engine();
        engine.start();
        let before = snapshot(&engine);
        assert_eq!(engine.ban("Pearl"), BanOutcome::Rejected);
        assert_eq!(snapshot(&engine), before);
    }

    #[test]
    fn banning_six_of_seven_autopicks_the_last() {
        let mut engine = make_engine();
        engine.start();
        for map in ["Bind", "Haven", "Split", "Ascent", "Icebox"] {
            assert_eq!(engine.ban(map), BanOutcome::Recorded);
        }
        assert_eq!(
            engine.ban("Breeze"),
            BanOutcome::AutoPicked("Fracture".to_string())
        );
        assert_eq!(engine.picked_map(), Some("Fracture"));
        assert!(engine.finished());
        let last = engine.log().last().unwrap();
        assert!(last.message.contains("Fracture"));
        assert!(last.message.contains("automatically"));
    }

    #[test]
    fn terminal_ban_does_not_flip_team() {
        let mut engine = make_engine();
        engine.start();
        // Five non-terminal bans: A B A B A act, ending with B on turn.
        for map in ["Bind", "Haven", "Split", "Ascent", "Icebox"] {
            engine.ban(map);
        }
        assert_eq!(engine.current_team(), Team::B);
        engine.ban("Breeze");
        assert_eq!(engine.current_team(), Team::B);
    }

    #[test]
    fn ban_after_finish_is_a_no_op() {
        let mut engine = make_engine();
        engine.start();
        for map in ["Bind", "Haven", "Split", "Ascent", "Icebox", "Breeze"] {
            engine.ban(map);
        }
        let before = snapshot(&engine);
        assert_eq!(engine.ban("Fracture"), BanOutcome::Rejected);
        assert_eq!(snapshot(&engine), before);
    }

    #[test]
    fn banning_in_reverse_order_picks_the_skipped_map() {
        let mut engine = make_engine();
        engine.start();
        for map in ["Fracture", "Breeze", "Icebox", "Ascent", "Split", "Haven"] {
            assert_ne!(engine.ban(map), BanOutcome::Rejected);
        }
        assert_eq!(engine.picked_map(), Some("Bind"));
        assert!(engine.finished());
    }

    #[test]
    fn two_map_pool_finishes_on_first_ban() {
        let mut engine = VetoEngine::new(vec!["Bind".into(), "Haven".into()]);
        engine.start();
        assert_eq!(engine.ban("Bind"), BanOutcome::AutoPicked("Haven".into()));
        // The acting team keeps the turn marker on the terminal ban.
        assert_eq!(engine.current_team(), Team::A);
        assert!(engine.finished());
    }

    #[test]
    fn swap_outside_active_is_a_no_op() {
        let mut engine = make_engine();
        let before = snapshot(&engine);
        assert!(!engine.swap_team());
        assert_eq!(snapshot(&engine), before);
    }

    #[test]
    fn swap_flips_team_and_logs() {
        let mut engine = make_engine();
        engine.start();
        assert!(engine.swap_team());
        assert_eq!(engine.current_team(), Team::B);
        assert!(engine.log().last().unwrap().message.contains("Team B"));
    }

    #[test]
    fn reset_restores_initial_state_from_any_point() {
        let mut engine = make_engine();
        engine.start();
        engine.ban("Bind");
        engine.ban("Haven");
        engine.reset();
        assert_eq!(engine.current_team(), Team::A);
        assert!(engine.bans().is_empty());
        assert!(engine.picked_map().is_none());
        assert!(!engine.started());
        assert!(!engine.finished());
        assert!(engine.log().is_empty());
    }

    #[test]
    fn initialize_pool_replaces_maps_and_resets() {
        let mut engine = make_engine();
        engine.start();
        engine.ban("Bind");
        engine.initialize_pool(vec!["Lotus".into(), "Sunset".into(), "Pearl".into()]);
        assert_eq!(engine.pool(), ["Lotus", "Sunset", "Pearl"]);
        assert!(!engine.started());
        assert!(engine.bans().is_empty());
        assert_eq!(engine.current_team(), Team::A);
    }

    #[test]
    fn remaining_tracks_pool_minus_bans_in_pool_order() {
        let mut engine = make_engine();
        engine.start();
        engine.ban("Split");
        engine.ban("Bind");
        assert_eq!(
            engine.remaining(),
            ["Haven", "Ascent", "Icebox", "Breeze", "Fracture"]
        );
    }
}
