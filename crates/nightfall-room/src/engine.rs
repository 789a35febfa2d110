//! Phase transitions and resolutions.
//!
//! Every random choice here draws from the game's seeded generator in a
//! fixed order (ids ascending), so a game replays exactly from its seed.

use std::collections::BTreeMap;

use nightfall_protocol::{Phase, PlayerId, Recipient, Role, ServerMessage};
use rand::seq::{IndexedRandom, SliceRandom};
use tokio::time::Instant;

use crate::config::RoomSettings;
use crate::game::{Game, Outbox, log, log_emph};
use crate::player::PlayerRegistry;

/// Fewest players for which a hunter is dealt.
pub const HUNTER_MIN_PLAYERS: usize = 5;

/// Which side won.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Citizens,
    Wolves,
}

/// How the end of a game is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WinRule {
    /// Citizens win once no wolf is alive. Wolves win once living wolves
    /// are at least as many as living non-wolves.
    #[default]
    Parity,
}

impl WinRule {
    /// Exactly one of `Some(Citizens)`, `Some(Wolves)` or `None` for any
    /// distribution of living players.
    pub fn evaluate(self, wolves_alive: usize, others_alive: usize) -> Option<Winner> {
        match self {
            Self::Parity => {
                if wolves_alive == 0 {
                    Some(Winner::Citizens)
                } else if wolves_alive >= others_alive {
                    Some(Winner::Wolves)
                } else {
                    None
                }
            }
        }
    }
}

/// What a kill did to the flow of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KillOutcome {
    /// The caller's normal transition proceeds.
    Continue,
    /// A hunter died and the room is now in `HunterShot`.
    Interrupted,
    /// The kill ended the game.
    Ended,
}

/// Counts votes from living voters for living targets.
///
/// Deterministic for a given `votes` map: no randomness is involved.
pub fn tally(
    votes: &BTreeMap<PlayerId, PlayerId>,
    players: &PlayerRegistry,
) -> BTreeMap<PlayerId, usize> {
    let mut counts = BTreeMap::new();
    for (voter, target) in votes {
        if players.is_alive(*voter) && players.is_alive(*target) {
            *counts.entry(*target).or_insert(0) += 1;
        }
    }
    counts
}

impl Game {
    /// Deals roles and enters `Reveal`. Preconditions are checked by the
    /// caller.
    pub(crate) fn start(&mut self, seed: u32, now: Instant) -> Outbox {
        let mut out = Outbox::new();
        self.state.begin_game(seed);
        self.players.reset_for_game();

        let mut ids = self.players.ids();
        ids.shuffle(&mut self.state.rng);

        let n = ids.len();
        let wolves = usize::from(
            self.settings
                .wolves_count
                .clamp(1, RoomSettings::max_wolves(n)),
        )
        .min(n);
        for id in &ids[..wolves] {
            if let Some(p) = self.players.get_mut(*id) {
                p.role = Role::Wolf;
            }
        }
        if self.settings.hunter_enabled && n >= HUNTER_MIN_PLAYERS {
            if let Some(p) = ids.get(wolves).and_then(|id| self.players.get_mut(*id)) {
                p.role = Role::Hunter;
            }
        }

        tracing::info!(seed, players = n, wolves, "game started");

        for p in self.players.iter() {
            out.push((
                Recipient::Player(p.id),
                ServerMessage::Private {
                    id: p.id,
                    role: p.role,
                    seed,
                },
            ));
        }
        self.enter(Phase::Reveal, now);
        let noun = if wolves == 1 { "wolf" } else { "wolves" };
        out.push(log_emph(format!(
            "Roles are dealt: {wolves} {noun} among {n} players. Check your card."
        )));
        out.push((Recipient::All, self.lobby_view()));
        out.push((Recipient::All, self.state_view(now)));
        out
    }

    /// Performs at most one transition if the current deadline has passed.
    ///
    /// Does nothing in `Lobby` and `GameOver`. Later calls catch up if more
    /// than one transition is overdue, since each new phase sets a fresh
    /// deadline.
    pub fn advance(&mut self, now: Instant) -> Outbox {
        let mut out = Outbox::new();
        if !self.state.is_due(now) {
            return out;
        }
        match self.state.phase {
            Phase::Reveal => self.enter_announced(Phase::Night, now, &mut out),
            Phase::Night => self.resolve_night(now, &mut out),
            Phase::DayTalk => self.enter_announced(Phase::DayVote, now, &mut out),
            Phase::DayVote => self.resolve_vote(now, &mut out),
            Phase::HunterShot => self.resolve_hunter_shot(None, now, &mut out),
            Phase::Lobby | Phase::GameOver => return out,
        }
        out.push((Recipient::All, self.state_view(now)));
        out
    }

    fn resolve_night(&mut self, now: Instant, out: &mut Outbox) {
        if self.players.wolves_alive().is_empty() {
            if !self.end_if_won(now, out) {
                self.enter_announced(Phase::DayTalk, now, out);
            }
            return;
        }

        let candidates = self.players.non_wolves_alive_ids();
        let chosen = self.state.wolf_target.filter(|id| candidates.contains(id));
        let victim = chosen.or_else(|| candidates.choose(&mut self.state.rng).copied());

        let Some(victim) = victim else {
            out.push(log_emph("The night was quiet. Nobody died."));
            self.enter_announced(Phase::DayTalk, now, out);
            return;
        };

        let reason = format!(
            "{} was found dead this morning.",
            self.players.name_of(victim)
        );
        let day = self.state.day;
        if self.kill(victim, reason, Phase::DayTalk, day, now, out) == KillOutcome::Continue {
            self.enter_announced(Phase::DayTalk, now, out);
        }
    }

    fn resolve_vote(&mut self, now: Instant, out: &mut Outbox) {
        let alive = self.players.alive_ids();
        for voter in &alive {
            if self.state.votes.contains_key(voter) {
                continue;
            }
            let others: Vec<PlayerId> = alive.iter().copied().filter(|id| id != voter).collect();
            if let Some(target) = others.choose(&mut self.state.rng) {
                self.state.votes.insert(*voter, *target);
            }
        }

        let counts = tally(&self.state.votes, &self.players);
        let next_day = self.state.day + 1;
        let tied: Vec<PlayerId> = match counts.values().max() {
            Some(max) => counts
                .iter()
                .filter(|(_, n)| *n == max)
                .map(|(id, _)| *id)
                .collect(),
            None => Vec::new(),
        };

        let Some(eliminated) = tied.choose(&mut self.state.rng).copied() else {
            out.push(log_emph("No votes counted. Nobody is eliminated."));
            self.state.day = next_day;
            self.enter_announced(Phase::Night, now, out);
            return;
        };

        if tied.len() > 1 {
            let names: Vec<String> = tied.iter().map(|id| self.players.name_of(*id)).collect();
            out.push(log(format!("Tie between {}. Fate decides.", names.join(", "))));
        }
        let reason = format!(
            "The village eliminated {}.",
            self.players.name_of(eliminated)
        );
        if self.kill(eliminated, reason, Phase::Night, next_day, now, out) == KillOutcome::Continue {
            self.state.day = next_day;
            self.enter_announced(Phase::Night, now, out);
        }
    }

    /// Resolves the pending hunter shot, then resumes the interrupted flow.
    ///
    /// `target` is the shooter's explicit pick; `None` (or an invalid pick)
    /// falls back to a random living player other than the shooter.
    pub(crate) fn resolve_hunter_shot(
        &mut self,
        target: Option<PlayerId>,
        now: Instant,
        out: &mut Outbox,
    ) {
        let resume = self.state.pending_after_phase.unwrap_or(Phase::Night);
        let resume_day = self.state.pending_after_day.max(self.state.day);
        let shooter = self
            .state
            .hunter_shooter_id
            .filter(|id| self.players.contains(*id));
        self.state.clear_interrupt();

        match shooter {
            Some(shooter) => {
                if let Some(p) = self.players.get_mut(shooter) {
                    p.hunter_shot_used = true;
                }
                let explicit = target.filter(|t| *t != shooter && self.players.is_alive(*t));
                let victim = explicit.or_else(|| {
                    let candidates: Vec<PlayerId> = self
                        .players
                        .alive_ids()
                        .into_iter()
                        .filter(|id| *id != shooter)
                        .collect();
                    candidates.choose(&mut self.state.rng).copied()
                });

                match victim {
                    Some(victim) => {
                        let reason = format!(
                            "{} fired a last shot and took down {}.",
                            self.players.name_of(shooter),
                            self.players.name_of(victim)
                        );
                        if self.kill(victim, reason, resume, resume_day, now, out)
                            != KillOutcome::Continue
                        {
                            return;
                        }
                    }
                    None => {
                        out.push(log("The hunter had nobody left to shoot."));
                        if self.end_if_won(now, out) {
                            return;
                        }
                    }
                }
            }
            None => {
                out.push(log("The hunter's shot was never fired."));
                if self.end_if_won(now, out) {
                    return;
                }
            }
        }

        self.state.day = resume_day;
        self.enter_announced(resume, now, out);
    }

    /// Marks `id` dead and either interrupts for a hunter shot, ends the
    /// game, or lets the caller continue.
    ///
    /// `resume`/`resume_day` are where the caller would go next; they are
    /// stored if a hunter interrupt suspends the flow.
    pub(crate) fn kill(
        &mut self,
        id: PlayerId,
        reason: String,
        resume: Phase,
        resume_day: u32,
        now: Instant,
        out: &mut Outbox,
    ) -> KillOutcome {
        let Some(player) = self.players.get_mut(id) else {
            return KillOutcome::Continue;
        };
        player.alive = false;
        let can_shoot = player.role == Role::Hunter && !player.hunter_shot_used;
        tracing::info!(player_id = %id, role = %player.role, "player killed");
        out.push(log_emph(reason));

        if can_shoot && self.settings.hunter_enabled {
            self.state.suspend(id, resume, resume_day);
            self.enter(Phase::HunterShot, now);
            out.push(log_emph(format!(
                "{} was the hunter and has one last shot!",
                self.players.name_of(id)
            )));
            return KillOutcome::Interrupted;
        }

        if self.end_if_won(now, out) {
            KillOutcome::Ended
        } else {
            KillOutcome::Continue
        }
    }

    /// Applies the win rule to the living players. Ends the game and
    /// returns `true` if a side has won.
    pub(crate) fn end_if_won(&mut self, now: Instant, out: &mut Outbox) -> bool {
        let wolves = self.players.wolves_alive().len();
        let others = self.players.alive().len() - wolves;
        match WinRule::default().evaluate(wolves, others) {
            Some(winner) => {
                self.end_game(winner, now, out);
                true
            }
            None => false,
        }
    }

    fn end_game(&mut self, winner: Winner, now: Instant, out: &mut Outbox) {
        self.state.clear_interrupt();
        self.enter(Phase::GameOver, now);
        tracing::info!(?winner, day = self.state.day, seed = self.state.seed, "game over");

        let (title, sub) = match winner {
            Winner::Citizens => ("The village wins", "Every wolf has been hunted down."),
            Winner::Wolves => ("The wolves win", "The wolves now rule the village."),
        };
        out.push((
            Recipient::All,
            ServerMessage::GameOver {
                title: title.to_string(),
                sub: sub.to_string(),
            },
        ));

        let wolves: Vec<String> = self
            .players
            .iter()
            .filter(|p| p.is_wolf())
            .map(|p| p.name.clone())
            .collect();
        if !wolves.is_empty() {
            out.push(log(format!("The wolves were: {}.", wolves.join(", "))));
        }
        out.push((Recipient::All, self.lobby_view()));
    }

    /// Abandons the current game. Names, connections and ready flags stay;
    /// roles and life are reset.
    pub(crate) fn back_to_lobby(&mut self, now: Instant) -> Outbox {
        self.state.reset_to_lobby();
        self.players.reset_for_game();
        tracing::info!("room returned to lobby");
        vec![
            log_emph("Back to the lobby."),
            (Recipient::All, self.lobby_view()),
            (Recipient::All, self.state_view(now)),
        ]
    }

    fn enter_announced(&mut self, phase: Phase, now: Instant, out: &mut Outbox) {
        self.enter(phase, now);
        let text = match phase {
            Phase::Night => format!("Night {} falls. Wolves, pick your prey.", self.state.day),
            Phase::DayTalk => format!("Day {}: the village wakes up and talks.", self.state.day),
            Phase::DayVote => "Time to vote.".to_string(),
            _ => return,
        };
        out.push(log_emph(text));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::RoomConfig;

    /// A game with `n` players in Lobby, ids 1..=n.
    fn lobby(n: usize) -> Game {
        let mut game = Game::new(RoomConfig::default());
        for _ in 0..n {
            game.players.add().ready = true;
        }
        game.state.host_id = game.players.lowest_id();
        game
    }

    fn set_roles(game: &mut Game, roles: &[(u64, Role)]) {
        for (id, role) in roles {
            if let Some(p) = game.players.get_mut(PlayerId(*id)) {
                p.role = *role;
            }
        }
    }

    /// Puts a lobby game straight into `phase` with fixed roles.
    fn in_phase(n: usize, roles: &[(u64, Role)], phase: Phase, now: Instant) -> Game {
        let mut game = lobby(n);
        game.state.begin_game(7);
        set_roles(&mut game, roles);
        game.enter(phase, now);
        game
    }

    fn due(game: &Game, now: Instant) -> Instant {
        now + game.state.ends_in(now).unwrap_or_default()
    }

    fn alive(game: &Game) -> Vec<u64> {
        game.players.alive_ids().into_iter().map(|id| id.0).collect()
    }

    fn has_gameover(out: &Outbox) -> bool {
        out.iter()
            .any(|(_, m)| matches!(m, ServerMessage::GameOver { .. }))
    }

    #[test]
    fn test_parity_rule_is_exhaustive() {
        for wolves in 0..6 {
            for others in 0..6 {
                let result = WinRule::Parity.evaluate(wolves, others);
                let expected = if wolves == 0 {
                    Some(Winner::Citizens)
                } else if wolves >= others {
                    Some(Winner::Wolves)
                } else {
                    None
                };
                assert_eq!(result, expected, "wolves={wolves} others={others}");
            }
        }
    }

    #[test]
    fn test_start_deals_one_wolf_and_one_hunter() {
        for seed in [1u32, 42, 99, 12345, u32::MAX] {
            let mut game = lobby(5);
            let out = game.start(seed, Instant::now());

            let wolves = game.players.iter().filter(|p| p.role == Role::Wolf).count();
            let hunters: Vec<_> = game.players.iter().filter(|p| p.role == Role::Hunter).collect();
            assert_eq!(wolves, 1);
            assert_eq!(hunters.len(), 1);
            assert!(!hunters[0].is_wolf());
            assert_eq!(game.phase(), Phase::Reveal);

            let privates = out
                .iter()
                .filter(|(to, m)| {
                    matches!(to, Recipient::Player(_))
                        && matches!(m, ServerMessage::Private { seed: s, .. } if *s == seed)
                })
                .count();
            assert_eq!(privates, 5);
        }
    }

    #[test]
    fn test_start_is_reproducible_from_seed() {
        let roles = |seed| {
            let mut game = lobby(8);
            game.settings.wolves_count = 2;
            game.start(seed, Instant::now());
            game.players.iter().map(|p| p.role).collect::<Vec<_>>()
        };
        assert_eq!(roles(2024), roles(2024));
    }

    #[test]
    fn test_start_without_hunter_when_disabled() {
        let mut game = lobby(6);
        game.settings.hunter_enabled = false;
        game.start(3, Instant::now());
        assert!(game.players.iter().all(|p| p.role != Role::Hunter));
    }

    #[test]
    fn test_start_clamps_wolves_to_player_count() {
        let mut game = lobby(5);
        game.settings.wolves_count = 3;
        game.start(11, Instant::now());
        let wolves = game.players.iter().filter(|p| p.is_wolf()).count();
        assert_eq!(wolves, 3);
        assert_eq!(game.players.len() - wolves, 2);
    }

    #[test]
    fn test_advance_is_noop_before_deadline_and_in_lobby() {
        let now = Instant::now();
        let mut game = lobby(5);
        assert!(game.advance(now + Duration::from_secs(3600)).is_empty());

        game.start(5, now);
        assert!(game.advance(now + Duration::from_secs(1)).is_empty());
        assert_eq!(game.phase(), Phase::Reveal);
    }

    #[test]
    fn test_advance_performs_one_transition_per_call() {
        let now = Instant::now();
        let mut game = lobby(5);
        game.start(5, now);

        // Far past every deadline: still only Reveal -> Night.
        let late = now + Duration::from_secs(3600);
        game.advance(late);
        assert_eq!(game.phase(), Phase::Night);
        assert_eq!(game.state.ends_in(late), Some(game.settings.night));
    }

    #[test]
    fn test_night_kills_chosen_target() {
        let now = Instant::now();
        let mut game = in_phase(5, &[(1, Role::Wolf)], Phase::Night, now);
        game.state.wolf_target = Some(PlayerId(3));

        game.advance(due(&game, now));
        assert_eq!(alive(&game), vec![1, 2, 4, 5]);
        assert_eq!(game.phase(), Phase::DayTalk);
        assert_eq!(game.state.day, 1);
    }

    #[test]
    fn test_night_without_target_kills_random_non_wolf() {
        let now = Instant::now();
        let mut game = in_phase(5, &[(1, Role::Wolf)], Phase::Night, now);

        game.advance(due(&game, now));
        let dead: Vec<_> = game.players.iter().filter(|p| !p.alive).collect();
        assert_eq!(dead.len(), 1);
        assert!(!dead[0].is_wolf());
    }

    #[test]
    fn test_night_kill_of_hunter_interrupts() {
        let now = Instant::now();
        let mut game = in_phase(
            5,
            &[(1, Role::Wolf), (2, Role::Hunter)],
            Phase::Night,
            now,
        );
        game.state.wolf_target = Some(PlayerId(2));

        game.advance(due(&game, now));
        assert_eq!(game.phase(), Phase::HunterShot);
        assert_eq!(game.state.hunter_shooter_id, Some(PlayerId(2)));
        assert_eq!(game.state.pending_after_phase, Some(Phase::DayTalk));
        assert_eq!(game.state.pending_after_day, 1);
    }

    #[test]
    fn test_random_night_victim_hunter_interrupts() {
        let now = Instant::now();
        let mut hunter_hits = 0;
        for seed in 0..64 {
            let mut game = in_phase(
                5,
                &[(1, Role::Wolf), (2, Role::Hunter)],
                Phase::Night,
                now,
            );
            game.state.begin_game(seed);
            let t1 = due(&game, now);
            game.advance(t1);

            if game.players.is_alive(PlayerId(2)) {
                assert_eq!(game.phase(), Phase::DayTalk, "seed {seed}");
            } else {
                hunter_hits += 1;
                assert_eq!(game.phase(), Phase::HunterShot, "seed {seed}");
                assert_eq!(game.state.hunter_shooter_id, Some(PlayerId(2)));
                assert_eq!(game.state.pending_after_phase, Some(Phase::DayTalk));
                assert_eq!(game.state.ends_in(t1), Some(game.settings.hunter));
            }
        }
        assert!(hunter_hits > 0);
    }

    #[test]
    fn test_night_with_no_candidates_is_quiet() {
        let now = Instant::now();
        let mut game = in_phase(3, &[(1, Role::Wolf)], Phase::Night, now);
        for id in [2, 3] {
            game.players.get_mut(PlayerId(id)).unwrap().role = Role::Wolf;
        }
        // All wolves: win rule would already have fired; still guard.
        let out = game.advance(due(&game, now));
        assert_eq!(alive(&game), vec![1, 2, 3]);
        assert!(!has_gameover(&out));
        assert_eq!(game.phase(), Phase::DayTalk);
    }

    #[test]
    fn test_night_with_no_wolves_ends_game() {
        let now = Instant::now();
        let mut game = in_phase(5, &[], Phase::Night, now);
        let out = game.advance(due(&game, now));
        assert_eq!(game.phase(), Phase::GameOver);
        assert!(has_gameover(&out));
    }

    #[test]
    fn test_tally_counts_living_only() {
        let mut game = lobby(4);
        let votes: BTreeMap<PlayerId, PlayerId> = [(1, 2), (2, 1), (3, 2), (4, 1)]
            .into_iter()
            .map(|(a, b)| (PlayerId(a), PlayerId(b)))
            .collect();

        let counts = tally(&votes, &game.players);
        assert_eq!(counts.get(&PlayerId(1)), Some(&2));
        assert_eq!(counts.get(&PlayerId(2)), Some(&2));
        assert_eq!(counts, tally(&votes, &game.players));

        game.players.get_mut(PlayerId(2)).unwrap().alive = false;
        let counts = tally(&votes, &game.players);
        assert_eq!(counts.get(&PlayerId(2)), None);
        assert_eq!(counts.get(&PlayerId(1)), Some(&1));
    }

    #[test]
    fn test_vote_tie_eliminates_one_of_the_tied() {
        let now = Instant::now();
        let mut game = in_phase(6, &[(6, Role::Wolf)], Phase::DayVote, now);
        game.players.get_mut(PlayerId(5)).unwrap().alive = false;
        // Alive: 1 to 4 plus wolf 6.
        for (a, b) in [(1, 2), (2, 1), (3, 2), (4, 1), (6, 3)] {
            game.state.votes.insert(PlayerId(a), PlayerId(b));
        }

        game.advance(due(&game, now));
        let dead: Vec<u64> = [1, 2]
            .into_iter()
            .filter(|id| !game.players.is_alive(PlayerId(*id)))
            .collect();
        assert_eq!(dead.len(), 1);
        assert_eq!(game.phase(), Phase::Night);
        assert_eq!(game.state.day, 2);
    }

    #[test]
    fn test_missing_votes_are_auto_assigned() {
        let now = Instant::now();
        let mut game = in_phase(5, &[(1, Role::Wolf)], Phase::DayVote, now);
        for id in [4, 5] {
            game.players.get_mut(PlayerId(id)).unwrap().alive = false;
        }
        // Three alive, none voted.
        game.advance(due(&game, now));
        assert_eq!(game.players.alive_ids().len(), 2);
        assert_eq!(game.state.votes.len(), 3);
        for (voter, target) in &game.state.votes {
            assert_ne!(voter, target);
        }
    }

    #[test]
    fn test_vote_with_single_survivor_is_noop() {
        let now = Instant::now();
        let mut game = in_phase(5, &[], Phase::DayVote, now);
        for id in 2..=5 {
            game.players.get_mut(PlayerId(id)).unwrap().alive = false;
        }
        // No wolves at all would end the game on a kill; there is none here.
        game.advance(due(&game, now));
        assert_eq!(alive(&game), vec![1]);
        assert_eq!(game.phase(), Phase::Night);
        assert_eq!(game.state.day, 2);
    }

    #[test]
    fn test_voting_out_last_wolf_ends_game() {
        let now = Instant::now();
        let mut game = in_phase(5, &[(3, Role::Wolf)], Phase::DayVote, now);
        for voter in [1, 2, 4, 5] {
            game.state.votes.insert(PlayerId(voter), PlayerId(3));
        }
        game.state.votes.insert(PlayerId(3), PlayerId(1));

        let out = game.advance(due(&game, now));
        assert_eq!(game.phase(), Phase::GameOver);
        assert!(out.iter().any(|(_, m)| matches!(
            m,
            ServerMessage::GameOver { title, .. } if title == "The village wins"
        )));
        assert_eq!(game.state.ends_in(now), None);

        // Terminal: nothing more happens however long we wait.
        assert!(game.advance(now + Duration::from_secs(3600)).is_empty());
        assert_eq!(game.phase(), Phase::GameOver);
    }

    #[test]
    fn test_hunter_voted_out_resumes_night_next_day() {
        let now = Instant::now();
        let mut game = in_phase(
            6,
            &[(1, Role::Wolf), (2, Role::Hunter)],
            Phase::DayVote,
            now,
        );
        for voter in [1, 3, 4, 5, 6] {
            game.state.votes.insert(PlayerId(voter), PlayerId(2));
        }
        game.state.votes.insert(PlayerId(2), PlayerId(3));

        let t1 = due(&game, now);
        game.advance(t1);
        assert_eq!(game.phase(), Phase::HunterShot);
        assert_eq!(game.state.pending_after_phase, Some(Phase::Night));
        assert_eq!(game.state.pending_after_day, 2);
        assert_eq!(game.state.day, 1);

        let mut out = Outbox::new();
        game.resolve_hunter_shot(Some(PlayerId(4)), t1, &mut out);
        assert!(!game.players.is_alive(PlayerId(4)));
        assert_eq!(game.phase(), Phase::Night);
        assert_eq!(game.state.day, 2);
        assert_eq!(game.state.ends_in(t1), Some(game.settings.night));
        assert_eq!(game.state.hunter_shooter_id, None);
        assert_eq!(game.state.pending_after_phase, None);
        assert!(game.players.get(PlayerId(2)).unwrap().hunter_shot_used);
    }

    #[test]
    fn test_hunter_shot_deadline_picks_random_target() {
        let now = Instant::now();
        let mut game = in_phase(
            6,
            &[(1, Role::Wolf), (2, Role::Hunter)],
            Phase::Night,
            now,
        );
        game.state.wolf_target = Some(PlayerId(2));
        let t1 = due(&game, now);
        game.advance(t1);
        assert_eq!(game.phase(), Phase::HunterShot);

        game.advance(due(&game, t1));
        assert_eq!(game.players.alive_ids().len(), 4);
        assert!(matches!(game.phase(), Phase::DayTalk | Phase::GameOver));
    }

    #[test]
    fn test_nested_hunter_interrupt_resumes_original_flow() {
        let now = Instant::now();
        let mut game = in_phase(
            8,
            &[(1, Role::Wolf), (2, Role::Hunter), (3, Role::Hunter)],
            Phase::Night,
            now,
        );
        game.state.wolf_target = Some(PlayerId(2));
        let t1 = due(&game, now);
        game.advance(t1);
        assert_eq!(game.state.hunter_shooter_id, Some(PlayerId(2)));

        // First hunter shoots the second hunter: a second interrupt.
        let mut out = Outbox::new();
        game.resolve_hunter_shot(Some(PlayerId(3)), t1, &mut out);
        assert_eq!(game.phase(), Phase::HunterShot);
        assert_eq!(game.state.hunter_shooter_id, Some(PlayerId(3)));
        assert_eq!(game.state.pending_after_phase, Some(Phase::DayTalk));

        let mut out = Outbox::new();
        game.resolve_hunter_shot(Some(PlayerId(4)), t1, &mut out);
        assert_eq!(game.phase(), Phase::DayTalk);
        assert_eq!(game.state.day, 1);
        assert_eq!(game.state.ends_in(t1), Some(game.settings.talk));
        assert_eq!(alive(&game), vec![1, 5, 6, 7, 8]);
    }

    #[test]
    fn test_hunter_shoots_only_once_per_game() {
        let now = Instant::now();
        let mut game = in_phase(
            7,
            &[(1, Role::Wolf), (2, Role::Hunter)],
            Phase::Night,
            now,
        );
        game.players.get_mut(PlayerId(2)).unwrap().hunter_shot_used = true;
        game.state.wolf_target = Some(PlayerId(2));

        game.advance(due(&game, now));
        assert_eq!(game.phase(), Phase::DayTalk);
        assert_eq!(game.state.hunter_shooter_id, None);
    }

    #[test]
    fn test_hunter_interrupt_precedes_win_check() {
        let now = Instant::now();
        // One wolf, hunter and one citizen: killing the hunter reaches parity.
        let mut game = in_phase(3, &[(1, Role::Wolf), (2, Role::Hunter)], Phase::Night, now);
        game.state.wolf_target = Some(PlayerId(2));

        let t1 = due(&game, now);
        let out = game.advance(t1);
        assert!(!has_gameover(&out));
        assert_eq!(game.phase(), Phase::HunterShot);

        // The hunter takes the wolf with them.
        let mut out = Outbox::new();
        game.resolve_hunter_shot(Some(PlayerId(1)), t1, &mut out);
        assert!(has_gameover(&out));
        assert_eq!(game.phase(), Phase::GameOver);
    }

    #[test]
    fn test_game_over_lists_wolves() {
        let now = Instant::now();
        let mut game = in_phase(5, &[(3, Role::Wolf)], Phase::DayVote, now);
        game.players.get_mut(PlayerId(3)).unwrap().name = "Mallory".into();
        for voter in 1..=5 {
            game.state.votes.insert(PlayerId(voter), PlayerId(if voter == 3 { 1 } else { 3 }));
        }
        let out = game.advance(due(&game, now));
        assert!(out.iter().any(|(_, m)| matches!(
            m,
            ServerMessage::Log { text, .. }
                if text.starts_with("The wolves were") && text.contains("Mallory")
        )));
    }

    #[test]
    fn test_back_to_lobby_resets_game_but_keeps_names_and_ready() {
        let now = Instant::now();
        let mut game = lobby(5);
        game.players.get_mut(PlayerId(4)).unwrap().name = "Ada".into();
        game.start(9, now);
        game.advance(now + Duration::from_secs(60));

        game.back_to_lobby(now);
        assert_eq!(game.phase(), Phase::Lobby);
        assert_eq!(game.state.day, 1);
        assert_eq!(game.state.ends_in(now), None);
        assert_eq!(game.players.len(), 5);
        assert_eq!(game.players.name_of(PlayerId(4)), "Ada");
        assert!(game.players.iter().all(|p| p.alive && p.role == Role::Citizen));
        assert!(game.players.all_ready());
    }
}
