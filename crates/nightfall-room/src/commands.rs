//! Connection lifecycle and client command validation.
//!
//! Every command is checked against the caller's role, liveness and the
//! current phase before anything changes. A failed check leaves the game
//! untouched and returns a [`CommandError`].

use nightfall_protocol::{ClientMessage, Phase, PlayerId, Recipient, Role, ServerMessage};
use rand::Rng;
use tokio::time::Instant;

use crate::config::SettingsUpdate;
use crate::error::{CommandError, RoomError};
use crate::game::{Game, Outbox, log, log_to};
use crate::state::RoomState;

impl Game {
    /// Admits a new connection.
    ///
    /// The first player becomes host. Anyone arriving while a game is in
    /// progress watches it as a dead player and takes part from the next
    /// start.
    pub fn connect(&mut self, now: Instant) -> Result<(PlayerId, Outbox), RoomError> {
        if self.players.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.config.max_players));
        }

        let in_game = self.state.phase != Phase::Lobby;
        let player = self.players.add();
        player.alive = !in_game;
        let id = player.id;
        let name = player.name.clone();
        if self.state.host_id.is_none() {
            self.state.host_id = Some(id);
        }
        tracing::info!(
            player_id = %id,
            players = self.players.len(),
            late = in_game,
            "player connected"
        );

        let mut out = vec![
            (
                Recipient::Player(id),
                ServerMessage::Welcome {
                    id,
                    is_host: self.state.host_id == Some(id),
                    phase: self.state.phase,
                },
            ),
            log_to(Recipient::AllExcept(id), format!("{name} joined."), false),
            (Recipient::All, self.lobby_view()),
        ];
        if in_game {
            out.push((Recipient::All, self.state_view(now)));
        }
        Ok((id, out))
    }

    /// Removes a connection. Unknown ids are ignored.
    ///
    /// When the last player leaves the room resets to an empty lobby;
    /// settings survive.
    pub fn disconnect(&mut self, id: PlayerId, now: Instant) -> Outbox {
        let Some(player) = self.players.remove(id) else {
            return Outbox::new();
        };
        tracing::info!(player_id = %id, players = self.players.len(), "player left");

        if self.players.is_empty() {
            self.state = RoomState::new();
            tracing::info!("room empty, reset to lobby");
            return Outbox::new();
        }

        self.state.forget(id);
        if self.state.host_id == Some(id) {
            self.state.host_id = self.players.lowest_id();
            tracing::info!(host_id = ?self.state.host_id, "host reassigned");
        }

        let mut out = vec![
            log(format!("{} left.", player.name)),
            (Recipient::All, self.lobby_view()),
        ];
        if self.state.phase.is_timed() {
            // A pending hunter shot settles the win check once it resolves.
            if self.state.phase != Phase::HunterShot {
                self.end_if_won(now, &mut out);
            }
            out.push((Recipient::All, self.state_view(now)));
        }
        out
    }

    /// Validates and applies one client command from `sender`.
    pub fn apply(
        &mut self,
        sender: PlayerId,
        msg: ClientMessage,
        now: Instant,
    ) -> Result<Outbox, CommandError> {
        if !self.players.contains(sender) {
            return Err(CommandError::UnknownPlayer(sender));
        }

        match msg {
            ClientMessage::Join { name } => self.rename(sender, &name, now),
            ClientMessage::Ready { ready } => {
                if let Some(p) = self.players.get_mut(sender) {
                    p.ready = ready;
                }
                Ok(vec![(Recipient::All, self.lobby_view())])
            }
            ClientMessage::SetSettings {
                reveal_s,
                night_s,
                talk_s,
                vote_s,
                hunter_s,
                wolves_count,
                hunter_enabled,
            } => {
                self.require_host(sender)?;
                self.require_phase(Phase::Lobby)?;
                self.require_startable()?;
                let update = SettingsUpdate {
                    reveal_s,
                    night_s,
                    talk_s,
                    vote_s,
                    hunter_s,
                    wolves_count,
                    hunter_enabled,
                };
                self.settings.apply(&update, self.players.len());
                tracing::debug!(settings = ?self.settings, "settings updated");
                Ok(vec![(Recipient::All, self.lobby_view())])
            }
            ClientMessage::Start => {
                self.require_host(sender)?;
                self.require_phase(Phase::Lobby)?;
                self.require_startable()?;
                let seed = rand::rng().random::<u32>();
                Ok(self.start(seed, now))
            }
            ClientMessage::BackToLobby => {
                self.require_host(sender)?;
                Ok(self.back_to_lobby(now))
            }
            ClientMessage::WolfKill { target_id } => self.wolf_kill(sender, target_id),
            ClientMessage::Vote { target_id } => self.vote(sender, target_id),
            ClientMessage::HunterShot { target_id } => {
                self.require_phase(Phase::HunterShot)?;
                if self.state.hunter_shooter_id != Some(sender) {
                    return Err(CommandError::NotShooter);
                }
                self.require_target(sender, target_id)?;
                let mut out = Outbox::new();
                self.resolve_hunter_shot(Some(target_id), now, &mut out);
                out.push((Recipient::All, self.state_view(now)));
                Ok(out)
            }
            // Closing is the connection handler's job; the disconnect that
            // follows does the cleanup.
            ClientMessage::Leave => Ok(Outbox::new()),
        }
    }

    fn rename(&mut self, id: PlayerId, name: &str, now: Instant) -> Result<Outbox, CommandError> {
        let max = self.config.max_name_len;
        let name = name.trim();
        let len = name.chars().count();
        if len == 0 || len > max {
            return Err(CommandError::InvalidName { max });
        }
        if let Some(p) = self.players.get_mut(id) {
            p.name = name.to_string();
        }

        let mut out = vec![(Recipient::All, self.lobby_view())];
        if self.state.phase != Phase::Lobby {
            out.push((Recipient::All, self.state_view(now)));
        }
        Ok(out)
    }

    fn wolf_kill(&mut self, sender: PlayerId, target: PlayerId) -> Result<Outbox, CommandError> {
        self.require_phase(Phase::Night)?;
        self.require_alive(sender)?;
        if !self.players.get(sender).is_some_and(|p| p.is_wolf()) {
            return Err(CommandError::WrongRole { required: Role::Wolf });
        }
        self.require_target(sender, target)?;
        if self.players.get(target).is_some_and(|p| p.is_wolf()) {
            return Err(CommandError::InvalidTarget(target));
        }

        self.state.wolf_target = Some(target);
        let text = format!(
            "{} picked {} for tonight.",
            self.players.name_of(sender),
            self.players.name_of(target)
        );
        Ok(self
            .players
            .wolves_alive()
            .into_iter()
            .map(|wolf| log_to(Recipient::Player(wolf.id), text.clone(), false))
            .collect())
    }

    fn vote(&mut self, sender: PlayerId, target: PlayerId) -> Result<Outbox, CommandError> {
        self.require_phase(Phase::DayVote)?;
        self.require_alive(sender)?;
        self.require_target(sender, target)?;

        self.state.votes.insert(sender, target);
        Ok(vec![log_to(
            Recipient::Player(sender),
            format!("You voted for {}.", self.players.name_of(target)),
            false,
        )])
    }

    fn require_host(&self, id: PlayerId) -> Result<(), CommandError> {
        if self.state.host_id == Some(id) {
            Ok(())
        } else {
            Err(CommandError::NotHost)
        }
    }

    fn require_phase(&self, phase: Phase) -> Result<(), CommandError> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(CommandError::WrongPhase {
                actual: self.state.phase,
            })
        }
    }

    fn require_alive(&self, id: PlayerId) -> Result<(), CommandError> {
        if self.players.is_alive(id) {
            Ok(())
        } else {
            Err(CommandError::NotAlive)
        }
    }

    /// A target must be a living player other than the actor.
    fn require_target(&self, actor: PlayerId, target: PlayerId) -> Result<(), CommandError> {
        if target != actor && self.players.is_alive(target) {
            Ok(())
        } else {
            Err(CommandError::InvalidTarget(target))
        }
    }

    fn require_startable(&self) -> Result<(), CommandError> {
        let present = self.players.len();
        let required = self.config.min_players;
        if present < required {
            return Err(CommandError::NotEnoughPlayers { present, required });
        }
        if !self.players.all_ready() {
            return Err(CommandError::NotAllReady);
        }
        Ok(())
    }
}
