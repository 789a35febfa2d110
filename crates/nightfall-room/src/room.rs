//! Room actor: the one task that owns the game.
//!
//! Connection handlers and the phase timer never touch [`Game`] directly.
//! Handlers send commands through a bounded mpsc queue; the timer is a
//! branch of the same `select!` loop. Every mutation therefore runs on one
//! task, one at a time, in queue order.

use std::collections::BTreeMap;

use nightfall_protocol::{ClientMessage, PlayerId, Recipient, ServerMessage};
use nightfall_tick::{TickConfig, TickScheduler};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::config::RoomConfig;
use crate::error::{CommandError, RoomError};
use crate::game::{Game, Outbox, RoomInfo, log_to};

/// Channel sender for delivering payloads to one connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

/// Commands sent to the room actor.
///
/// Variants carrying a `oneshot::Sender` expect a reply.
enum RoomCommand {
    /// Register a connection and allocate its player.
    Connect {
        sender: PlayerSender,
        reply: oneshot::Sender<Result<PlayerId, RoomError>>,
    },

    /// A connection went away (closed, failed or sent `leave`).
    Disconnect { player_id: PlayerId },

    /// A decoded client command.
    Message {
        sender: PlayerId,
        msg: ClientMessage,
    },

    /// Request a snapshot.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Stop the actor and its timer.
    Shutdown,
}

/// Handle to the running room actor.
///
/// Cheap to clone: it only wraps the queue's sender.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Joins the room. `sender` receives every payload addressed to the
    /// new player, starting with `welcome`.
    pub async fn connect(&self, sender: PlayerSender) -> Result<PlayerId, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Connect {
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)?
    }

    /// Reports that a player's connection is gone.
    pub async fn disconnect(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Disconnect { player_id })
            .await
            .map_err(|_| RoomError::Unavailable)
    }

    /// Forwards a client command (fire-and-forget).
    pub async fn send_message(
        &self,
        sender: PlayerId,
        msg: ClientMessage,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Message { sender, msg })
            .await
            .map_err(|_| RoomError::Unavailable)
    }

    /// Returns a snapshot of the room.
    ///
    /// The reply is produced after every command queued before it, so
    /// awaiting it also waits for those to be applied.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable)
    }
}

struct RoomActor {
    game: Game,
    senders: BTreeMap<PlayerId, PlayerSender>,
    scheduler: TickScheduler,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(
            tick_ms = self.scheduler.interval().as_millis() as u64,
            max_players = self.game.config().max_players,
            "room actor started"
        );

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    match cmd {
                        RoomCommand::Connect { sender, reply } => {
                            let result = self.handle_connect(sender);
                            let _ = reply.send(result);
                        }
                        RoomCommand::Disconnect { player_id } => {
                            self.handle_disconnect(player_id);
                        }
                        RoomCommand::Message { sender, msg } => {
                            self.handle_message(sender, msg);
                        }
                        RoomCommand::Info { reply } => {
                            let _ = reply.send(self.game.info(Instant::now()));
                        }
                        RoomCommand::Shutdown => {
                            tracing::info!("room shutting down");
                            break;
                        }
                    }
                }
                _ = self.scheduler.wait_for_tick() => {
                    let out = self.game.advance(Instant::now());
                    self.dispatch(out);
                    self.scheduler.record_tick_end();
                }
            }
            self.scheduler.set_active(self.game.phase().is_timed());
        }

        tracing::info!("room actor stopped");
    }

    fn handle_connect(&mut self, sender: PlayerSender) -> Result<PlayerId, RoomError> {
        let (id, out) = self.game.connect(Instant::now())?;
        self.senders.insert(id, sender);
        self.dispatch(out);
        Ok(id)
    }

    fn handle_disconnect(&mut self, player_id: PlayerId) {
        self.senders.remove(&player_id);
        let out = self.game.disconnect(player_id, Instant::now());
        self.dispatch(out);
    }

    fn handle_message(&mut self, sender: PlayerId, msg: ClientMessage) {
        let is_start = matches!(msg, ClientMessage::Start);
        match self.game.apply(sender, msg, Instant::now()) {
            Ok(out) => self.dispatch(out),
            Err(reason) => {
                tracing::debug!(%sender, %reason, "command rejected");
                if is_start && !matches!(reason, CommandError::UnknownPlayer(_)) {
                    self.dispatch(vec![log_to(
                        Recipient::Player(sender),
                        format!("Cannot start: {reason}."),
                        true,
                    )]);
                }
            }
        }
    }

    /// Delivers each payload to its recipients. A closed channel only
    /// means that connection is on its way out; its own disconnect cleans
    /// up, so failures are counted and otherwise ignored.
    fn dispatch(&self, out: Outbox) {
        let mut failed = 0usize;
        for (recipient, msg) in out {
            match recipient {
                Recipient::All => {
                    for sender in self.senders.values() {
                        failed += usize::from(sender.send(msg.clone()).is_err());
                    }
                }
                Recipient::Player(id) => {
                    if let Some(sender) = self.senders.get(&id) {
                        failed += usize::from(sender.send(msg).is_err());
                    }
                }
                Recipient::AllExcept(excluded) => {
                    for (id, sender) in &self.senders {
                        if *id != excluded {
                            failed += usize::from(sender.send(msg.clone()).is_err());
                        }
                    }
                }
            }
        }
        if failed > 0 {
            tracing::debug!(failed, "some sends failed");
        }
    }
}

/// Spawns the room actor and returns a handle to it.
///
/// The actor runs until [`RoomHandle::shutdown`] or until every handle is
/// dropped. Its timer is paused whenever the phase is untimed.
pub fn spawn_room(config: RoomConfig) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let mut scheduler = TickScheduler::new(TickConfig::with_interval(config.tick_interval));
    scheduler.pause();

    let actor = RoomActor {
        game: Game::new(config),
        senders: BTreeMap::new(),
        scheduler,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    RoomHandle { sender: tx }
}
