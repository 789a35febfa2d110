//! Error types for the room layer.

use nightfall_protocol::{Phase, PlayerId, Role};

/// Errors returned by [`RoomHandle`](crate::RoomHandle) operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room already holds its maximum number of players.
    #[error("room is full ({0} players)")]
    RoomFull(usize),

    /// The room actor has shut down or its queue is closed.
    #[error("room is unavailable")]
    Unavailable,
}

/// Why a client command was not applied.
///
/// These never terminate anything: the command is dropped and logged. Only
/// `start` rejections are shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("player {0} is not in the room")]
    UnknownPlayer(PlayerId),

    #[error("only the host can do that")]
    NotHost,

    #[error("not allowed during {actual}")]
    WrongPhase { actual: Phase },

    #[error("at least {required} players are needed ({present} present)")]
    NotEnoughPlayers { present: usize, required: usize },

    #[error("every player must be ready")]
    NotAllReady,

    #[error("dead players cannot act")]
    NotAlive,

    #[error("only a {required} can do that")]
    WrongRole { required: Role },

    #[error("only the dying hunter can shoot")]
    NotShooter,

    #[error("invalid target {0}")]
    InvalidTarget(PlayerId),

    #[error("name must be 1 to {max} characters")]
    InvalidName { max: usize },
}
