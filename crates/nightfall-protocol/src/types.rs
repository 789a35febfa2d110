//! Payload types for Nightfall's wire format.
//!
//! Every type here is serialized to JSON and read by browser clients, so
//! the serde attributes are part of the contract: field names are
//! camelCase, enums are internally tagged with a `type` field, and phases
//! and roles travel as lowercase strings.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for a connected player.
///
/// Allocated monotonically by the room when a connection is accepted and
/// never reused within the lifetime of the process. Serialized as a plain
/// number (`#[serde(transparent)]`), so `PlayerId(3)` is `3` on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive an outbound payload.
///
/// The room produces `(Recipient, ServerMessage)` pairs; the fan-out layer
/// resolves each recipient against the current connections. Never sent
/// over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every connection in the room.
    All,
    /// One connection only. Used for private role reveals and rejections.
    Player(PlayerId),
    /// Everyone except one connection.
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// Phase and Role
// ---------------------------------------------------------------------------

/// One state of the room's game-progress state machine.
///
/// ```text
/// Lobby → Reveal → Night → DayTalk → DayVote → Night (day + 1) → …
///                    │                  │
///                    └──→ HunterShot ←──┘   (interrupt, then resume)
/// any resolution → GameOver → (host) → Lobby
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    Reveal,
    Night,
    DayTalk,
    DayVote,
    HunterShot,
    #[serde(rename = "gameover")]
    GameOver,
}

impl Phase {
    /// Returns `true` for phases that carry a deadline and are advanced by
    /// the timer. `Lobby` and `GameOver` wait for the host instead.
    pub fn is_timed(self) -> bool {
        !matches!(self, Self::Lobby | Self::GameOver)
    }

    /// The lowercase name used on the wire and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Reveal => "reveal",
            Self::Night => "night",
            Self::DayTalk => "day_talk",
            Self::DayVote => "day_vote",
            Self::HunterShot => "hunter_shot",
            Self::GameOver => "gameover",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player's secret role for one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Citizen,
    Wolf,
    Hunter,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Citizen => write!(f, "citizen"),
            Self::Wolf => write!(f, "wolf"),
            Self::Hunter => write!(f, "hunter"),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Commands a client can send.
///
/// Internally tagged: `{"type":"wolfKill","targetId":4}`. Anything that
/// does not decode into one of these variants is discarded by the
/// connection handler without a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Set the display name.
    Join { name: String },

    /// Toggle the lobby ready flag.
    Ready { ready: bool },

    /// Host-only settings edit. Durations are in seconds; omitted fields
    /// keep their current value.
    ///
    /// Numbers are taken as any JSON number (negative, huge or fractional)
    /// and clamped by the room, so one odd field never drops the others.
    SetSettings {
        #[serde(default, deserialize_with = "lenient_int")]
        reveal_s: Option<i64>,
        #[serde(default, deserialize_with = "lenient_int")]
        night_s: Option<i64>,
        #[serde(default, deserialize_with = "lenient_int")]
        talk_s: Option<i64>,
        #[serde(default, deserialize_with = "lenient_int")]
        vote_s: Option<i64>,
        #[serde(default, deserialize_with = "lenient_int")]
        hunter_s: Option<i64>,
        #[serde(default, deserialize_with = "lenient_int")]
        wolves_count: Option<i64>,
        #[serde(default)]
        hunter_enabled: Option<bool>,
    },

    /// Host-only: deal roles and leave the lobby.
    Start,

    /// Host-only: abandon the current game and return everyone to the lobby.
    BackToLobby,

    /// A living wolf picks tonight's victim.
    WolfKill { target_id: PlayerId },

    /// A living player votes during the day.
    Vote { target_id: PlayerId },

    /// The dying hunter fires their last shot.
    HunterShot { target_id: PlayerId },

    /// Close the connection from the server side.
    Leave,
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// One row of the lobby roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPlayer {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
}

/// One row of the in-game roster. Roles are never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePlayer {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
}

/// Room settings as clients see them, durations in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub reveal_s: u64,
    pub night_s: u64,
    pub talk_s: u64,
    pub vote_s: u64,
    pub hunter_s: u64,
    pub wolves_count: u8,
    pub hunter_enabled: bool,
}

/// Payloads the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Sent once, right after the connection is accepted.
    Welcome {
        id: PlayerId,
        is_host: bool,
        phase: Phase,
    },

    /// Lobby view: roster, host, settings.
    Lobby {
        host_id: Option<PlayerId>,
        phase: Phase,
        players: Vec<LobbyPlayer>,
        settings: SettingsView,
        all_ready: bool,
        min_players: usize,
    },

    /// Public game view. `ends_in_ms` is `None` in untimed phases.
    State {
        phase: Phase,
        day: u32,
        players: Vec<StatePlayer>,
        hunter_shooter_id: Option<PlayerId>,
        ends_in_ms: Option<u64>,
    },

    /// A player's own role and the game seed. Only ever sent to that player.
    Private { id: PlayerId, role: Role, seed: u32 },

    /// A narration line. `emph` marks lines clients should highlight.
    Log { text: String, emph: bool },

    /// Final result of a game.
    #[serde(rename = "gameover")]
    GameOver { title: String, sub: String },
}

// ---------------------------------------------------------------------------
// Lenient numbers
// ---------------------------------------------------------------------------

/// An integer read from any JSON number. Fractions round to the nearest
/// whole number; values outside `i64` saturate.
struct LenientInt(i64);

struct LenientIntVisitor;

impl Visitor<'_> for LenientIntVisitor {
    type Value = LenientInt;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<LenientInt, E> {
        Ok(LenientInt(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<LenientInt, E> {
        Ok(LenientInt(i64::try_from(v).unwrap_or(i64::MAX)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<LenientInt, E> {
        // `as` saturates at the i64 bounds and maps NaN to 0.
        Ok(LenientInt(v.round() as i64))
    }
}

impl<'de> Deserialize<'de> for LenientInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LenientIntVisitor)
    }
}

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<LenientInt>::deserialize(deserializer)?.map(|n| n.0))
}

#[cfg(test)]
mod tests {
    //! The JSON shapes below are what browser clients parse; a change
    //! here is a protocol break.

    use super::*;
    use serde_json::json;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&PlayerId(42)).unwrap(), "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_phase_wire_names_match_display() {
        for phase in [
            Phase::Lobby,
            Phase::Reveal,
            Phase::Night,
            Phase::DayTalk,
            Phase::DayVote,
            Phase::HunterShot,
            Phase::GameOver,
        ] {
            let json = serde_json::to_value(phase).unwrap();
            assert_eq!(json, json!(phase.as_str()));
            assert_eq!(phase.to_string(), phase.as_str());
        }
    }

    #[test]
    fn test_phase_is_timed() {
        assert!(!Phase::Lobby.is_timed());
        assert!(!Phase::GameOver.is_timed());
        assert!(Phase::Reveal.is_timed());
        assert!(Phase::HunterShot.is_timed());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Hunter).unwrap(), json!("hunter"));
        assert_eq!(Role::default(), Role::Citizen);
    }

    #[test]
    fn test_client_set_settings_uses_camel_case_and_optional_fields() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "setSettings",
            "nightS": 30,
            "wolvesCount": 2,
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SetSettings {
                reveal_s: None,
                night_s: Some(30),
                talk_s: None,
                vote_s: None,
                hunter_s: None,
                wolves_count: Some(2),
                hunter_enabled: None,
            }
        );
    }

    #[test]
    fn test_client_set_settings_accepts_out_of_range_numbers() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"setSettings","nightS":-5,"wolvesCount":300,"talkS":30,"voteS":12.5,"hunterS":1e30}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SetSettings {
                reveal_s: None,
                night_s: Some(-5),
                talk_s: Some(30),
                vote_s: Some(13),
                hunter_s: Some(i64::MAX),
                wolves_count: Some(300),
                hunter_enabled: None,
            }
        );
    }

    #[test]
    fn test_client_set_settings_null_and_non_numbers() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "setSettings", "nightS": null})).unwrap();
        assert!(matches!(msg, ClientMessage::SetSettings { night_s: None, .. }));

        let bad: Result<ClientMessage, _> =
            serde_json::from_value(json!({"type": "setSettings", "nightS": "long"}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_client_unit_commands_decode_from_type_only() {
        let start: ClientMessage =
            serde_json::from_value(json!({"type": "start"})).unwrap();
        assert_eq!(start, ClientMessage::Start);
        let back: ClientMessage =
            serde_json::from_value(json!({"type": "backToLobby"})).unwrap();
        assert_eq!(back, ClientMessage::BackToLobby);
    }

    #[test]
    fn test_client_hunter_shot_target_field() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "hunterShot", "targetId": 9})).unwrap();
        assert_eq!(msg, ClientMessage::HunterShot { target_id: PlayerId(9) });
    }

    #[test]
    fn test_client_unknown_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"type": "chat", "text": "hello"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_welcome_json_shape() {
        let json = serde_json::to_value(ServerMessage::Welcome {
            id: PlayerId(1),
            is_host: true,
            phase: Phase::Lobby,
        })
        .unwrap();
        assert_eq!(json, json!({"type": "welcome", "id": 1, "isHost": true, "phase": "lobby"}));
    }

    #[test]
    fn test_state_json_shape() {
        let json = serde_json::to_value(ServerMessage::State {
            phase: Phase::HunterShot,
            day: 2,
            players: vec![StatePlayer { id: PlayerId(3), name: "Ada".into(), alive: false }],
            hunter_shooter_id: Some(PlayerId(3)),
            ends_in_ms: Some(15_000),
        })
        .unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["phase"], "hunter_shot");
        assert_eq!(json["hunterShooterId"], 3);
        assert_eq!(json["endsInMs"], 15_000);
        assert_eq!(json["players"][0]["alive"], false);
    }

    #[test]
    fn test_lobby_json_shape() {
        let json = serde_json::to_value(ServerMessage::Lobby {
            host_id: None,
            phase: Phase::Lobby,
            players: vec![],
            settings: SettingsView {
                reveal_s: 8,
                night_s: 20,
                talk_s: 22,
                vote_s: 20,
                hunter_s: 15,
                wolves_count: 1,
                hunter_enabled: true,
            },
            all_ready: false,
            min_players: 5,
        })
        .unwrap();
        assert!(json["hostId"].is_null());
        assert_eq!(json["settings"]["wolvesCount"], 1);
        assert_eq!(json["settings"]["revealS"], 8);
        assert_eq!(json["allReady"], false);
        assert_eq!(json["minPlayers"], 5);
    }

    #[test]
    fn test_gameover_and_private_tags() {
        let over = serde_json::to_value(ServerMessage::GameOver {
            title: "t".into(),
            sub: "s".into(),
        })
        .unwrap();
        assert_eq!(over["type"], "gameover");

        let private = serde_json::to_value(ServerMessage::Private {
            id: PlayerId(2),
            role: Role::Wolf,
            seed: 99,
        })
        .unwrap();
        assert_eq!(private, json!({"type": "private", "id": 2, "role": "wolf", "seed": 99}));
    }
}
