//! Protocol module - JSON message types for battle rooms
//!
//! Transport is line-delimited JSON: one object per line, each with a `type`
//! discriminator and camelCase field names. Client events drive the room state
//! machine; server events report it back.

use serde::{Deserialize, Serialize};

pub use tetris_battle_core::snapshot::BoardSnapshot;

// ============== Client -> Server Messages ==============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room_id: String,
        player_name: String,
        user_id: String,
    },
    LeaveRoom {
        room_id: String,
        user_id: String,
    },
    StartGame {
        room_id: String,
        user_id: String,
    },
    RestartGame {
        room_id: String,
    },
    UpdateGameState {
        room_id: String,
        game_state: BoardSnapshot,
    },
    GameOver {
        room_id: String,
        score: u32,
    },
    LineCleared {
        room_id: String,
        lines_cleared: u32,
    },
    TetrisPageLoaded {
        room_id: String,
    },
}

impl ClientEvent {
    pub fn room_id(&self) -> &str {
        match self {
            ClientEvent::JoinRoom { room_id, .. }
            | ClientEvent::LeaveRoom { room_id, .. }
            | ClientEvent::StartGame { room_id, .. }
            | ClientEvent::RestartGame { room_id }
            | ClientEvent::UpdateGameState { room_id, .. }
            | ClientEvent::GameOver { room_id, .. }
            | ClientEvent::LineCleared { room_id, .. }
            | ClientEvent::TetrisPageLoaded { room_id } => room_id,
        }
    }

    /// Wire name of the event, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom { .. } => "joinRoom",
            ClientEvent::LeaveRoom { .. } => "leaveRoom",
            ClientEvent::StartGame { .. } => "startGame",
            ClientEvent::RestartGame { .. } => "restartGame",
            ClientEvent::UpdateGameState { .. } => "updateGameState",
            ClientEvent::GameOver { .. } => "gameOver",
            ClientEvent::LineCleared { .. } => "lineCleared",
            ClientEvent::TetrisPageLoaded { .. } => "tetrisPageLoaded",
        }
    }
}

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomPhase {
    Waiting,
    Starting,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub user_id: String,
    pub display_name: String,
    pub is_game_over: bool,
    #[serde(default)]
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerBoard {
    pub player_id: String,
    pub game_state: BoardSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectCode {
    NotJoined,
    RoomNotFound,
    NotAuthorized,
    AlreadyStarted,
    NotEnoughPlayers,
    NotFinished,
    InvalidMessage,
}

impl RejectCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectCode::NotJoined => "notJoined",
            RejectCode::RoomNotFound => "roomNotFound",
            RejectCode::NotAuthorized => "notAuthorized",
            RejectCode::AlreadyStarted => "alreadyStarted",
            RejectCode::NotEnoughPlayers => "notEnoughPlayers",
            RejectCode::NotFinished => "notFinished",
            RejectCode::InvalidMessage => "invalidMessage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    RoomState {
        room_id: String,
        players: Vec<PlayerInfo>,
        game_states: Vec<PlayerBoard>,
        creator: Option<String>,
        phase: RoomPhase,
    },
    PlayerJoined {
        player: PlayerInfo,
        player_count: usize,
    },
    PlayerDisconnect {
        user_id: String,
    },
    CreatorChanged {
        new_creator_id: String,
    },
    MoveToTetrisPage {
        room_id: String,
    },
    GameStart {
        room_id: String,
    },
    GameStateUpdate {
        player_id: String,
        player_name: String,
        game_state: BoardSnapshot,
    },
    PlayerGameOver {
        player_id: String,
        score: u32,
    },
    GameWin {
        winner: Option<String>,
        players: Vec<PlayerInfo>,
    },
    TargetAssigned {
        target_id: String,
        target_name: String,
    },
    ReceiveGarbage {
        lines: u32,
    },
    PlayerRestarted {
        player_id: String,
        restarted_count: usize,
        total_players: usize,
    },
    GameRestart {
        room_id: String,
    },
    Rejected {
        code: RejectCode,
        message: String,
    },
}

impl ServerEvent {
    pub fn rejected(code: RejectCode, message: impl Into<String>) -> Self {
        ServerEvent::Rejected {
            code,
            message: message.into(),
        }
    }
}

// ============== Line Codec ==============

/// Parsed incoming line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    Event(ClientEvent),
    /// Well-formed JSON object with a `type` this protocol does not know
    Unknown { msg_type: String },
}

/// Parse one line sent by a client
///
/// An unrecognised `type` is not a hard parse error; malformed JSON or a known
/// type with bad fields is.
pub fn parse_client_line(line: &str) -> Result<ParsedMessage, serde_json::Error> {
    match serde_json::from_str::<ClientEvent>(line) {
        Ok(event) => Ok(ParsedMessage::Event(event)),
        Err(e) => {
            #[derive(Debug, Deserialize)]
            struct TypeOnly {
                #[serde(rename = "type")]
                msg_type: Option<String>,
            }
            let msg_type = serde_json::from_str::<TypeOnly>(line)?
                .msg_type
                .unwrap_or_default();
            if is_client_type(&msg_type) {
                return Err(e);
            }
            Ok(ParsedMessage::Unknown { msg_type })
        }
    }
}

fn is_client_type(msg_type: &str) -> bool {
    matches!(
        msg_type,
        "joinRoom"
            | "leaveRoom"
            | "startGame"
            | "restartGame"
            | "updateGameState"
            | "gameOver"
            | "lineCleared"
            | "tetrisPageLoaded"
    )
}

/// Parse one line sent by the server
pub fn parse_server_line(line: &str) -> Result<ServerEvent, serde_json::Error> {
    serde_json::from_str(line)
}

/// Serialize a message followed by the line terminator
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join_room() {
        let json = r#"{"type":"joinRoom","roomId":"r1","playerName":"Ada","userId":"u1"}"#;
        let parsed = parse_client_line(json).unwrap();
        assert_eq!(
            parsed,
            ParsedMessage::Event(ClientEvent::JoinRoom {
                room_id: "r1".into(),
                player_name: "Ada".into(),
                user_id: "u1".into(),
            })
        );
    }

    #[test]
    fn test_parse_line_cleared() {
        let json = r#"{"type":"lineCleared","roomId":"r1","linesCleared":4}"#;
        match parse_client_line(json).unwrap() {
            ParsedMessage::Event(ClientEvent::LineCleared { lines_cleared, .. }) => {
                assert_eq!(lines_cleared, 4)
            }
            other => panic!("Expected lineCleared, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let parsed = parse_client_line(r#"{"type":"chat","text":"hi"}"#).unwrap();
        assert_eq!(
            parsed,
            ParsedMessage::Unknown {
                msg_type: "chat".into()
            }
        );
    }

    #[test]
    fn test_known_type_with_bad_fields_is_an_error() {
        assert!(parse_client_line(r#"{"type":"gameOver","roomId":"r1"}"#).is_err());
        assert!(parse_client_line("not json").is_err());
    }

    #[test]
    fn test_server_event_wire_shape() {
        let event = ServerEvent::PlayerRestarted {
            player_id: "u1".into(),
            restarted_count: 1,
            total_players: 3,
        };
        let line = encode_line(&event).unwrap();
        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["type"], "playerRestarted");
        assert_eq!(value["restartedCount"], 1);
        assert_eq!(value["totalPlayers"], 3);
    }

    #[test]
    fn test_rejected_code_spelling() {
        let event = ServerEvent::rejected(RejectCode::NotEnoughPlayers, "need 2 players");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "rejected");
        assert_eq!(value["code"], RejectCode::NotEnoughPlayers.as_str());
    }

    #[test]
    fn test_room_state_phase_spelling() {
        let event = ServerEvent::RoomState {
            room_id: "r".into(),
            players: vec![],
            game_states: vec![],
            creator: None,
            phase: RoomPhase::InProgress,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["phase"], "inProgress");
        assert!(value["creator"].is_null());
        assert_eq!(parse_server_line(&value.to_string()).unwrap(), event);
    }
}
