use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::{CameraMode, MatchConfig, MatchSettings};

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Match vocabulary ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Home => "HOME",
            Side::Away => "AWAY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub enum MatchPhase {
    Menu,
    Entrance,
    Kickoff,
    Playing,
    Corner,
    FreeKick,
    GoalKick,
    ThrowIn,
    Penalty,
}

impl MatchPhase {
    /// Dead-ball restarts.
    pub fn is_set_piece(self) -> bool {
        matches!(
            self,
            MatchPhase::Corner
                | MatchPhase::FreeKick
                | MatchPhase::GoalKick
                | MatchPhase::ThrowIn
                | MatchPhase::Penalty
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchPhase::Menu => "MENU",
            MatchPhase::Entrance => "ENTRANCE",
            MatchPhase::Kickoff => "KICK OFF",
            MatchPhase::Playing => "PLAYING",
            MatchPhase::Corner => "CORNER",
            MatchPhase::FreeKick => "FREE KICK",
            MatchPhase::GoalKick => "GOAL KICK",
            MatchPhase::ThrowIn => "THROW IN",
            MatchPhase::Penalty => "PENALTY",
        }
    }
}

/// Level-triggered intents sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct InputState {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub sprint: bool,
    #[serde(default)]
    pub shoot: bool,
    #[serde(default)]
    pub pass: bool,
    #[serde(default)]
    pub through: bool,
    #[serde(default)]
    pub switch: bool,
}

/// Set pieces a training session can stage on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub enum TrainingSetPiece {
    FreeKick,
    Corner,
    Penalty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "lowercase")]
pub enum ScenarioSpot {
    Left,
    Right,
    Center,
    Close,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "lowercase")]
pub enum SoundCue {
    Kick,
    Whistle,
}

/// Notifications for the UI and audio collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    ScoreChanged {
        home: u32,
        away: u32,
    },
    Message {
        text: String,
        #[serde(rename = "durationMs")]
        duration_ms: Option<u32>,
    },
    /// Entry (`Some`) or exit (`None`) of a set-piece phase
    SetPiece { phase: Option<MatchPhase> },
    SetPieceMenu { visible: bool },
    Sound { cue: SoundCue },
    FullTime { home: u32, away: u32 },
}

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "frame")]
    Frame(FrameMsg),
    #[serde(rename = "event")]
    Event(EventMsg),
    #[serde(rename = "error")]
    Error(ErrorMsg),
    #[serde(rename = "halted")]
    Halted(HaltedMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub config: MatchConfig,
}

/// Per-tick HUD contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct HudFrame {
    pub phase: MatchPhase,
    pub home_score: u32,
    pub away_score: u32,
    pub time_remaining: f64,
    pub possession: Option<Side>,
    pub owner_id: Option<u32>,
    pub active_id: Option<u32>,
    pub stamina: f64,
    pub charge: f64,
    pub charging: bool,
    pub paused: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct BallWire {
    pub pos: [f64; 3],
    pub vel: [f64; 3],
    pub spin: [f64; 2],
    pub on_ground: bool,
}

/// Rig pose of one player. Joint rotations are Euler (x, y, z) radians.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PlayerWire {
    pub id: u32,
    pub name: String,
    pub side: Side,
    pub goalkeeper: bool,
    pub pos: [f64; 3],
    pub yaw: f64,
    /// Root transform offsets applied on top of `pos`/`yaw`
    pub lift: f64,
    pub roll: f64,
    pub torso: [f64; 3],
    pub arm_left: [f64; 3],
    pub arm_right: [f64; 3],
    pub leg_left: [f64; 3],
    pub leg_right: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct CameraWire {
    pub mode: CameraMode,
    pub pos: [f64; 3],
    pub look_at: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct FrameMsg {
    pub hud: HudFrame,
    pub ball: BallWire,
    pub players: Vec<PlayerWire>,
    pub camera: CameraWire,
    pub aim: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct EventMsg {
    pub event: UiEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct ErrorMsg {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct HaltedMsg {
    pub reason: String,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "start")]
    Start { settings: MatchSettings },
    #[serde(rename = "input")]
    Input(InputState),
    #[serde(rename = "training_scenario")]
    TrainingScenario {
        kind: TrainingSetPiece,
        spot: ScenarioSpot,
    },
    #[serde(rename = "toggle_pause")]
    TogglePause,
    #[serde(rename = "quit")]
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_piece_phases() {
        assert!(MatchPhase::ThrowIn.is_set_piece());
        assert!(MatchPhase::GoalKick.is_set_piece());
        assert!(!MatchPhase::Kickoff.is_set_piece());
        assert!(!MatchPhase::Playing.is_set_piece());
    }

    #[test]
    fn opponent_is_involution() {
        assert_eq!(Side::Home.opponent(), Side::Away);
        assert_eq!(Side::Home.opponent().opponent(), Side::Home);
    }

    #[test]
    fn input_message_is_flat() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"input","up":true,"sprint":true}"#).unwrap();
        match msg {
            ClientMsg::Input(input) => {
                assert!(input.up && input.sprint);
                assert!(!input.shoot);
            }
            other => panic!("Expected Input, got {:?}", other),
        }
    }

    #[test]
    fn event_message_nests_tagged_event() {
        let msg = ServerMsg::Event(EventMsg {
            event: UiEvent::ScoreChanged { home: 1, away: 0 },
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["event"]["type"], "score_changed");
        assert_eq!(json["event"]["home"], 1);
    }

    #[test]
    fn phase_serializes_camel_case() {
        let json = serde_json::to_string(&MatchPhase::GoalKick).unwrap();
        assert_eq!(json, "\"goalKick\"");
    }
}
