//! Conversions from simulation state to the wire types shared with the
//! browser renderer.

pub use soccer_shared::protocol::*;

use crate::ball::Ball;
use crate::camera::CameraRig;
use crate::player::Player;
use crate::vec3::Vec3;

/// Round to 4 decimal places (plenty for a renderer, roughly halves JSON size)
#[inline]
fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}

#[inline]
fn round_vec(v: Vec3) -> [f64; 3] {
    [round4(v.x), round4(v.y), round4(v.z)]
}

#[inline]
fn round_arr(v: [f64; 3]) -> [f64; 3] {
    [round4(v[0]), round4(v[1]), round4(v[2])]
}

pub fn ball_wire(ball: &Ball) -> BallWire {
    BallWire {
        pos: round_vec(ball.pos),
        vel: round_vec(ball.vel),
        spin: [round4(ball.spin[0]), round4(ball.spin[1])],
        on_ground: ball.on_ground,
    }
}

pub fn player_wire(player: &Player) -> PlayerWire {
    let rig = &player.rig;
    PlayerWire {
        id: player.id.0,
        name: player.name.clone(),
        side: player.side,
        goalkeeper: player.is_goalkeeper(),
        pos: round_vec(player.pos),
        yaw: round4(player.yaw),
        lift: round4(rig.lift),
        roll: round4(rig.roll),
        torso: round_arr(rig.torso.to_array()),
        arm_left: round_arr(rig.arm_left.to_array()),
        arm_right: round_arr(rig.arm_right.to_array()),
        leg_left: round_arr(rig.leg_left.to_array()),
        leg_right: round_arr(rig.leg_right.to_array()),
    }
}

pub fn camera_wire(camera: &CameraRig, shake: f64, time: f64) -> CameraWire {
    CameraWire {
        mode: camera.mode(),
        pos: round_vec(camera.shaken_position(shake, time)),
        look_at: round_vec(camera.look_at()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{PlayerId, PlayerStats, Role};
    use crate::vec3::vec3;
    use soccer_shared::config::{CameraMode, MatchConfig};

    #[test]
    fn server_msg_welcome_roundtrip() {
        let msg = ServerMsg::Welcome(WelcomeMsg {
            protocol_version: PROTOCOL_VERSION,
            server_version: "0.1.0".to_string(),
            config: MatchConfig::default(),
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"welcome\""));
        assert!(json.contains("\"protocolVersion\":1"));
        let parsed: ServerMsg = serde_json::from_str(&json).unwrap();
        match parsed {
            ServerMsg::Welcome(w) => {
                assert_eq!(w.protocol_version, PROTOCOL_VERSION);
                assert_eq!(w.config.formation.len(), 5);
            }
            _ => panic!("Expected Welcome"),
        }
    }

    #[test]
    fn event_msg_is_tagged_twice() {
        let msg = ServerMsg::Event(EventMsg {
            event: UiEvent::Message {
                text: "SAVE!".to_string(),
                duration_ms: None,
            },
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"event\""));
        assert!(json.contains("\"type\":\"message\""));
        assert!(json.contains("\"durationMs\":null"));
    }

    #[test]
    fn client_input_with_missing_keys_defaults_to_released() {
        let parsed: ClientMsg = serde_json::from_str(r#"{"type":"input","up":true,"sprint":true}"#).unwrap();
        match parsed {
            ClientMsg::Input(input) => {
                assert!(input.up && input.sprint);
                assert!(!input.shoot && !input.switch);
            }
            _ => panic!("Expected Input"),
        }
    }

    #[test]
    fn client_training_scenario_parses() {
        let parsed: ClientMsg =
            serde_json::from_str(r#"{"type":"training_scenario","kind":"freeKick","spot":"left"}"#).unwrap();
        match parsed {
            ClientMsg::TrainingScenario { kind, spot } => {
                assert_eq!(kind, TrainingSetPiece::FreeKick);
                assert_eq!(spot, ScenarioSpot::Left);
            }
            _ => panic!("Expected TrainingScenario"),
        }
    }

    #[test]
    fn ball_wire_rounds_to_four_places() {
        let mut ball = Ball::new(0.35);
        ball.pos = vec3(1.234567, 0.35, -2.000049);
        let wire = ball_wire(&ball);
        assert_eq!(wire.pos, [1.2346, 0.35, -2.0]);
        assert!(wire.on_ground);
    }

    #[test]
    fn player_wire_carries_rig() {
        let mut p = Player::new(
            PlayerId(3),
            "Alisson".to_string(),
            Side::Away,
            Role::Goalkeeper,
            vec3(0.0, 0.0, -44.0),
            PlayerStats {
                speed: 1.0,
                shot_power: 30.0,
                pass_accuracy: 0.8,
            },
            0.0,
        );
        p.rig.roll = 1.2;
        p.rig.arm_left.z = 2.8;
        let wire = player_wire(&p);
        assert_eq!(wire.id, 3);
        assert!(wire.goalkeeper);
        assert_eq!(wire.roll, 1.2);
        assert_eq!(wire.arm_left, [0.0, 0.0, 2.8]);
    }

    #[test]
    fn camera_wire_reports_mode() {
        let camera = CameraRig::new(CameraMode::TopDown);
        let wire = camera_wire(&camera, 0.0, 0.0);
        assert_eq!(wire.mode, CameraMode::TopDown);
        assert_eq!(wire.pos, [0.0, 90.0, 10.0]);
    }
}
