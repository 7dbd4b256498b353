//! Chase camera. Reads entity positions, never writes match state.

use crate::player::Player;
use crate::vec3::{self, Vec3};
use soccer_shared::config::CameraMode;

const SPRING_STRENGTH: f64 = 4.0;
const SPRING_DAMPING: f64 = 3.0;
/// Camera x follows the target at this fraction so the touchlines stay framed
const LATERAL_FOLLOW: f64 = 0.7;
/// Ball speed above which the camera leads the play
const LEAD_SPEED: f64 = 5.0;
const LEAD_FACTOR: f64 = 0.5;
const LOOK_FOLLOW: f64 = 0.5;

const HEAD_OFFSET: Vec3 = Vec3::new(0.0, 1.8, 0.4);
const FIRST_PERSON_LERP_RATE: f64 = 15.0;
const FIRST_PERSON_LOOK_AHEAD: f64 = 10.0;

const SHAKE_DECAY: f64 = 5.0;
const SHAKE_AMPLITUDE: f64 = 0.4;
const SHAKE_FREQUENCY: f64 = 40.0;

/// Spring rest offset from the target for each chase mode.
pub fn mode_offset(mode: CameraMode) -> Vec3 {
    match mode {
        CameraMode::TopDown => Vec3::new(0.0, 90.0, 10.0),
        CameraMode::Dynamic => Vec3::new(0.0, 30.0, 40.0),
        CameraMode::Broadcast | CameraMode::FirstPerson => Vec3::new(0.0, 50.0, 70.0),
    }
}

#[derive(Debug, Clone)]
pub struct CameraRig {
    mode: CameraMode,
    pos: Vec3,
    vel: Vec3,
    look_at: Vec3,
}

impl CameraRig {
    pub fn new(mode: CameraMode) -> Self {
        Self {
            mode,
            pos: mode_offset(mode),
            vel: Vec3::ZERO,
            look_at: Vec3::ZERO,
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CameraMode) {
        self.mode = mode;
        self.vel = Vec3::ZERO;
    }

    pub fn position(&self) -> Vec3 {
        self.pos
    }

    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }

    /// Heading of the view on the ground plane. 0 looks down -z.
    /// Movement input is rotated by this so "up" runs away from the viewer.
    pub fn yaw(&self) -> f64 {
        let d = vec3::flat(self.look_at - self.pos);
        if vec3::length(d) < 1e-9 {
            return 0.0;
        }
        (-d.x).atan2(-d.z)
    }

    /// Follow `focus` (ball or controlled player). In first person the view
    /// rides the player's head instead.
    pub fn update(&mut self, focus: Vec3, ball_vel: Vec3, first_person: Option<&Player>, dt: f64) {
        if self.mode == CameraMode::FirstPerson {
            if let Some(player) = first_person {
                self.follow_head(player, dt);
                return;
            }
        }
        self.follow_spring(focus, ball_vel, dt);
    }

    fn follow_head(&mut self, player: &Player, dt: f64) {
        let head = player.pos + vec3::rotate_y(HEAD_OFFSET, player.yaw);
        let t = (FIRST_PERSON_LERP_RATE * dt).min(1.0);
        self.pos = vec3::lerp(self.pos, head, t);
        self.vel = Vec3::ZERO;
        self.look_at = head + player.forward() * FIRST_PERSON_LOOK_AHEAD;
    }

    fn follow_spring(&mut self, focus: Vec3, ball_vel: Vec3, dt: f64) {
        let offset = mode_offset(self.mode);
        let mut desired = Vec3::new(focus.x * LATERAL_FOLLOW, offset.y, focus.z + offset.z);
        if vec3::length(ball_vel) > LEAD_SPEED {
            desired.x += ball_vel.x * LEAD_FACTOR;
            desired.z += ball_vel.z * LEAD_FACTOR;
        }

        let accel = (self.pos - desired) * -SPRING_STRENGTH - self.vel * SPRING_DAMPING;
        self.vel += accel * dt;
        self.pos += self.vel * dt;
        self.look_at = Vec3::new(focus.x * LOOK_FOLLOW, 0.0, focus.z * LOOK_FOLLOW);
    }

    /// Position with shake jitter applied. `time` is the session clock.
    pub fn shaken_position(&self, shake: f64, time: f64) -> Vec3 {
        if shake <= 0.0 {
            return self.pos;
        }
        let a = shake * SHAKE_AMPLITUDE;
        self.pos
            + Vec3::new(
                (time * SHAKE_FREQUENCY).sin() * a,
                (time * SHAKE_FREQUENCY * 1.3).cos() * a,
                0.0,
            )
    }
}

/// Shake fades linearly to zero.
pub fn decay_shake(shake: f64, dt: f64) -> f64 {
    (shake - dt * SHAKE_DECAY).max(0.0)
}
