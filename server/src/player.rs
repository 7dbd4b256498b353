use crate::ai::AiState;
use crate::vec3::{self, Vec3};
use soccer_shared::config::{FieldConfig, TeamProfile};
use soccer_shared::protocol::Side;

/// Stable handle to a player: its index in the session roster.
/// GameState holds these instead of references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

impl PlayerId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Field,
    Goalkeeper,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerStats {
    /// Multiplier on base movement speed, 0.8..=1.2
    pub speed: f64,
    pub shot_power: f64,
    /// 0..=1, scales pass direction error
    pub pass_accuracy: f64,
}

impl PlayerStats {
    /// Derive stats from team ratings and roster slot.
    /// Forwards run on the attack rating, the back line on defence, the rest on midfield.
    pub fn from_team(team: &TeamProfile, slot: usize, role: Role, shoot_power_max: f64) -> Self {
        let speed_rating = if slot > 3 {
            team.attack
        } else if slot < 2 && role == Role::Field {
            team.defense
        } else {
            team.midfield
        };
        Self {
            speed: 0.8 + (speed_rating as f64 / 100.0) * 0.4,
            shot_power: (team.attack as f64 / 100.0) * shoot_power_max,
            pass_accuracy: team.midfield as f64 / 100.0,
        }
    }
}

/// Action animation timers, counted down by the animation controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimState {
    pub jump_timer: f64,
    pub dive_timer: f64,
    pub throw_timer: f64,
    /// +1 dives towards +x, -1 towards -x
    pub dive_dir: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointRotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl JointRotation {
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Renderable pose. Only the animation controller writes it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rig {
    /// Root height offset
    pub lift: f64,
    /// Root rotation about the forward axis
    pub roll: f64,
    /// Root rotation about the lateral axis
    pub pitch: f64,
    pub torso: JointRotation,
    pub arm_left: JointRotation,
    pub arm_right: JointRotation,
    pub leg_left: JointRotation,
    pub leg_right: JointRotation,
}

/// A player entity, built once at spawn.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub side: Side,
    pub role: Role,
    /// Formation slot position
    pub home_pos: Vec3,
    pub pos: Vec3,
    pub yaw: f64,
    pub stats: PlayerStats,
    /// Ground velocity in units/s from the last movement step
    pub velocity: Vec3,
    /// Frames until the next kick, switch or tackle is allowed
    pub cooldown: u32,
    pub ai_state: AiState,
    pub anim: AnimState,
    /// Per-player phase so crowds of runners don't move in lockstep
    pub anim_offset: f64,
    pub rig: Rig,
}

impl Player {
    pub fn new(
        id: PlayerId,
        name: String,
        side: Side,
        role: Role,
        home_pos: Vec3,
        stats: PlayerStats,
        anim_offset: f64,
    ) -> Self {
        Self {
            id,
            name,
            side,
            role,
            home_pos,
            pos: home_pos,
            yaw: if side == Side::Home { std::f64::consts::PI } else { 0.0 },
            stats,
            velocity: Vec3::ZERO,
            cooldown: 0,
            ai_state: if role == Role::Goalkeeper {
                AiState::GkIdle
            } else {
                AiState::Idle
            },
            anim: AnimState {
                dive_dir: 1.0,
                ..AnimState::default()
            },
            anim_offset,
            rig: Rig::default(),
        }
    }

    pub fn is_goalkeeper(&self) -> bool {
        self.role == Role::Goalkeeper
    }

    pub fn forward(&self) -> Vec3 {
        vec3::forward_from_yaw(self.yaw)
    }

    /// Face along a ground-plane direction. Zero directions keep the current yaw.
    pub fn face(&mut self, dir: Vec3) {
        let flat = vec3::flat(dir);
        if vec3::length(flat) > 1e-9 {
            self.yaw = vec3::yaw_towards(flat);
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.face(target - self.pos);
    }

    pub fn ground_speed(&self) -> f64 {
        vec3::length(vec3::flat(self.velocity))
    }

    pub fn ready(&self) -> bool {
        self.cooldown == 0
    }

    pub fn tick_cooldown(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }

    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.yaw.is_finite() && self.velocity.is_finite()
    }
}

/// z of the goal line a side defends. Home defends +z.
pub fn defended_goal_z(side: Side, field: &FieldConfig) -> f64 {
    match side {
        Side::Home => field.half_length(),
        Side::Away => -field.half_length(),
    }
}

/// Sign of z a side attacks towards.
pub fn attack_sign(side: Side) -> f64 {
    match side {
        Side::Home => -1.0,
        Side::Away => 1.0,
    }
}
