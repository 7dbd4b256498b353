use crate::vec3::{self, Vec3};

/// The match ball. Exactly one per session.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ball {
    pub pos: Vec3,
    pub vel: Vec3,
    pub on_ground: bool,
    /// Rolling rotation about x and z. Visual only.
    pub spin: [f64; 2],
}

impl Ball {
    /// A ball resting on the centre spot.
    pub fn new(radius: f64) -> Self {
        Self {
            pos: Vec3::new(0.0, radius, 0.0),
            vel: Vec3::ZERO,
            on_ground: true,
            spin: [0.0, 0.0],
        }
    }

    /// Dead-ball placement: on the ground at `spot`, at rest.
    pub fn place(&mut self, spot: Vec3, radius: f64) {
        self.pos = Vec3::new(spot.x, radius, spot.z);
        self.vel = Vec3::ZERO;
        self.on_ground = true;
    }

    pub fn speed(&self) -> f64 {
        vec3::length(self.vel)
    }

    /// Strike the ball along the ground-plane `direction`.
    /// Horizontal speed equals `power`; vertical speed is `lift * power / 2`.
    pub fn kick(&mut self, direction: Vec3, power: f64, lift: f64) {
        let dir = vec3::normalize(vec3::flat(direction));
        self.vel = dir * power;
        self.vel.y = lift * power * 0.5;
        self.on_ground = false;
    }

    /// Add a force and cap the resulting speed (dribble touches, tackles).
    pub fn nudge(&mut self, impulse: Vec3, max_speed: Option<f64>) {
        self.vel += impulse;
        if let Some(max) = max_speed {
            self.vel = vec3::clamp_length(self.vel, max);
        }
    }
}
