//! Ball integrator: gravity, friction, ground bounce, goalposts, and
//! classification of the ball's position against the pitch and goal mouths.

use crate::ball::Ball;
use crate::vec3::{self, Vec3};
use soccer_shared::config::{FieldConfig, PhysicsConfig};
use soccer_shared::protocol::{MatchPhase, Side};

/// Friction is tuned as "retained per frame" at this rate.
const FRICTION_REFERENCE_HZ: f64 = 60.0;
/// Visual roll rate per unit of ground speed
const SPIN_RATE: f64 = 2.0;
/// How far inside the net the ball is held off the mesh
const NET_INSET: f64 = 0.2;
/// Velocity factor when the ball hits the net
const NET_RESTITUTION: f64 = -0.5;
/// Goal kicks are taken from the edge of the goal area.
const GOAL_AREA_DEPTH: f64 = 5.5;

/// Ball left play or went in. At most one per step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryEvent {
    Goal { scorer: Side },
    ThrowIn { at: Vec3 },
    Corner { awarded_to: Side, at: Vec3 },
    GoalKick { awarded_to: Side, at: Vec3 },
}

impl BoundaryEvent {
    /// Restart phase this event leads to. Goals restart through a celebration.
    pub fn restart_phase(&self) -> Option<MatchPhase> {
        match self {
            BoundaryEvent::Goal { .. } => None,
            BoundaryEvent::ThrowIn { .. } => Some(MatchPhase::ThrowIn),
            BoundaryEvent::Corner { .. } => Some(MatchPhase::Corner),
            BoundaryEvent::GoalKick { .. } => Some(MatchPhase::GoalKick),
        }
    }

    /// Where the ball is placed for the restart.
    /// Throw-ins are taken on the touchline level with the exit point,
    /// never behind an end line.
    pub fn restart_spot(&self, field: &FieldConfig) -> Option<Vec3> {
        match *self {
            BoundaryEvent::Goal { .. } => None,
            BoundaryEvent::ThrowIn { at } => {
                let hw = field.half_width();
                let hl = field.half_length();
                Some(Vec3::new(at.x.clamp(-hw, hw), 0.0, at.z.clamp(-hl, hl)))
            }
            BoundaryEvent::Corner { at, .. } | BoundaryEvent::GoalKick { at, .. } => Some(at),
        }
    }
}

/// What classification needs to know about the match.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryContext {
    /// Side of the last player to touch the ball
    pub last_toucher: Option<Side>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    pub event: Option<BoundaryEvent>,
    pub post_hit: bool,
    pub bounced: bool,
}

pub struct PhysicsIntegrator {
    field: FieldConfig,
    physics: PhysicsConfig,
    /// (x, z) of the four posts
    posts: [(f64, f64); 4],
}

impl PhysicsIntegrator {
    pub fn new(field: FieldConfig, physics: PhysicsConfig) -> Self {
        let gx = field.goal_width / 2.0;
        let gz = field.half_length();
        Self {
            field,
            physics,
            posts: [(-gx, -gz), (gx, -gz), (-gx, gz), (gx, gz)],
        }
    }

    pub fn posts(&self) -> &[(f64, f64); 4] {
        &self.posts
    }

    /// Advance the ball by `dt`. Pass a context to classify boundaries;
    /// `None` suppresses events (dead ball, celebration) but motion still runs.
    pub fn step(&self, ball: &mut Ball, dt: f64, classify: Option<&BoundaryContext>) -> StepReport {
        let dt = dt.max(0.0);
        let mut report = StepReport::default();
        let radius = self.field.ball_radius;

        ball.pos += ball.vel * dt;
        ball.vel *= self.physics.friction.powf(dt * FRICTION_REFERENCE_HZ);

        if ball.pos.y > radius {
            ball.vel.y -= self.physics.gravity * dt;
            ball.on_ground = false;
        } else {
            ball.pos.y = radius;
            if ball.vel.y < -self.physics.bounce_threshold {
                ball.vel.y *= -self.physics.bounce;
                report.bounced = true;
            } else if ball.vel.y <= 0.0 {
                ball.vel.y = 0.0;
                ball.on_ground = true;
            }
        }

        if ball.on_ground {
            ball.spin[0] += ball.vel.z * dt * SPIN_RATE;
            ball.spin[1] -= ball.vel.x * dt * SPIN_RATE;
        }

        report.post_hit = self.resolve_posts(ball);
        report.event = self.classify(ball, classify);
        report
    }

    /// Reflect off any post the ball overlaps and push it clear.
    fn resolve_posts(&self, ball: &mut Ball) -> bool {
        if ball.pos.y > self.field.goal_height {
            return false;
        }
        let reach = self.field.post_radius + self.field.ball_radius;
        let mut hit = false;

        for &(px, pz) in &self.posts {
            let dx = ball.pos.x - px;
            let dz = ball.pos.z - pz;
            let dist = (dx * dx + dz * dz).sqrt();
            if dist >= reach {
                continue;
            }
            let normal = if dist > 1e-9 {
                Vec3::new(dx / dist, 0.0, dz / dist)
            } else {
                Vec3::new(px.signum(), 0.0, 0.0)
            };

            // Only an approaching ball is reflected; one already leaving is just pushed out
            if vec3::dot(ball.vel, normal) < 0.0 {
                ball.vel = reflect_horizontal(ball.vel, normal);
            }
            let overlap = reach - dist;
            ball.pos.x += normal.x * overlap;
            ball.pos.z += normal.z * overlap;
            hit = true;
        }
        hit
    }

    fn classify(&self, ball: &mut Ball, ctx: Option<&BoundaryContext>) -> Option<BoundaryEvent> {
        let hw = self.field.half_width();
        let hl = self.field.half_length();
        let half_goal = self.field.goal_width / 2.0;

        let beyond_end = ball.pos.z.abs() > hl;
        let in_mouth = ball.pos.x.abs() < half_goal && ball.pos.y < self.field.goal_height;

        if beyond_end && in_mouth {
            self.hold_in_net(ball);
            return ctx.map(|_| BoundaryEvent::Goal {
                scorer: if ball.pos.z > 0.0 { Side::Away } else { Side::Home },
            });
        }

        let ctx = ctx?;
        if ball.pos.x.abs() > hw {
            return Some(BoundaryEvent::ThrowIn { at: ball.pos });
        }
        if beyond_end {
            let end = ball.pos.z.signum();
            let defending = if end > 0.0 { Side::Home } else { Side::Away };
            if ctx.last_toucher == Some(defending) {
                return Some(BoundaryEvent::Corner {
                    awarded_to: defending.opponent(),
                    at: Vec3::new(ball.pos.x.signum() * hw, 0.0, end * hl),
                });
            }
            return Some(BoundaryEvent::GoalKick {
                awarded_to: defending,
                at: Vec3::new(0.0, 0.0, end * (hl - GOAL_AREA_DEPTH)),
            });
        }
        None
    }

    /// Keep the ball inside the back and side netting.
    fn hold_in_net(&self, ball: &mut Ball) {
        let back = self.field.half_length() + self.field.goal_depth;
        if ball.pos.z.abs() > back {
            ball.pos.z = ball.pos.z.signum() * (back - NET_INSET);
            ball.vel.z *= NET_RESTITUTION;
        }
        let side = self.field.goal_width / 2.0 - NET_INSET;
        if ball.pos.x.abs() > side {
            ball.pos.x = ball.pos.x.signum() * side;
            ball.vel.x *= NET_RESTITUTION;
        }
    }
}

/// Elastic reflection of the horizontal velocity about a ground-plane normal.
/// Vertical speed is untouched.
pub fn reflect_horizontal(vel: Vec3, normal: Vec3) -> Vec3 {
    let d = vel.x * normal.x + vel.z * normal.z;
    Vec3::new(vel.x - 2.0 * d * normal.x, vel.y, vel.z - 2.0 * d * normal.z)
}
