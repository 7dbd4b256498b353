//! Procedural rig poses driven by player velocity and action timers.

use crate::player::{AnimState, Player, Rig};
use soccer_shared::config::AnimationConfig;
use std::f64::consts::PI;

/// Ground speed above which the run cycle switches to the sprint cycle.
pub const SPRINT_SPEED_THRESHOLD: f64 = 9.5;
const MOVING_THRESHOLD: f64 = 0.1;

const RUN_CYCLE_RATE: f64 = 10.0;
const SPRINT_CYCLE_RATE: f64 = 15.0;
const IDLE_CYCLE_RATE: f64 = 3.0;

const DIVE_LIFT: f64 = 0.5;

/// Which pose drove the rig this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pose {
    Jump,
    Dive,
    Throw,
    Run,
    Sprint,
    Idle,
}

pub fn trigger_jump(anim: &mut AnimState, config: &AnimationConfig) {
    // A jump in progress is not restarted
    if anim.jump_timer <= 0.0 {
        anim.jump_timer = config.jump_duration;
    }
}

/// `direction` is +1 towards +x, -1 towards -x.
pub fn trigger_dive(anim: &mut AnimState, direction: f64, config: &AnimationConfig) {
    anim.dive_timer = config.dive_duration;
    anim.dive_dir = if direction < 0.0 { -1.0 } else { 1.0 };
}

pub fn trigger_throw(anim: &mut AnimState, config: &AnimationConfig) {
    anim.throw_timer = config.throw_duration;
}

pub struct AnimationController {
    config: AnimationConfig,
}

impl AnimationController {
    pub fn new(config: AnimationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// Count down the active action timer and write the player's rig.
    /// `time` is the session clock, so poses are reproducible.
    pub fn update(&self, player: &mut Player, dt: f64, time: f64) -> Pose {
        let speed = player.ground_speed();
        let goalkeeper = player.is_goalkeeper();
        let offset = player.anim_offset;
        let anim = &mut player.anim;
        let rig = &mut player.rig;

        if anim.jump_timer > 0.0 {
            anim.jump_timer = (anim.jump_timer - dt).max(0.0);
            let progress = progress(anim.jump_timer, self.config.jump_duration);
            rig.lift = (progress * PI).sin() * self.config.jump_height;
            rig.arm_left.x = -2.5;
            rig.arm_right.x = -2.5;
            rig.leg_left.x = -0.5;
            rig.leg_right.x = -1.0;
            return Pose::Jump;
        }

        if anim.dive_timer > 0.0 {
            anim.dive_timer = (anim.dive_timer - dt).max(0.0);
            let progress = progress(anim.dive_timer, self.config.dive_duration);
            rig.roll = anim.dive_dir * (PI / 2.2);
            rig.lift = (progress * PI).sin() * DIVE_LIFT;
            rig.arm_left.z = 2.8;
            rig.arm_right.z = -2.8;
            return Pose::Dive;
        }

        if anim.throw_timer > 0.0 {
            anim.throw_timer = (anim.throw_timer - dt).max(0.0);
            let progress = progress(anim.throw_timer, self.config.throw_duration);
            if progress < 0.5 {
                // Ball behind the head
                rig.arm_left.x = -PI - 0.5;
                rig.arm_right.x = -PI - 0.5;
                rig.torso.x = -0.5;
            } else {
                rig.arm_left.x = -1.0;
                rig.arm_right.x = -1.0;
                rig.torso.x = 0.5;
            }
            return Pose::Throw;
        }

        locomotion(rig, speed, goalkeeper, time, offset)
    }
}

fn progress(timer: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        return 1.0;
    }
    (1.0 - timer / duration).clamp(0.0, 1.0)
}

fn locomotion(rig: &mut Rig, speed: f64, goalkeeper: bool, time: f64, offset: f64) -> Pose {
    rig.lift = 0.0;
    rig.roll = 0.0;
    rig.pitch = 0.0;

    if speed > MOVING_THRESHOLD {
        let sprint = speed > SPRINT_SPEED_THRESHOLD;
        let rate = if sprint { SPRINT_CYCLE_RATE } else { RUN_CYCLE_RATE };
        let s = (time * rate + offset).sin();

        rig.leg_left.x = s;
        rig.leg_right.x = -s;
        rig.arm_left.x = -s * 0.8;
        rig.arm_right.x = s * 0.8;
        rig.torso.x = if sprint { 0.3 } else { 0.1 };
        rig.arm_left.z = 0.0;
        rig.arm_right.z = 0.0;
        return if sprint { Pose::Sprint } else { Pose::Run };
    }

    // Breathing sway
    let s = (time * IDLE_CYCLE_RATE + offset).sin();
    rig.torso.x = s * 0.05;
    rig.arm_left.x = s * 0.05;
    rig.arm_right.x = s * 0.05;
    if goalkeeper {
        rig.arm_left.z = 0.5;
        rig.arm_right.z = -0.5;
        rig.leg_left.x = 0.2;
        rig.leg_right.x = -0.2;
    } else {
        rig.arm_left.z = 0.0;
        rig.arm_right.z = 0.0;
        rig.leg_left.x = 0.0;
        rig.leg_right.x = 0.0;
    }
    Pose::Idle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{PlayerId, PlayerStats, Role};
    use crate::vec3::{vec3, Vec3};
    use soccer_shared::protocol::Side;

    fn player(role: Role) -> Player {
        Player::new(
            PlayerId(0),
            "Test".to_string(),
            Side::Home,
            role,
            Vec3::ZERO,
            PlayerStats {
                speed: 1.0,
                shot_power: 30.0,
                pass_accuracy: 0.8,
            },
            0.0,
        )
    }

    fn controller() -> AnimationController {
        AnimationController::new(AnimationConfig::default())
    }

    #[test]
    fn standing_player_idles() {
        let mut p = player(Role::Field);
        assert_eq!(controller().update(&mut p, 0.016, 1.0), Pose::Idle);
        assert_eq!(p.rig.leg_left.x, 0.0);
    }

    #[test]
    fn keeper_idle_stance() {
        let mut p = player(Role::Goalkeeper);
        controller().update(&mut p, 0.016, 1.0);
        assert_eq!(p.rig.arm_left.z, 0.5);
        assert_eq!(p.rig.arm_right.z, -0.5);
        assert_eq!(p.rig.leg_left.x, 0.2);
    }

    #[test]
    fn run_and_sprint_cycles() {
        let anim = controller();
        let mut p = player(Role::Field);
        p.velocity = vec3(7.0, 0.0, 0.0);
        assert_eq!(anim.update(&mut p, 0.016, 1.0), Pose::Run);
        assert_eq!(p.rig.torso.x, 0.1);

        p.velocity = vec3(0.0, 0.0, 12.0);
        assert_eq!(anim.update(&mut p, 0.016, 1.0), Pose::Sprint);
        assert_eq!(p.rig.torso.x, 0.3);
    }

    #[test]
    fn jump_peaks_halfway_then_ends() {
        let anim = controller();
        let mut p = player(Role::Field);
        let config = AnimationConfig::default();
        trigger_jump(&mut p.anim, &config);

        anim.update(&mut p, config.jump_duration / 2.0, 0.0);
        assert!((p.rig.lift - config.jump_height).abs() < 1e-9);

        anim.update(&mut p, config.jump_duration / 2.0, 0.0);
        assert_eq!(p.anim.jump_timer, 0.0);
        assert_eq!(anim.update(&mut p, 0.016, 0.0), Pose::Idle);
        assert_eq!(p.rig.lift, 0.0);
    }

    #[test]
    fn jump_is_not_restarted_mid_air() {
        let config = AnimationConfig::default();
        let mut state = AnimState::default();
        trigger_jump(&mut state, &config);
        state.jump_timer = 0.3;
        trigger_jump(&mut state, &config);
        assert_eq!(state.jump_timer, 0.3);
    }

    #[test]
    fn jump_overrides_dive() {
        let config = AnimationConfig::default();
        let mut p = player(Role::Goalkeeper);
        trigger_dive(&mut p.anim, -1.0, &config);
        trigger_jump(&mut p.anim, &config);
        assert_eq!(controller().update(&mut p, 0.1, 0.0), Pose::Jump);
        // Dive timer is untouched while the jump plays
        assert_eq!(p.anim.dive_timer, config.dive_duration);
    }

    #[test]
    fn dive_rolls_towards_direction() {
        let config = AnimationConfig::default();
        let mut p = player(Role::Goalkeeper);
        trigger_dive(&mut p.anim, -1.0, &config);
        assert_eq!(controller().update(&mut p, 0.1, 0.0), Pose::Dive);
        assert!(p.rig.roll < 0.0);
        assert_eq!(p.rig.arm_left.z, 2.8);
    }

    #[test]
    fn throw_winds_up_then_releases() {
        let config = AnimationConfig::default();
        let anim = controller();
        let mut p = player(Role::Field);
        trigger_throw(&mut p.anim, &config);

        anim.update(&mut p, 0.1, 0.0);
        assert_eq!(p.rig.torso.x, -0.5);
        anim.update(&mut p, 0.4, 0.0);
        assert_eq!(p.rig.torso.x, 0.5);
    }

    #[test]
    fn same_clock_same_pose() {
        let anim = controller();
        let mut a = player(Role::Field);
        let mut b = player(Role::Field);
        a.velocity = vec3(5.0, 0.0, 0.0);
        b.velocity = vec3(5.0, 0.0, 0.0);
        anim.update(&mut a, 0.016, 12.5);
        anim.update(&mut b, 0.016, 12.5);
        assert_eq!(a.rig, b.rig);
    }
}
