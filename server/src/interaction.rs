//! Local input applied to the controlled player: movement, stamina,
//! possession, shooting, passing, dribbling and tackling.

use crate::animation;
use crate::error::TickError;
use crate::player::PlayerId;
use crate::state::GameState;
use crate::vec3::{self, Vec3};
use rand::Rng;
use soccer_shared::config::CameraMode;
use soccer_shared::protocol::{InputState, MatchPhase, Side, SoundCue};
use tracing::debug;

/// Frames before the new active player may switch again
pub const SWITCH_COOLDOWN: u32 = 15;
pub const TACKLE_COOLDOWN: u32 = 40;

const SET_PIECE_TURN_RATE: f64 = 2.5;
const FIRST_PERSON_TURN_RATE: f64 = 3.0;
/// Aim indicator distance in front of the ball carrier
const AIM_DISTANCE: f64 = 5.0;

/// Real seconds between the throw animation starting and the ball leaving the hands
pub const THROW_DELAY: f64 = 0.4;
const THROW_POWER_SCALE: f64 = 0.7;
const THROW_LIFT: f64 = 2.5;

/// Pass direction error at zero accuracy, radians
const PASS_MAX_ERROR: f64 = 0.2;
const THROUGH_LIFT: f64 = 0.1;

const TACKLE_LUNGE: f64 = 1.5;
const TACKLE_KNOCK: f64 = 8.0;

const HEADER_HEIGHT: f64 = 1.5;
const HEADER_REACH: f64 = 1.5;

/// Identifies the situation a deferred kick was scheduled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KickToken {
    pub phase: MatchPhase,
    pub taker: PlayerId,
}

/// A kick that fires after a real-time delay (the throw-in release).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledKick {
    pub token: KickToken,
    /// Real seconds until it fires
    pub remaining: f64,
    pub power: f64,
    pub lift: f64,
}

impl ScheduledKick {
    /// Still applies if nothing about the restart has changed.
    pub fn is_valid(&self, phase: MatchPhase, active: PlayerId) -> bool {
        self.token.phase == phase && self.token.taker == active
    }
}

/// Raw movement intent on the ground plane before any camera projection.
/// Up is -z, right is +x.
fn raw_move(input: &InputState) -> Vec3 {
    let mut v = Vec3::ZERO;
    if input.up {
        v.z -= 1.0;
    }
    if input.down {
        v.z += 1.0;
    }
    if input.left {
        v.x -= 1.0;
    }
    if input.right {
        v.x += 1.0;
    }
    v
}

fn turn(input: &InputState) -> f64 {
    match (input.left, input.right) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

/// Apply one tick of input to the active player.
/// The caller only invokes this while the phase accepts input.
pub fn resolve(state: &mut GameState, input: &InputState, camera_yaw: f64, dt: f64) -> Result<(), TickError> {
    let phase = state.phase();
    let set_piece = phase.is_set_piece();

    if input.switch && state.player(state.active)?.ready() {
        switch_player(state)?;
    }

    let moving_dir = apply_movement(state, input, camera_yaw, set_piece, dt)?;

    let active = state.active;
    let gameplay = state.config.gameplay;
    let (pos, facing) = {
        let p = state.player(active)?;
        (p.pos, p.forward())
    };
    let dist = vec3::distance(pos, state.ball.pos);

    if phase == MatchPhase::Kickoff && dist < gameplay.kickoff_distance && (input.pass || input.shoot) {
        state.flow.transition(MatchPhase::Playing)?;
        state.sound(SoundCue::Whistle);
        state.message("GAME ON!", None);
    }

    if dist < gameplay.control_distance {
        state.owner = Some(active);
        state.last_toucher = Some(active);
        state.aim = Some(pos + facing * AIM_DISTANCE);
        on_ball(state, input, moving_dir, dt)?;
    } else {
        state.aim = None;
        state.charging = false;
        state.charge = 0.0;
        if state.owner == Some(active) {
            state.owner = None;
        }
        if input.shoot && !set_piece && state.player(active)?.ready() {
            tackle(state, dist)?;
        }
    }

    let reach = vec3::horizontal_distance(state.player(active)?.pos, state.ball.pos);
    if state.ball.pos.y > HEADER_HEIGHT && reach < HEADER_REACH {
        let anim_config = state.config.animation;
        animation::trigger_jump(&mut state.player_mut(active)?.anim, &anim_config);
    }
    Ok(())
}

/// Hand control to the outfield home player nearest the ball.
fn switch_player(state: &mut GameState) -> Result<(), TickError> {
    let current = state.active;
    let ball = state.ball.pos;
    let best = state
        .players
        .iter()
        .filter(|p| p.side == Side::Home && !p.is_goalkeeper() && p.id != current)
        .min_by(|a, b| {
            vec3::distance(a.pos, ball)
                .partial_cmp(&vec3::distance(b.pos, ball))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|p| p.id);

    if let Some(next) = best {
        state.active = next;
        state.charging = false;
        state.charge = 0.0;
        if state.owner == Some(current) {
            state.owner = None;
        }
        debug!("Control switched {} -> {}", current.0, next.0);
    }
    state.player_mut(state.active)?.cooldown = SWITCH_COOLDOWN;
    Ok(())
}

/// Returns the normalized run direction, or `None` when standing still.
fn apply_movement(
    state: &mut GameState,
    input: &InputState,
    camera_yaw: f64,
    set_piece: bool,
    dt: f64,
) -> Result<Option<Vec3>, TickError> {
    let first_person = state.camera_mode == CameraMode::FirstPerson;
    let active = state.active;

    let move_vec = if set_piece {
        let p = state.player_mut(active)?;
        p.yaw += turn(input) * SET_PIECE_TURN_RATE * dt;
        Vec3::ZERO
    } else if first_person {
        let p = state.player_mut(active)?;
        p.yaw += turn(input) * FIRST_PERSON_TURN_RATE * dt;
        let forward = p.forward();
        match (input.up, input.down) {
            (true, false) => forward,
            (false, true) => -forward,
            _ => Vec3::ZERO,
        }
    } else {
        vec3::rotate_y(raw_move(input), camera_yaw)
    };

    let moving = vec3::length(move_vec) > 0.0;
    let stamina = state.config.stamina;
    let sprinting = input.sprint && state.stamina > 0.0 && moving;
    let next = if sprinting {
        state.stamina - stamina.drain * dt
    } else {
        state.stamina + stamina.regen * dt
    };
    state.stamina = next.clamp(0.0, stamina.max);

    let gameplay = state.config.gameplay;
    let p = state.player_mut(active)?;
    if !moving {
        p.velocity = Vec3::ZERO;
        return Ok(None);
    }
    let dir = vec3::normalize(move_vec);
    let base = if sprinting { gameplay.sprint_speed } else { gameplay.run_speed };
    let speed = base * p.stats.speed;
    p.pos += dir * (speed * dt);
    p.velocity = dir * speed;
    if !first_person {
        p.face(dir);
    }
    Ok(Some(dir))
}

fn on_ball(state: &mut GameState, input: &InputState, moving_dir: Option<Vec3>, dt: f64) -> Result<(), TickError> {
    let active = state.active;
    let phase = state.phase();
    let set_piece = phase.is_set_piece();
    let gameplay = state.config.gameplay;

    // The thrower already let go
    if state.pending_kick.is_some() {
        return Ok(());
    }

    if input.shoot {
        state.charging = true;
        state.charge = (state.charge + gameplay.charge_rate * dt).min(1.0);
        return Ok(());
    }

    if state.charging {
        let charge = state.charge;
        state.charging = false;
        state.charge = 0.0;
        if phase == MatchPhase::ThrowIn {
            let anim_config = state.config.animation;
            animation::trigger_throw(&mut state.player_mut(active)?.anim, &anim_config);
            state.pending_kick = Some(ScheduledKick {
                token: KickToken { phase, taker: active },
                remaining: THROW_DELAY,
                power: charge * gameplay.shoot_power_max * THROW_POWER_SCALE,
                lift: THROW_LIFT,
            });
            return Ok(());
        }
        state.kick(active, charge * gameplay.shoot_power_max, 0.2 + 0.4 * charge)?;
        return state.restart_play();
    }

    let ready = state.player(active)?.ready();
    if input.pass && ready {
        let dir = pass_direction(state, active)?;
        state.kick_along(active, dir, gameplay.pass_power, 0.0)?;
        return state.restart_play();
    }
    if input.through && ready {
        let dir = pass_direction(state, active)?;
        state.kick_along(active, dir, gameplay.through_power, THROUGH_LIFT)?;
        return state.restart_play();
    }

    if let Some(dir) = moving_dir {
        if !set_piece {
            state
                .ball
                .nudge(dir * (gameplay.dribble_force * dt), Some(gameplay.dribble_max_speed));
        }
    }
    Ok(())
}

/// Facing direction knocked off line by up to the passer's inaccuracy.
fn pass_direction(state: &mut GameState, passer: PlayerId) -> Result<Vec3, TickError> {
    let p = state.player(passer)?;
    let forward = p.forward();
    let max_error = ((1.0 - p.stats.pass_accuracy) * PASS_MAX_ERROR).max(0.0);
    let error = if max_error > 0.0 {
        state.rng.gen_range(-max_error..=max_error)
    } else {
        0.0
    };
    Ok(vec3::rotate_y(forward, error))
}

fn tackle(state: &mut GameState, dist: f64) -> Result<(), TickError> {
    let active = state.active;
    let tackle_distance = state.config.gameplay.tackle_distance;
    let p = state.player_mut(active)?;
    let forward = p.forward();
    p.pos += forward * TACKLE_LUNGE;
    p.cooldown = TACKLE_COOLDOWN;

    if dist < tackle_distance {
        state.ball.nudge(forward * TACKLE_KNOCK, None);
        state.owner = None;
        state.last_toucher = Some(active);
        state.message("TACKLE!", None);
    }
    Ok(())
}

/// Count down a scheduled kick in real time and fire it, unless the restart
/// it belonged to is gone.
pub fn fire_scheduled(state: &mut GameState, real_dt: f64) -> Result<(), TickError> {
    let Some(kick) = state.pending_kick.as_mut() else {
        return Ok(());
    };
    kick.remaining -= real_dt;
    if kick.remaining > 0.0 {
        return Ok(());
    }
    let kick = *kick;
    state.pending_kick = None;

    if !kick.is_valid(state.phase(), state.active) {
        debug!(
            "Dropping stale kick for player {} (scheduled in {:?}, now {:?})",
            kick.token.taker.0,
            kick.token.phase,
            state.phase()
        );
        return Ok(());
    }
    state.kick(kick.token.taker, kick.power, kick.lift)?;
    state.restart_play()
}
