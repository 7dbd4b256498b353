//! Decision making for every player the user is not controlling.
//!
//! Planning is memoryless: each tick the state is re-derived from the match
//! context, then executed. Anything that touches the ball is handed back to
//! the session as an [`AiAction`] instead of being applied here.

use crate::animation;
use crate::ball::Ball;
use crate::player::{attack_sign, defended_goal_z, Player, PlayerId};
use crate::vec3::{self, Vec3};
use rand::Rng;
use soccer_shared::config::MatchConfig;
use soccer_shared::protocol::Side;

/// Base movement speed before stat and state multipliers
const BASE_SPEED: f64 = 7.0;
/// Closer than this to a target counts as arrived
const ARRIVE_EPSILON: f64 = 0.2;
/// Loose balls within this distance are chased
const CHASE_RADIUS: f64 = 10.0;
/// Shots are considered inside this distance of the goal
const SHOOT_RANGE: f64 = 20.0;
/// Per-tick shot chance at difficulty 1.0
const SHOOT_CHANCE: f64 = 0.05;
const SUPPORT_PUSH: f64 = 5.0;

const KEEPER_HALF_RANGE: f64 = 3.5;
const KEEPER_TRACKING: f64 = 0.8;
const KEEPER_LINE_OFFSET: f64 = 1.0;
const KEEPER_APPROACH_RATE: f64 = 4.0;
const DIVE_RANGE: f64 = 4.0;
const DIVE_BALL_SPEED: f64 = 10.0;

const SEPARATION_RADIUS: f64 = 2.0;
const SEPARATION_STRENGTH: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiState {
    Idle,
    Positioning,
    Chase,
    Attack,
    Defend,
    GkIdle,
    GkTrack,
    GkSave,
}

/// Ball-affecting intents. Consumed once by the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AiAction {
    Shoot { power: f64, lift: f64 },
    /// Push the ball along `dir` while running with it
    Dribble { dir: Vec3 },
    /// Take ownership of a loose ball
    Claim,
    /// Keeper parry; `dir` is the dive side
    Save { dir: f64 },
}

/// What a player can see of the match this tick.
pub struct AiContext<'a> {
    pub ball: &'a Ball,
    pub owner: Option<(PlayerId, Side)>,
    /// Ball in play (phase is playing and no celebration pending)
    pub ball_live: bool,
    pub difficulty: f64,
    pub config: &'a MatchConfig,
}

/// Re-derive a field player's state from scratch.
pub fn decide(player: &Player, ctx: &AiContext) -> AiState {
    let dist = vec3::distance(player.pos, ctx.ball.pos);
    match ctx.owner {
        Some((id, _)) if id == player.id => AiState::Attack,
        None if ctx.ball_live && dist < CHASE_RADIUS => AiState::Chase,
        None if !ctx.ball_live => AiState::Idle,
        Some((_, side)) if side == player.side => AiState::Positioning,
        _ => AiState::Defend,
    }
}

/// Plan and move one non-controlled player.
pub fn plan(player: &mut Player, ctx: &AiContext, dt: f64, rng: &mut impl Rng) -> Option<AiAction> {
    if player.is_goalkeeper() {
        return plan_keeper(player, ctx, dt);
    }

    player.ai_state = decide(player, ctx);
    match player.ai_state {
        AiState::Chase => {
            move_towards(player, ctx.ball.pos, 1.0, dt);
            let dist = vec3::distance(player.pos, ctx.ball.pos);
            (dist < ctx.config.gameplay.control_distance).then_some(AiAction::Claim)
        }
        AiState::Attack => attack(player, ctx, dt, rng),
        AiState::Positioning => {
            let mut target = player.home_pos;
            target.z += attack_sign(player.side) * SUPPORT_PUSH;
            move_towards(player, target, 0.8, dt);
            None
        }
        AiState::Defend => {
            let mut target = player.home_pos;
            target.x = target.x * 0.5 + ctx.ball.pos.x * 0.5;
            move_towards(player, target, 0.8, dt);
            None
        }
        _ => {
            move_towards(player, player.home_pos, 0.5, dt);
            None
        }
    }
}

fn attack(player: &mut Player, ctx: &AiContext, dt: f64, rng: &mut impl Rng) -> Option<AiAction> {
    let goal = Vec3::new(0.0, 0.0, -defended_goal_z(player.side, &ctx.config.field));

    if vec3::distance(player.pos, goal) < SHOOT_RANGE
        && player.ready()
        && rng.gen::<f64>() < SHOOT_CHANCE * ctx.difficulty
    {
        player.look_at(goal);
        player.velocity = Vec3::ZERO;
        return Some(AiAction::Shoot {
            power: player.stats.shot_power * 0.9,
            lift: 0.4,
        });
    }

    if move_towards(player, goal, 0.9, dt) {
        return None;
    }
    Some(AiAction::Dribble { dir: player.forward() })
}

fn plan_keeper(player: &mut Player, ctx: &AiContext, dt: f64) -> Option<AiAction> {
    let ball = ctx.ball;
    let goal_z = defended_goal_z(player.side, &ctx.config.field);
    // In front of the goal line, towards the pitch
    let target_x = (ball.pos.x * KEEPER_TRACKING).clamp(-KEEPER_HALF_RANGE, KEEPER_HALF_RANGE);
    let target_z = goal_z + attack_sign(player.side) * KEEPER_LINE_OFFSET;

    let step = (KEEPER_APPROACH_RATE * dt).min(1.0);
    let dx = (target_x - player.pos.x) * step;
    let dz = (target_z - player.pos.z) * step;
    player.pos.x += dx;
    player.pos.z += dz;
    player.velocity = if dt > 0.0 {
        Vec3::new(dx / dt, 0.0, dz / dt)
    } else {
        Vec3::ZERO
    };
    player.look_at(ball.pos);

    if player.anim.dive_timer > 0.0 {
        player.ai_state = AiState::GkSave;
        return None;
    }
    if !ctx.ball_live {
        player.ai_state = AiState::GkIdle;
        return None;
    }
    player.ai_state = AiState::GkTrack;

    let dist = vec3::distance(player.pos, ball.pos);
    let towards_goal = ball.vel.z * goal_z.signum() > 0.0;
    if dist < DIVE_RANGE && ball.speed() > DIVE_BALL_SPEED && towards_goal {
        let dir = if ball.pos.x > player.pos.x { 1.0 } else { -1.0 };
        animation::trigger_dive(&mut player.anim, dir, &ctx.config.animation);
        player.ai_state = AiState::GkSave;
        return Some(AiAction::Save { dir });
    }
    None
}

/// Walk along the ground towards `target`. Returns true once arrived.
pub fn move_towards(player: &mut Player, target: Vec3, speed_mult: f64, dt: f64) -> bool {
    let to_target = vec3::flat(target - player.pos);
    if vec3::length(to_target) <= ARRIVE_EPSILON {
        player.velocity = Vec3::ZERO;
        return true;
    }
    let dir = vec3::normalize(to_target);
    let speed = BASE_SPEED * player.stats.speed * speed_mult;
    player.pos += dir * (speed * dt);
    player.velocity = dir * speed;
    player.face(dir);
    false
}

/// Boid-style push away from crowded neighbours, one offset per position.
/// Computed from a snapshot so iteration order doesn't matter.
pub fn separation_offsets(positions: &[Vec3], dt: f64) -> Vec<Vec3> {
    positions
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let mut push = Vec3::ZERO;
            let mut neighbours = 0;
            for (j, &q) in positions.iter().enumerate() {
                if i == j {
                    continue;
                }
                let away = vec3::flat(p - q);
                let d = vec3::length(away);
                // Coincident players have no defined direction
                if d < SEPARATION_RADIUS && d > 1e-9 {
                    push += away * (1.0 / (d * d));
                    neighbours += 1;
                }
            }
            if neighbours == 0 {
                return Vec3::ZERO;
            }
            push * (SEPARATION_STRENGTH * dt / neighbours as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formation::spawn_lineup;
    use crate::player::{PlayerStats, Role};
    use crate::vec3::vec3;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const DT: f64 = 1.0 / 60.0;

    fn field_player(side: Side, pos: Vec3) -> Player {
        Player::new(
            PlayerId(1),
            "Test".to_string(),
            side,
            Role::Field,
            pos,
            PlayerStats {
                speed: 1.0,
                shot_power: 30.0,
                pass_accuracy: 0.8,
            },
            0.0,
        )
    }

    fn keeper(side: Side) -> Player {
        let config = MatchConfig::default();
        let z = defended_goal_z(side, &config.field);
        let mut p = field_player(side, vec3(0.0, 0.0, z + attack_sign(side)));
        p.role = Role::Goalkeeper;
        p
    }

    fn ball_at(pos: Vec3, vel: Vec3) -> Ball {
        let mut ball = Ball::new(0.35);
        ball.pos = pos;
        ball.vel = vel;
        ball
    }

    fn ctx<'a>(ball: &'a Ball, config: &'a MatchConfig, owner: Option<(PlayerId, Side)>) -> AiContext<'a> {
        AiContext {
            ball,
            owner,
            ball_live: true,
            difficulty: 1.0,
            config,
        }
    }

    #[test]
    fn owner_attacks() {
        let config = MatchConfig::default();
        let ball = ball_at(vec3(0.0, 0.35, 0.0), Vec3::ZERO);
        let p = field_player(Side::Home, Vec3::ZERO);
        assert_eq!(decide(&p, &ctx(&ball, &config, Some((p.id, Side::Home)))), AiState::Attack);
    }

    #[test]
    fn loose_ball_nearby_is_chased_only_when_live() {
        let config = MatchConfig::default();
        let ball = ball_at(vec3(3.0, 0.35, 0.0), Vec3::ZERO);
        let p = field_player(Side::Home, Vec3::ZERO);
        let mut c = ctx(&ball, &config, None);
        assert_eq!(decide(&p, &c), AiState::Chase);
        c.ball_live = false;
        assert_eq!(decide(&p, &c), AiState::Idle);
    }

    #[test]
    fn teammate_possession_means_support() {
        let config = MatchConfig::default();
        let ball = ball_at(vec3(3.0, 0.35, 0.0), Vec3::ZERO);
        let p = field_player(Side::Away, Vec3::ZERO);
        let c = ctx(&ball, &config, Some((PlayerId(7), Side::Away)));
        assert_eq!(decide(&p, &c), AiState::Positioning);
    }

    #[test]
    fn opponent_possession_or_far_ball_means_defend() {
        let config = MatchConfig::default();
        let far = ball_at(vec3(0.0, 0.35, 30.0), Vec3::ZERO);
        let p = field_player(Side::Away, Vec3::ZERO);
        assert_eq!(decide(&p, &ctx(&far, &config, None)), AiState::Defend);
        let near = ball_at(vec3(1.0, 0.35, 0.0), Vec3::ZERO);
        let c = ctx(&near, &config, Some((PlayerId(2), Side::Home)));
        assert_eq!(decide(&p, &c), AiState::Defend);
    }

    #[test]
    fn chaser_claims_ball_within_control_distance() {
        let config = MatchConfig::default();
        let ball = ball_at(vec3(1.0, 0.35, 0.0), Vec3::ZERO);
        let mut p = field_player(Side::Away, Vec3::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let action = plan(&mut p, &ctx(&ball, &config, None), DT, &mut rng);
        assert_eq!(action, Some(AiAction::Claim));
    }

    #[test]
    fn attacker_heads_for_opponent_goal() {
        let config = MatchConfig::default();
        let ball = ball_at(vec3(0.0, 0.35, 0.0), Vec3::ZERO);
        // Zero difficulty never shoots
        let mut p = field_player(Side::Home, Vec3::ZERO);
        let mut c = ctx(&ball, &config, Some((p.id, Side::Home)));
        c.difficulty = 0.0;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let action = plan(&mut p, &c, DT, &mut rng);
        assert!(p.pos.z < 0.0, "home attacks -z, moved to {:?}", p.pos);
        match action {
            Some(AiAction::Dribble { dir }) => assert!(dir.z < -0.99),
            other => panic!("expected dribble, got {:?}", other),
        }
    }

    #[test]
    fn attacker_in_range_eventually_shoots() {
        let config = MatchConfig::default();
        let ball = ball_at(vec3(0.0, 0.35, -30.0), Vec3::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut shot = None;
        for _ in 0..2000 {
            let mut p = field_player(Side::Home, vec3(0.0, 0.0, -30.0));
            let c = ctx(&ball, &config, Some((p.id, Side::Home)));
            if let Some(AiAction::Shoot { power, lift }) = plan(&mut p, &c, DT, &mut rng) {
                shot = Some((power, lift));
                break;
            }
        }
        let (power, lift) = shot.expect("no shot in 2000 rolls");
        assert!((power - 27.0).abs() < 1e-9);
        assert_eq!(lift, 0.4);
    }

    #[test]
    fn attacker_on_cooldown_never_shoots() {
        let config = MatchConfig::default();
        let ball = ball_at(vec3(0.0, 0.35, -30.0), Vec3::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..500 {
            let mut p = field_player(Side::Home, vec3(0.0, 0.0, -30.0));
            p.cooldown = 10;
            let c = ctx(&ball, &config, Some((p.id, Side::Home)));
            let action = plan(&mut p, &c, DT, &mut rng);
            assert!(!matches!(action, Some(AiAction::Shoot { .. })));
        }
    }

    #[test]
    fn support_pushes_towards_attacking_end() {
        let config = MatchConfig::default();
        let ball = ball_at(vec3(0.0, 0.35, -40.0), Vec3::ZERO);
        let mut p = field_player(Side::Away, vec3(0.0, 0.0, -10.0));
        let c = ctx(&ball, &config, Some((PlayerId(9), Side::Away)));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        plan(&mut p, &c, DT, &mut rng);
        assert!(p.pos.z > -10.0);
        assert!((p.ground_speed() - 7.0 * 0.8).abs() < 1e-9);
    }

    #[test]
    fn arrival_stops_player() {
        let mut p = field_player(Side::Home, vec3(1.0, 0.0, 1.0));
        assert!(move_towards(&mut p, vec3(1.1, 0.0, 1.1), 1.0, DT));
        assert_eq!(p.velocity, Vec3::ZERO);
        assert_eq!(p.pos, vec3(1.0, 0.0, 1.0));
    }

    #[test]
    fn keeper_tracks_ball_within_goal_width() {
        let config = MatchConfig::default();
        let ball = ball_at(vec3(25.0, 0.35, 30.0), Vec3::ZERO);
        let mut k = keeper(Side::Home);
        let c = ctx(&ball, &config, None);
        for _ in 0..600 {
            plan(&mut k, &c, DT, &mut ChaCha8Rng::seed_from_u64(0));
        }
        assert!((k.pos.x - 3.5).abs() < 1e-3);
        assert!((k.pos.z - 44.0).abs() < 1e-3);
        assert_eq!(k.ai_state, AiState::GkTrack);
    }

    #[test]
    fn keeper_dives_at_fast_incoming_shot() {
        let config = MatchConfig::default();
        let mut k = keeper(Side::Home);
        let ball = ball_at(vec3(k.pos.x - 2.0, 0.8, k.pos.z - 2.0), vec3(0.0, 0.0, 25.0));
        let action = plan(&mut k, &ctx(&ball, &config, None), DT, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(action, Some(AiAction::Save { dir: -1.0 }));
        assert_eq!(k.ai_state, AiState::GkSave);
        assert!(k.anim.dive_timer > 0.0);

        // No second save while the dive plays
        let again = plan(&mut k, &ctx(&ball, &config, None), DT, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(again, None);
    }

    #[test]
    fn keeper_ignores_ball_moving_away() {
        let config = MatchConfig::default();
        let mut k = keeper(Side::Away);
        let ball = ball_at(vec3(k.pos.x + 1.0, 0.35, k.pos.z + 2.0), vec3(0.0, 0.0, 25.0));
        let action = plan(&mut k, &ctx(&ball, &config, None), DT, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(action, None);
    }

    #[test]
    fn separation_pushes_neighbours_apart() {
        let positions = [vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(10.0, 0.0, 0.0)];
        let offsets = separation_offsets(&positions, DT);
        assert!(offsets[0].x < 0.0);
        assert!(offsets[1].x > 0.0);
        assert_eq!(offsets[2], Vec3::ZERO);
        assert!((offsets[0].x + offsets[1].x).abs() < 1e-12);
    }

    #[test]
    fn coincident_players_do_not_produce_nan() {
        let offsets = separation_offsets(&[Vec3::ZERO, Vec3::ZERO], DT);
        assert!(offsets.iter().all(|o| o.is_finite()));
    }

    #[test]
    fn same_seed_same_decisions() {
        let run = |seed: u64| {
            let config = MatchConfig::default();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut lineup = spawn_lineup(&config, &mut rng);
            let ball = ball_at(vec3(4.0, 0.35, -12.0), vec3(-3.0, 0.0, 2.0));
            let owner = Some((PlayerId(6), Side::Away));
            let mut actions = Vec::new();
            for _ in 0..300 {
                for p in lineup.players.iter_mut() {
                    let c = ctx(&ball, &config, owner);
                    actions.push(plan(p, &c, DT, &mut rng));
                }
            }
            let positions: Vec<Vec3> = lineup.players.iter().map(|p| p.pos).collect();
            (positions, actions)
        };
        assert_eq!(run(11), run(11));
    }
}
