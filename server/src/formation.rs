use crate::player::{Player, PlayerId, PlayerStats, Role};
use crate::vec3::Vec3;
use rand::Rng;
use soccer_shared::config::{FieldConfig, GameMode, MatchConfig, TeamProfile};
use soccer_shared::protocol::Side;

/// Training drill spot for the user-controlled player.
const TRAINING_USER_SLOT: [f64; 2] = [0.0, 30.0];
/// Training keeper stands on the away goal line.
const TRAINING_KEEPER_SLOT: [f64; 2] = [0.0, -48.0];

/// Distance outside the touchline where teams line up before walking out.
const TUNNEL_OFFSET: f64 = 3.0;
const TUNNEL_SPACING: f64 = 1.5;

/// Spawned players plus the one the local user starts controlling.
#[derive(Debug)]
pub struct Lineup {
    pub players: Vec<Player>,
    pub active: PlayerId,
}

/// Build both teams from the configured layout.
/// Away mirrors the home slots through the halfway line.
pub fn spawn_lineup(config: &MatchConfig, rng: &mut impl Rng) -> Lineup {
    let mut players = Vec::new();

    match config.mode {
        GameMode::Training => {
            spawn(&mut players, config, &config.home_team, Side::Home, 0, TRAINING_USER_SLOT, Role::Field, rng);
            spawn(&mut players, config, &config.away_team, Side::Away, 0, TRAINING_KEEPER_SLOT, Role::Goalkeeper, rng);
            Lineup {
                players,
                active: PlayerId(0),
            }
        }
        GameMode::Match => {
            for (slot, &[x, z]) in config.formation.iter().enumerate() {
                let role = if slot == 0 { Role::Goalkeeper } else { Role::Field };
                spawn(&mut players, config, &config.home_team, Side::Home, slot, [x, z], role, rng);
            }
            for (slot, &[x, z]) in config.formation.iter().enumerate() {
                let role = if slot == 0 { Role::Goalkeeper } else { Role::Field };
                spawn(&mut players, config, &config.away_team, Side::Away, slot, [x, -z], role, rng);
            }
            // The most advanced home slot starts under user control
            let active = PlayerId((config.formation.len() - 1) as u32);
            Lineup { players, active }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn(
    players: &mut Vec<Player>,
    config: &MatchConfig,
    team: &TeamProfile,
    side: Side,
    slot: usize,
    [x, z]: [f64; 2],
    role: Role,
    rng: &mut impl Rng,
) {
    let id = PlayerId(players.len() as u32);
    let name = team
        .roster
        .get(slot)
        .cloned()
        .unwrap_or_else(|| format!("{} {}", team.name, slot + 1));
    let stats = PlayerStats::from_team(team, slot, role, config.gameplay.shoot_power_max);
    let anim_offset = rng.gen::<f64>() * 100.0;
    players.push(Player::new(id, name, side, role, Vec3::new(x, 0.0, z), stats, anim_offset));
}

/// Line field players up beside the pitch for the walk-out.
/// Keepers stay on their slots.
pub fn move_to_tunnel(players: &mut [Player], field: &FieldConfig) {
    let mut home_n = 0;
    let mut away_n = 0;
    for p in players.iter_mut().filter(|p| !p.is_goalkeeper()) {
        let n = match p.side {
            Side::Home => {
                home_n += 1;
                home_n
            }
            Side::Away => {
                away_n += 1;
                away_n
            }
        };
        let z = match p.side {
            Side::Home => n as f64 * TUNNEL_SPACING,
            Side::Away => -(n as f64) * TUNNEL_SPACING,
        };
        p.pos = Vec3::new(-(field.half_width() + TUNNEL_OFFSET), 0.0, z);
        p.velocity = Vec3::ZERO;
    }
}

/// Put everyone back on their formation slot (after a goal).
pub fn reset_to_slots(players: &mut [Player]) {
    for p in players.iter_mut() {
        p.pos = p.home_pos;
        p.velocity = Vec3::ZERO;
        p.yaw = match p.side {
            Side::Home => std::f64::consts::PI,
            Side::Away => 0.0,
        };
    }
}
