use crate::ball::Ball;
use crate::error::{SessionError, TickError};
use crate::formation::{self, spawn_lineup};
use crate::interaction::ScheduledKick;
use crate::match_flow::MatchStateMachine;
use crate::player::{Player, PlayerId};
use crate::vec3::{self, Vec3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use soccer_shared::config::{CameraMode, GameMode, MatchConfig, TimeOfDay, Weather};
use soccer_shared::protocol::{HudFrame, MatchPhase, Side, SoundCue, UiEvent};
use tracing::info;

/// Frames a player waits after kicking
pub const KICK_COOLDOWN: u32 = 20;
/// How long the "GOAL!!!" banner stays up
const GOAL_MESSAGE_MS: u32 = 3000;
/// Play is frozen this long before the restart
const GOAL_CELEBRATION_SECONDS: f64 = 3.0;
/// Set-piece takers stand this far behind the ball
const TAKER_GAP: f64 = 1.0;

/// Central match state owned by one session.
pub struct GameState {
    pub config: MatchConfig,
    pub flow: MatchStateMachine,
    pub players: Vec<Player>,
    pub ball: Ball,
    /// The one player under local control
    pub active: PlayerId,
    pub owner: Option<PlayerId>,
    pub last_toucher: Option<PlayerId>,
    pub home_score: u32,
    pub away_score: u32,
    pub time_remaining: f64,
    pub difficulty: f64,
    pub game_speed: f64,
    pub stamina: f64,
    /// Shot charge in [0, 1]
    pub charge: f64,
    pub charging: bool,
    pub camera_mode: CameraMode,
    pub weather: Weather,
    pub time_of_day: TimeOfDay,
    pub mode: GameMode,
    /// Aim indicator on the ground while the active player has the ball
    pub aim: Option<Vec3>,
    pub shake: f64,
    /// Simulated seconds since kick-off of the session
    pub clock: f64,
    pub pending_kick: Option<ScheduledKick>,
    pub rng: ChaCha8Rng,
    events: Vec<UiEvent>,
}

impl GameState {
    pub fn new(config: MatchConfig, seed: u64) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::InvalidConfig)?;
        for team in [&config.home_team, &config.away_team] {
            if team.roster.is_empty() {
                return Err(SessionError::EmptyRoster {
                    team: team.name.clone(),
                });
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let lineup = spawn_lineup(&config, &mut rng);

        Ok(Self {
            ball: Ball::new(config.field.ball_radius),
            flow: MatchStateMachine::new(),
            players: lineup.players,
            active: lineup.active,
            owner: None,
            last_toucher: None,
            home_score: 0,
            away_score: 0,
            time_remaining: config.match_duration,
            difficulty: config.ai_difficulty,
            game_speed: config.game_speed,
            stamina: config.stamina.max,
            charge: 0.0,
            charging: false,
            camera_mode: config.camera_mode,
            weather: config.weather,
            time_of_day: config.time_of_day,
            mode: config.mode,
            aim: None,
            shake: 0.0,
            clock: 0.0,
            pending_kick: None,
            rng,
            events: Vec::new(),
            config,
        })
    }

    pub fn phase(&self) -> MatchPhase {
        self.flow.phase()
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, TickError> {
        let len = self.players.len();
        self.players
            .get(id.index())
            .ok_or(TickError::DanglingHandle { id: id.0, len })
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, TickError> {
        let len = self.players.len();
        self.players
            .get_mut(id.index())
            .ok_or(TickError::DanglingHandle { id: id.0, len })
    }

    pub fn owner_side(&self) -> Option<Side> {
        self.owner
            .and_then(|id| self.players.get(id.index()))
            .map(|p| p.side)
    }

    // === Notifications ===

    pub fn push_event(&mut self, event: UiEvent) {
        self.events.push(event);
    }

    pub fn message(&mut self, text: impl Into<String>, duration_ms: Option<u32>) {
        self.events.push(UiEvent::Message {
            text: text.into(),
            duration_ms,
        });
    }

    pub fn sound(&mut self, cue: SoundCue) {
        self.events.push(UiEvent::Sound { cue });
    }

    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.events)
    }

    // === Ball actions ===

    /// Strike the ball along `dir` on behalf of `kicker`.
    pub fn kick_along(&mut self, kicker: PlayerId, dir: Vec3, power: f64, lift: f64) -> Result<(), TickError> {
        self.player_mut(kicker)?.cooldown = KICK_COOLDOWN;
        self.ball.kick(dir, power, lift);
        self.owner = None;
        self.last_toucher = Some(kicker);
        self.sound(SoundCue::Kick);
        Ok(())
    }

    /// Strike the ball the way the kicker is facing.
    pub fn kick(&mut self, kicker: PlayerId, power: f64, lift: f64) -> Result<(), TickError> {
        let dir = self.player(kicker)?.forward();
        self.kick_along(kicker, dir, power, lift)
    }

    // === Flow ===

    /// Credit a goal and start the celebration. Scores persist across resets.
    pub fn score_goal(&mut self, scorer: Side) {
        match scorer {
            Side::Home => self.home_score += 1,
            Side::Away => self.away_score += 1,
        }
        info!("Goal for {} ({}-{})", scorer.label(), self.home_score, self.away_score);
        self.owner = None;
        self.charging = false;
        self.charge = 0.0;
        self.aim = None;
        self.pending_kick = None;
        self.shake = 1.0;
        self.sound(SoundCue::Whistle);
        self.push_event(UiEvent::ScoreChanged {
            home: self.home_score,
            away: self.away_score,
        });
        self.message(format!("GOAL!!! {}", scorer.label()), Some(GOAL_MESSAGE_MS));
        self.flow.begin_celebration(GOAL_CELEBRATION_SECONDS);
    }

    /// Ball to the centre spot and everyone back on their slots.
    pub fn reset_after_goal(&mut self) {
        self.ball = Ball::new(self.config.field.ball_radius);
        formation::reset_to_slots(&mut self.players);
        self.owner = None;
        self.last_toucher = None;
    }

    /// Dead ball at `spot` with the controlled player lined up behind it.
    /// The phase must already be the set piece.
    pub fn place_set_piece(&mut self, spot: Vec3) -> Result<(), TickError> {
        let radius = self.config.field.ball_radius;
        self.owner = None;
        self.charging = false;
        self.charge = 0.0;
        self.pending_kick = None;
        self.ball.place(spot, radius);

        // Face the goal the home side attacks
        let target = Vec3::new(0.0, 0.0, -self.config.field.half_length());
        let mut facing = vec3::flat(target - spot);
        if vec3::length(facing) < 1e-9 {
            facing = Vec3::new(0.0, 0.0, -1.0);
        }
        let facing = vec3::normalize(facing);
        let taker = self.player_mut(self.active)?;
        taker.pos = Vec3::new(spot.x, 0.0, spot.z) - facing * TAKER_GAP;
        taker.velocity = Vec3::ZERO;
        taker.face(facing);

        let phase = self.phase();
        info!("Set piece: {}", phase.label());
        self.sound(SoundCue::Whistle);
        self.message(phase.label(), None);
        self.push_event(UiEvent::SetPiece { phase: Some(phase) });
        Ok(())
    }

    /// Set piece taken: back to open play.
    pub fn restart_play(&mut self) -> Result<(), TickError> {
        if self.phase().is_set_piece() {
            self.flow.transition(MatchPhase::Playing)?;
            self.push_event(UiEvent::SetPiece { phase: None });
        }
        Ok(())
    }

    // === Invariants ===

    pub fn check_finite(&self) -> Result<(), TickError> {
        if !self.ball.pos.is_finite() || !self.ball.vel.is_finite() {
            return Err(TickError::NonFiniteBall {
                pos: self.ball.pos.to_array(),
                vel: self.ball.vel.to_array(),
            });
        }
        if let Some(p) = self.players.iter().find(|p| !p.is_finite()) {
            return Err(TickError::NonFinitePlayer { id: p.id.0 });
        }
        for id in [Some(self.active), self.owner, self.last_toucher].into_iter().flatten() {
            self.player(id)?;
        }
        Ok(())
    }

    pub fn hud_frame(&self) -> HudFrame {
        HudFrame {
            phase: self.phase(),
            home_score: self.home_score,
            away_score: self.away_score,
            time_remaining: self.time_remaining,
            possession: self.owner_side(),
            owner_id: self.owner.map(|id| id.0),
            active_id: Some(self.active.0),
            stamina: self.stamina,
            charge: self.charge,
            charging: self.charging,
            paused: self.flow.paused(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3::vec3;

    fn test_state() -> GameState {
        GameState::new(MatchConfig::default(), 12345).unwrap()
    }

    fn playing_state() -> GameState {
        let mut state = test_state();
        state.flow.start(GameMode::Match).unwrap();
        state.flow.transition(MatchPhase::Kickoff).unwrap();
        state.flow.transition(MatchPhase::Playing).unwrap();
        state
    }

    #[test]
    fn new_state_starts_in_menu_with_full_stamina() {
        let state = test_state();
        assert_eq!(state.phase(), MatchPhase::Menu);
        assert_eq!(state.stamina, 100.0);
        assert_eq!(state.time_remaining, 300.0);
        assert!(state.owner.is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = MatchConfig {
            game_speed: 0.0,
            ..MatchConfig::default()
        };
        assert!(matches!(
            GameState::new(config, 1),
            Err(SessionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_roster_is_rejected() {
        let mut config = MatchConfig::default();
        config.away_team.roster.clear();
        assert!(matches!(
            GameState::new(config, 1),
            Err(SessionError::EmptyRoster { .. })
        ));
    }

    #[test]
    fn kick_clears_owner_and_credits_kicker() {
        let mut state = playing_state();
        let kicker = state.active;
        state.owner = Some(kicker);
        state.kick(kicker, 20.0, 0.0).unwrap();
        assert!(state.owner.is_none());
        assert_eq!(state.last_toucher, Some(kicker));
        assert_eq!(state.player(kicker).unwrap().cooldown, KICK_COOLDOWN);
        assert!((state.ball.speed() - 20.0).abs() < 1e-9);
        assert!(state
            .drain_events()
            .contains(&UiEvent::Sound { cue: SoundCue::Kick }));
    }

    #[test]
    fn goal_updates_score_and_celebrates() {
        let mut state = playing_state();
        state.score_goal(Side::Away);
        assert_eq!((state.home_score, state.away_score), (0, 1));
        assert!(state.flow.celebrating());
        let events = state.drain_events();
        assert!(events.contains(&UiEvent::ScoreChanged { home: 0, away: 1 }));
        assert!(events.iter().any(|e| matches!(
            e,
            UiEvent::Message { text, duration_ms: Some(3000) } if text == "GOAL!!! AWAY"
        )));
    }

    #[test]
    fn reset_after_goal_keeps_score() {
        let mut state = playing_state();
        state.score_goal(Side::Home);
        state.ball.pos = vec3(3.0, 1.0, -46.0);
        state.players[2].pos = vec3(20.0, 0.0, 20.0);
        state.reset_after_goal();
        assert_eq!(state.home_score, 1);
        assert_eq!(state.ball.pos, vec3(0.0, 0.35, 0.0));
        assert_eq!(state.players[2].pos, state.players[2].home_pos);
    }

    #[test]
    fn set_piece_puts_taker_behind_ball() {
        let mut state = playing_state();
        state.owner = Some(PlayerId(6));
        state.flow.transition(MatchPhase::Corner).unwrap();
        state.place_set_piece(vec3(30.0, 0.0, 45.0)).unwrap();

        assert!(state.owner.is_none());
        assert_eq!(state.ball.pos, vec3(30.0, 0.35, 45.0));
        let taker = state.player(state.active).unwrap();
        let gap = vec3::horizontal_distance(taker.pos, state.ball.pos);
        assert!((gap - TAKER_GAP).abs() < 1e-9);
        assert!(gap < state.config.gameplay.control_distance);
        assert!(state.drain_events().contains(&UiEvent::SetPiece {
            phase: Some(MatchPhase::Corner)
        }));
    }

    #[test]
    fn restart_play_leaves_set_piece() {
        let mut state = playing_state();
        state.flow.transition(MatchPhase::GoalKick).unwrap();
        state.restart_play().unwrap();
        assert_eq!(state.phase(), MatchPhase::Playing);
        assert!(state
            .drain_events()
            .contains(&UiEvent::SetPiece { phase: None }));
    }

    #[test]
    fn non_finite_ball_is_reported() {
        let mut state = test_state();
        state.ball.vel.x = f64::NAN;
        assert!(matches!(state.check_finite(), Err(TickError::NonFiniteBall { .. })));
    }

    #[test]
    fn dangling_owner_is_reported() {
        let mut state = test_state();
        state.owner = Some(PlayerId(99));
        assert!(matches!(state.check_finite(), Err(TickError::DanglingHandle { id: 99, .. })));
    }

    #[test]
    fn hud_reports_possession_side() {
        let mut state = test_state();
        state.owner = Some(PlayerId(7));
        let hud = state.hud_frame();
        assert_eq!(hud.possession, Some(Side::Away));
        assert_eq!(hud.owner_id, Some(7));
    }
}
