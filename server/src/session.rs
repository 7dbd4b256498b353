//! One match from start to quit. Owns all simulation state and advances it
//! in a fixed order each tick: clock, physics, AI, input, animation, camera.

use crate::ai::{self, AiAction, AiContext};
use crate::animation::AnimationController;
use crate::camera::{self, CameraRig};
use crate::error::{FlowError, SessionError, TickError};
use crate::formation;
use crate::interaction;
use crate::match_flow::advance_entrance;
use crate::physics::{BoundaryContext, BoundaryEvent, PhysicsIntegrator};
use crate::player::PlayerId;
use crate::protocol::{ball_wire, camera_wire, player_wire};
use crate::state::GameState;
use crate::vec3::{self, Vec3};
use soccer_shared::config::{CameraMode, GameMode, MatchConfig, MatchSettings, TrainingKind};
use soccer_shared::protocol::{
    FrameMsg, HudFrame, InputState, MatchPhase, ScenarioSpot, SoundCue, TrainingSetPiece, UiEvent,
};
use tracing::{debug, info};

const SLOW_MO_SCALE: f64 = 0.2;
/// Real seconds of slow motion after a save
const SLOW_MO_SECONDS: f64 = 1.2;
const POST_SHAKE: f64 = 0.3;
/// An AI carrier further than this many control distances from the ball loses it
const AI_CONTROL_SLACK: f64 = 1.5;

const SAVE_DAMPING: f64 = -0.8;
const SAVE_POP: f64 = 5.0;
/// Slow-motion remainder below this counts as spent.
const SLOW_MO_EPSILON: f64 = 1e-9;

/// Turns real frame time into simulated time.
#[derive(Debug, Clone)]
pub struct FrameClock {
    max_dt: f64,
    speed: f64,
    slow_mo: f64,
}

impl FrameClock {
    pub fn new(max_dt: f64, speed: f64) -> Self {
        Self {
            max_dt,
            speed,
            slow_mo: 0.0,
        }
    }

    pub fn trigger_slow_mo(&mut self) {
        self.slow_mo = SLOW_MO_SECONDS;
    }

    pub fn slow_mo_remaining(&self) -> f64 {
        self.slow_mo
    }

    /// Returns (clamped real dt, simulated dt). Slow motion runs down in real time.
    pub fn advance(&mut self, real_dt: f64) -> (f64, f64) {
        let real = if real_dt.is_finite() {
            real_dt.clamp(0.0, self.max_dt)
        } else {
            0.0
        };
        let mut dt = real * self.speed;
        if self.slow_mo > 0.0 {
            dt *= SLOW_MO_SCALE;
            self.slow_mo -= real;
            if self.slow_mo < SLOW_MO_EPSILON {
                self.slow_mo = 0.0;
            }
        }
        (real, dt)
    }
}

/// Where a training drill puts the ball.
pub fn scenario_spot(kind: TrainingSetPiece, spot: ScenarioSpot, config: &MatchConfig) -> Vec3 {
    let hw = config.field.half_width();
    let hl = config.field.half_length();
    match kind {
        TrainingSetPiece::FreeKick => match spot {
            ScenarioSpot::Left => Vec3::new(-20.0, 0.0, -25.0),
            ScenarioSpot::Right => Vec3::new(20.0, 0.0, -25.0),
            ScenarioSpot::Center => Vec3::new(0.0, 0.0, -25.0),
            ScenarioSpot::Close => Vec3::new(0.0, 0.0, -20.0),
            ScenarioSpot::Default => Vec3::new(0.0, 0.0, -30.0),
        },
        TrainingSetPiece::Corner => {
            let x = if spot == ScenarioSpot::Left { -hw } else { hw };
            Vec3::new(x, 0.0, -hl)
        }
        // Penalty spot, 11 units out from the away goal
        TrainingSetPiece::Penalty => Vec3::new(0.0, 0.0, -hl + 11.0),
    }
}

fn drill_phase(kind: TrainingSetPiece) -> MatchPhase {
    match kind {
        TrainingSetPiece::FreeKick => MatchPhase::FreeKick,
        TrainingSetPiece::Corner => MatchPhase::Corner,
        TrainingSetPiece::Penalty => MatchPhase::Penalty,
    }
}

pub struct MatchSession {
    state: GameState,
    physics: PhysicsIntegrator,
    animation: AnimationController,
    camera: CameraRig,
    clock: FrameClock,
    input: InputState,
    started: bool,
}

impl MatchSession {
    pub fn new(config: MatchConfig, seed: u64, max_frame_dt: f64) -> Result<Self, SessionError> {
        let state = GameState::new(config, seed)?;
        let config = &state.config;
        Ok(Self {
            physics: PhysicsIntegrator::new(config.field, config.physics),
            animation: AnimationController::new(config.animation),
            camera: CameraRig::new(config.camera_mode),
            clock: FrameClock::new(max_frame_dt, config.game_speed),
            input: InputState::default(),
            started: false,
            state,
        })
    }

    /// Build from the client's menu choices.
    pub fn from_settings(settings: &MatchSettings, seed: u64, max_frame_dt: f64) -> Result<Self, SessionError> {
        let config = MatchConfig::from_settings(settings).map_err(SessionError::InvalidConfig)?;
        Self::new(config, seed, max_frame_dt)
    }

    /// Leave the menu. Matches walk out of the tunnel first.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }
        let state = &mut self.state;
        let phase = state
            .flow
            .start(state.mode)
            .map_err(|_| SessionError::AlreadyStarted)?;
        self.started = true;
        info!(
            "Match started: {} vs {} ({:?})",
            state.config.home_team.name, state.config.away_team.name, state.mode
        );

        if phase == MatchPhase::Entrance {
            formation::move_to_tunnel(&mut state.players, &state.config.field);
        }
        state.push_event(UiEvent::ScoreChanged { home: 0, away: 0 });

        let drills = state.mode == GameMode::Training && state.config.training == TrainingKind::SetPiece;
        state.push_event(UiEvent::SetPieceMenu { visible: drills });
        if drills {
            self.set_training_scenario(TrainingSetPiece::FreeKick, ScenarioSpot::Default)
                .map_err(|e| SessionError::InvalidConfig(e.to_string()))?;
        }
        Ok(())
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Level-triggered input for the next tick.
    pub fn set_input(&mut self, input: InputState) {
        self.input = input;
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.state.flow.toggle_pause()
    }

    pub fn quit(&mut self) {
        info!("Match quit at {}-{}", self.state.home_score, self.state.away_score);
        self.state.flow.quit();
        self.state.pending_kick = None;
    }

    pub fn is_quit(&self) -> bool {
        self.state.flow.is_quit()
    }

    pub fn set_camera_mode(&mut self, mode: CameraMode) {
        self.state.camera_mode = mode;
        self.camera.set_mode(mode);
    }

    /// Stage a training drill. Refused outside training and outside live phases.
    pub fn set_training_scenario(&mut self, kind: TrainingSetPiece, spot: ScenarioSpot) -> Result<(), FlowError> {
        let to = drill_phase(kind);
        if self.state.mode != GameMode::Training {
            return Err(FlowError::IllegalTransition {
                from: self.state.phase(),
                to,
            });
        }
        self.state.flow.enter_drill(to)?;
        let spot = scenario_spot(kind, spot, &self.state.config);
        self.state.place_set_piece(spot).map_err(|e| {
            debug!("Drill placement failed: {}", e);
            FlowError::IllegalTransition {
                from: MatchPhase::Playing,
                to,
            }
        })
    }

    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        self.state.drain_events()
    }

    pub fn hud_frame(&self) -> HudFrame {
        self.state.hud_frame()
    }

    pub fn frame_msg(&self) -> FrameMsg {
        let state = &self.state;
        FrameMsg {
            hud: state.hud_frame(),
            ball: ball_wire(&state.ball),
            players: state.players.iter().map(player_wire).collect(),
            camera: camera_wire(&self.camera, state.shake, state.clock),
            aim: state.aim.map(|a| [a.x, 0.1, a.z]),
        }
    }

    /// Advance the match by one frame of real time.
    pub fn tick(&mut self, real_dt: f64) -> Result<(), TickError> {
        let state = &self.state;
        if !self.started || state.flow.is_quit() || state.flow.paused() || state.flow.ended() {
            return Ok(());
        }

        let (real, dt) = self.clock.advance(real_dt);
        self.state.clock += dt;

        interaction::fire_scheduled(&mut self.state, real)?;

        if self.state.phase() == MatchPhase::Entrance {
            self.tick_entrance(dt)?;
        } else {
            if self.tick_match_clock(dt) {
                return Ok(());
            }
            self.tick_celebration(real)?;
            self.tick_physics(dt)?;
            self.tick_ai(dt)?;
            if self.state.flow.interaction_active() {
                let input = self.input;
                interaction::resolve(&mut self.state, &input, self.camera.yaw(), dt)?;
            }
        }

        let time = self.state.clock;
        for p in self.state.players.iter_mut() {
            self.animation.update(p, dt, time);
        }
        self.update_camera(dt)?;
        self.state.shake = camera::decay_shake(self.state.shake, dt);

        self.state.check_finite()
    }

    fn tick_entrance(&mut self, dt: f64) -> Result<(), TickError> {
        if advance_entrance(&mut self.state.players, dt) {
            self.state.flow.transition(MatchPhase::Kickoff)?;
            self.state.sound(SoundCue::Whistle);
            self.state.message("KICK OFF!", None);
        }
        Ok(())
    }

    /// Run the match clock. Returns true once full time is reached.
    fn tick_match_clock(&mut self, dt: f64) -> bool {
        let state = &mut self.state;
        if state.mode != GameMode::Match || !state.flow.ball_live() {
            return false;
        }
        state.time_remaining -= dt;
        if state.time_remaining > 0.0 {
            return false;
        }
        state.time_remaining = 0.0;
        state.flow.finish();
        state.owner = None;
        state.charging = false;
        state.pending_kick = None;
        info!("Full time: {}-{}", state.home_score, state.away_score);
        state.sound(SoundCue::Whistle);
        state.message("FULL TIME", None);
        let (home, away) = (state.home_score, state.away_score);
        state.push_event(UiEvent::FullTime { home, away });
        true
    }

    fn tick_celebration(&mut self, real: f64) -> Result<(), TickError> {
        if self.state.flow.tick_celebration(real) {
            self.state.reset_after_goal();
            self.state.flow.transition(MatchPhase::Kickoff)?;
            self.state.message("KICK OFF!", None);
        }
        Ok(())
    }

    fn tick_physics(&mut self, dt: f64) -> Result<(), TickError> {
        let state = &mut self.state;
        let ctx = state.flow.ball_live().then(|| BoundaryContext {
            last_toucher: state.last_toucher.and_then(|id| state.players.get(id.index())).map(|p| p.side),
        });
        let report = self.physics.step(&mut state.ball, dt, ctx.as_ref());

        if report.post_hit {
            state.shake = state.shake.max(POST_SHAKE);
            state.sound(SoundCue::Kick);
        } else if report.bounced {
            state.sound(SoundCue::Kick);
        }

        match report.event {
            Some(BoundaryEvent::Goal { scorer }) => state.score_goal(scorer),
            Some(event) => {
                if let (Some(phase), Some(spot)) = (event.restart_phase(), event.restart_spot(&state.config.field)) {
                    state.flow.transition(phase)?;
                    state.place_set_piece(spot)?;
                }
            }
            None => {}
        }
        Ok(())
    }

    fn tick_ai(&mut self, dt: f64) -> Result<(), TickError> {
        let state = &mut self.state;
        for p in state.players.iter_mut() {
            p.tick_cooldown();
        }
        if state.flow.celebrating() {
            return Ok(());
        }

        let positions: Vec<Vec3> = state.players.iter().map(|p| p.pos).collect();
        for (p, offset) in state.players.iter_mut().zip(ai::separation_offsets(&positions, dt)) {
            p.pos += offset;
        }

        let owner = state
            .owner
            .and_then(|id| state.players.get(id.index()))
            .map(|p| (p.id, p.side));
        let ball_live = state.flow.ball_live();
        let mut actions: Vec<(PlayerId, AiAction)> = Vec::new();
        for p in state.players.iter_mut() {
            if p.id == state.active {
                continue;
            }
            let ctx = AiContext {
                ball: &state.ball,
                owner,
                ball_live,
                difficulty: state.difficulty,
                config: &state.config,
            };
            if let Some(action) = ai::plan(p, &ctx, dt, &mut state.rng) {
                actions.push((p.id, action));
            }
        }

        if ball_live {
            for (id, action) in actions {
                self.apply_ai_action(id, action, dt)?;
            }
        }

        // AI carriers that run off the ball lose it
        let state = &mut self.state;
        if let Some(owner) = state.owner.filter(|&id| id != state.active) {
            let slack = state.config.gameplay.control_distance * AI_CONTROL_SLACK;
            if vec3::distance(state.player(owner)?.pos, state.ball.pos) > slack {
                state.owner = None;
            }
        }
        Ok(())
    }

    fn apply_ai_action(&mut self, id: PlayerId, action: AiAction, dt: f64) -> Result<(), TickError> {
        let state = &mut self.state;
        match action {
            AiAction::Shoot { power, lift } => {
                if state.owner == Some(id) {
                    debug!("Player {} shoots at {:.1}", id.0, power);
                    state.kick(id, power, lift)?;
                }
            }
            AiAction::Dribble { dir } => {
                if state.owner == Some(id) {
                    let gameplay = state.config.gameplay;
                    state
                        .ball
                        .nudge(dir * (gameplay.dribble_force * dt), Some(gameplay.dribble_max_speed));
                }
            }
            AiAction::Claim => {
                if state.owner.is_none() {
                    state.owner = Some(id);
                    state.last_toucher = Some(id);
                }
            }
            AiAction::Save { .. } => {
                let vel = &mut state.ball.vel;
                vel.x *= SAVE_DAMPING;
                vel.z *= SAVE_DAMPING;
                vel.y += SAVE_POP;
                state.ball.on_ground = false;
                state.owner = None;
                state.last_toucher = Some(id);
                state.sound(SoundCue::Kick);
                state.message("SAVE!", None);
                self.clock.trigger_slow_mo();
            }
        }
        Ok(())
    }

    fn update_camera(&mut self, dt: f64) -> Result<(), TickError> {
        let state = &self.state;
        let active = state.player(state.active)?;
        let focus = if state.owner == Some(state.active) || state.phase() != MatchPhase::Playing {
            active.pos
        } else {
            state.ball.pos
        };
        self.camera.update(focus, state.ball.vel, Some(active), dt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3::vec3;

    const DT: f64 = 1.0 / 60.0;

    fn training() -> MatchSession {
        let config = MatchConfig {
            mode: GameMode::Training,
            ..MatchConfig::default()
        };
        let mut session = MatchSession::new(config, 42, 0.1).unwrap();
        session.start().unwrap();
        session
    }

    #[test]
    fn frame_clock_clamps_and_scales() {
        let mut clock = FrameClock::new(0.1, 2.0);
        assert_eq!(clock.advance(0.5), (0.1, 0.2));
        assert_eq!(clock.advance(-1.0), (0.0, 0.0));
        assert_eq!(clock.advance(f64::NAN), (0.0, 0.0));
    }

    #[test]
    fn slow_mo_runs_down_in_real_time() {
        let mut clock = FrameClock::new(0.1, 1.0);
        clock.trigger_slow_mo();
        let (_, dt) = clock.advance(0.1);
        assert!((dt - 0.02).abs() < 1e-12);
        for _ in 0..11 {
            clock.advance(0.1);
        }
        assert_eq!(clock.slow_mo_remaining(), 0.0);
        assert_eq!(clock.advance(0.1), (0.1, 0.1));
    }

    #[test]
    fn slow_mo_lasts_exactly_twelve_tenths() {
        let mut clock = FrameClock::new(0.1, 1.0);
        clock.trigger_slow_mo();
        let slowed = (0..20)
            .map(|_| clock.advance(0.1).1)
            .filter(|dt| *dt < 0.1 - 1e-12)
            .count();
        assert_eq!(slowed, 12);
    }

    #[test]
    fn nothing_moves_before_start() {
        let mut session = MatchSession::new(MatchConfig::default(), 1, 0.1).unwrap();
        session.state_mut().ball.vel = vec3(5.0, 0.0, 0.0);
        session.tick(DT).unwrap();
        assert_eq!(session.state().ball.pos.x, 0.0);
    }

    #[test]
    fn second_start_is_rejected() {
        let mut session = training();
        assert_eq!(session.start(), Err(SessionError::AlreadyStarted));
    }

    #[test]
    fn match_start_walks_out_of_the_tunnel() {
        let mut session = MatchSession::new(MatchConfig::default(), 1, 0.1).unwrap();
        session.start().unwrap();
        assert_eq!(session.state().phase(), MatchPhase::Entrance);
        let mut ticks = 0;
        while session.state().phase() == MatchPhase::Entrance {
            session.tick(DT).unwrap();
            ticks += 1;
            assert!(ticks < 60 * 60);
        }
        assert_eq!(session.state().phase(), MatchPhase::Kickoff);
        assert!(session
            .drain_events()
            .iter()
            .any(|e| matches!(e, UiEvent::Message { text, .. } if text == "KICK OFF!")));
    }

    #[test]
    fn paused_session_is_frozen() {
        let mut session = training();
        session.state_mut().ball.vel = vec3(5.0, 0.0, 0.0);
        assert!(session.toggle_pause());
        session.tick(DT).unwrap();
        assert_eq!(session.state().ball.pos.x, 0.0);
        assert!(session.hud_frame().paused);
    }

    #[test]
    fn drills_only_in_training() {
        let mut session = MatchSession::new(MatchConfig::default(), 1, 0.1).unwrap();
        session.start().unwrap();
        assert!(session
            .set_training_scenario(TrainingSetPiece::Penalty, ScenarioSpot::Default)
            .is_err());

        let mut session = training();
        session
            .set_training_scenario(TrainingSetPiece::Penalty, ScenarioSpot::Default)
            .unwrap();
        assert_eq!(session.state().phase(), MatchPhase::Penalty);
        assert_eq!(session.state().ball.pos, vec3(0.0, 0.35, -34.0));
    }

    #[test]
    fn set_piece_training_opens_with_free_kick() {
        let config = MatchConfig {
            mode: GameMode::Training,
            training: TrainingKind::SetPiece,
            ..MatchConfig::default()
        };
        let mut session = MatchSession::new(config, 42, 0.1).unwrap();
        session.start().unwrap();
        assert_eq!(session.state().phase(), MatchPhase::FreeKick);
        assert!(session
            .drain_events()
            .contains(&UiEvent::SetPieceMenu { visible: true }));
    }

    #[test]
    fn save_reverses_shot_and_slows_time() {
        let mut session = training();
        session.state_mut().flow.transition(MatchPhase::Playing).unwrap();
        session.apply_ai_action(PlayerId(1), AiAction::Save { dir: 1.0 }, DT).unwrap();
        assert_eq!(session.state().last_toucher, Some(PlayerId(1)));
        assert!(session.clock().slow_mo_remaining() > 0.0);

        let mut session = training();
        session.state_mut().ball.vel = vec3(2.0, 0.0, -20.0);
        session.apply_ai_action(PlayerId(1), AiAction::Save { dir: 1.0 }, DT).unwrap();
        let v = session.state().ball.vel;
        assert!((v.z - 16.0).abs() < 1e-9);
        assert!((v.x + 1.6).abs() < 1e-9);
        assert!((v.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn claim_only_takes_a_loose_ball() {
        let mut session = training();
        session.state_mut().owner = Some(PlayerId(0));
        session.apply_ai_action(PlayerId(1), AiAction::Claim, DT).unwrap();
        assert_eq!(session.state().owner, Some(PlayerId(0)));
        session.state_mut().owner = None;
        session.apply_ai_action(PlayerId(1), AiAction::Claim, DT).unwrap();
        assert_eq!(session.state().owner, Some(PlayerId(1)));
    }

    #[test]
    fn frame_snapshot_lists_every_player() {
        let session = training();
        let frame = session.frame_msg();
        assert_eq!(frame.players.len(), 2);
        assert_eq!(frame.hud.phase, MatchPhase::Kickoff);
        assert!(frame.aim.is_none());
    }

    #[test]
    fn quit_stops_the_simulation() {
        let mut session = training();
        session.quit();
        assert!(session.is_quit());
        session.state_mut().ball.vel = vec3(5.0, 0.0, 0.0);
        session.tick(DT).unwrap();
        assert_eq!(session.state().ball.pos.x, 0.0);
        assert_eq!(session.state().phase(), MatchPhase::Menu);
    }
}
