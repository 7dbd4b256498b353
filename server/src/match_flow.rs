//! Match phase controller: which systems run each frame and which phase
//! changes are allowed.

use crate::error::FlowError;
use crate::player::Player;
use crate::vec3::{self, Vec3};
use soccer_shared::config::GameMode;
use soccer_shared::protocol::{MatchPhase, Side};
use tracing::debug;

/// Walk-out speed during the entrance
const ENTRANCE_SPEED: f64 = 5.0;
const ENTRANCE_ARRIVAL: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct MatchStateMachine {
    phase: MatchPhase,
    /// Seconds left of a goal celebration
    celebration: Option<f64>,
    paused: bool,
    /// Full time reached; nothing moves until quit
    ended: bool,
    quit: bool,
}

impl Default for MatchStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchStateMachine {
    pub fn new() -> Self {
        Self {
            phase: MatchPhase::Menu,
            celebration: None,
            paused: false,
            ended: false,
            quit: false,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    fn is_legal(from: MatchPhase, to: MatchPhase) -> bool {
        use MatchPhase::*;
        match (from, to) {
            (_, Menu) => true,
            (Menu, Entrance) | (Menu, Kickoff) => true,
            (Entrance, Kickoff) => true,
            (Kickoff, Playing) => true,
            (Playing, Kickoff) => true,
            (Playing, Corner) | (Playing, GoalKick) | (Playing, ThrowIn) => true,
            (from, Playing) => from.is_set_piece(),
            _ => false,
        }
    }

    /// Move to `to` if the table allows it. Returns the phase left behind.
    pub fn transition(&mut self, to: MatchPhase) -> Result<MatchPhase, FlowError> {
        if self.quit {
            return Err(FlowError::Ended);
        }
        if self.ended && to != MatchPhase::Menu {
            return Err(FlowError::Ended);
        }
        let from = self.phase;
        if !Self::is_legal(from, to) {
            return Err(FlowError::IllegalTransition { from, to });
        }
        debug!("Phase {:?} -> {:?}", from, to);
        self.phase = to;
        Ok(from)
    }

    /// Leave the menu: matches walk out first, training kicks off at once.
    pub fn start(&mut self, mode: GameMode) -> Result<MatchPhase, FlowError> {
        let to = match mode {
            GameMode::Match => MatchPhase::Entrance,
            GameMode::Training => MatchPhase::Kickoff,
        };
        self.transition(to)?;
        Ok(to)
    }

    /// Training drills jump straight into a set piece from any live phase.
    pub fn enter_drill(&mut self, to: MatchPhase) -> Result<MatchPhase, FlowError> {
        let from = self.phase;
        let drill = matches!(to, MatchPhase::FreeKick | MatchPhase::Corner | MatchPhase::Penalty);
        let live = matches!(from, MatchPhase::Kickoff | MatchPhase::Playing) || from.is_set_piece();
        if self.quit || self.ended {
            return Err(FlowError::Ended);
        }
        if !drill || !live {
            return Err(FlowError::IllegalTransition { from, to });
        }
        debug!("Drill {:?} -> {:?}", from, to);
        self.phase = to;
        self.celebration = None;
        Ok(from)
    }

    pub fn begin_celebration(&mut self, seconds: f64) {
        self.celebration = Some(seconds);
    }

    pub fn celebrating(&self) -> bool {
        self.celebration.is_some()
    }

    /// Count the celebration down. Returns true on the tick it finishes.
    pub fn tick_celebration(&mut self, dt: f64) -> bool {
        match self.celebration.as_mut() {
            Some(left) => {
                *left -= dt;
                if *left <= 0.0 {
                    self.celebration = None;
                    return true;
                }
                false
            }
            None => false,
        }
    }

    /// Ball is in play: boundaries are classified and AI may touch it.
    pub fn ball_live(&self) -> bool {
        self.phase == MatchPhase::Playing && !self.celebrating() && !self.ended && !self.quit
    }

    /// The controlled player takes input.
    pub fn interaction_active(&self) -> bool {
        let phase_ok = matches!(self.phase, MatchPhase::Kickoff | MatchPhase::Playing) || self.phase.is_set_piece();
        phase_ok && !self.celebrating() && !self.ended && !self.quit
    }

    /// Pausing is refused in the menu. Returns the new paused state.
    pub fn toggle_pause(&mut self) -> bool {
        if self.phase != MatchPhase::Menu && !self.quit {
            self.paused = !self.paused;
        }
        self.paused
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn finish(&mut self) {
        self.ended = true;
        self.celebration = None;
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    /// Back to the menu for good.
    pub fn quit(&mut self) {
        self.phase = MatchPhase::Menu;
        self.paused = false;
        self.celebration = None;
        self.quit = true;
    }

    pub fn is_quit(&self) -> bool {
        self.quit
    }
}

/// Walk field players from the tunnel to their slots.
/// Returns true once every field player has arrived.
pub fn advance_entrance(players: &mut [Player], dt: f64) -> bool {
    let mut all_arrived = true;
    for p in players.iter_mut().filter(|p| !p.is_goalkeeper()) {
        let to_slot = vec3::flat(p.home_pos - p.pos);
        if vec3::length(to_slot) > ENTRANCE_ARRIVAL {
            all_arrived = false;
            let dir = vec3::normalize(to_slot);
            p.pos += dir * (ENTRANCE_SPEED * dt);
            p.velocity = dir * ENTRANCE_SPEED;
            p.face(dir);
        } else {
            p.velocity = Vec3::ZERO;
            let ahead = match p.side {
                Side::Home => -50.0,
                Side::Away => 50.0,
            };
            p.look_at(Vec3::new(0.0, 0.0, ahead));
        }
    }
    all_arrived
}
