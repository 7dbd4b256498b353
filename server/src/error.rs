use soccer_shared::protocol::MatchPhase;
use thiserror::Error;

/// Session could not be started.
#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("Invalid match configuration: {0}")]
    InvalidConfig(String),

    #[error("Team {team} has no players for the formation")]
    EmptyRoster { team: String },

    #[error("Server is full ({max} concurrent matches)")]
    NoSlot { max: usize },

    #[error("Match already started")]
    AlreadyStarted,
}

/// A tick hit state it cannot continue from. The session halts.
#[derive(Error, Debug, PartialEq)]
pub enum TickError {
    #[error("Ball state is not finite: pos {pos:?} vel {vel:?}")]
    NonFiniteBall { pos: [f64; 3], vel: [f64; 3] },

    #[error("Player {id} state is not finite")]
    NonFinitePlayer { id: u32 },

    #[error("Player handle {id} does not exist (roster size {len})")]
    DanglingHandle { id: u32, len: usize },

    #[error(transparent)]
    Flow(#[from] FlowError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FlowError {
    #[error("Illegal phase transition {from:?} -> {to:?}")]
    IllegalTransition { from: MatchPhase, to: MatchPhase },

    #[error("Match has ended")]
    Ended,
}
