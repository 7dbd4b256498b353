//! Arcade soccer match server library.
//!
//! This module exposes the simulation and server components for use in tests and binaries.

pub mod ai;
pub mod animation;
pub mod ball;
pub mod camera;
pub mod config;
pub mod error;
pub mod formation;
pub mod game_loop;
pub mod interaction;
pub mod match_flow;
pub mod physics;
pub mod player;
pub mod protocol;
pub mod session;
pub mod state;
pub mod ws;

pub use soccer_shared::vec3;
