//! Types shared between the match server and the browser front end.
//!
//! Everything that crosses the wire derives `ts_rs::TS` so the renderer gets
//! generated TypeScript bindings.

pub mod config;
pub mod protocol;
pub mod vec3;
