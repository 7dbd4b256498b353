/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate_hz: u32,
    /// Frame snapshots sent to the renderer per second
    pub frame_rate_hz: u32,
    /// Upper bound on a single tick's real elapsed time (seconds)
    pub max_frame_dt: f64,
    pub rng_seed: u64,
    /// Concurrent match sessions (one per connection)
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9001".to_string(),
            tick_rate_hz: 60,
            frame_rate_hz: 30,
            max_frame_dt: 0.1,
            rng_seed: 42,
            max_sessions: 64,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_rate_hz == 0 {
            return Err("tick_rate_hz must be > 0".to_string());
        }
        if self.frame_rate_hz == 0 || self.frame_rate_hz > self.tick_rate_hz {
            return Err("frame_rate_hz must be in 1..=tick_rate_hz".to_string());
        }
        if !self.max_frame_dt.is_finite() || self.max_frame_dt <= 0.0 {
            return Err("max_frame_dt must be finite and > 0".to_string());
        }
        if self.max_sessions == 0 {
            return Err("max_sessions must be > 0".to_string());
        }
        Ok(())
    }

    /// Ticks between two frame snapshots.
    pub fn frame_every_n_ticks(&self) -> u64 {
        (self.tick_rate_hz / self.frame_rate_hz).max(1) as u64
    }
}
