use crate::config::ServerConfig;
use crate::protocol::{FrameMsg, InputState, ScenarioSpot, TrainingSetPiece, UiEvent};
use crate::session::MatchSession;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Commands from the client connection to its match loop
#[derive(Debug)]
pub enum SessionCommand {
    Input(InputState),
    TrainingScenario {
        kind: TrainingSetPiece,
        spot: ScenarioSpot,
    },
    TogglePause,
    Quit,
}

/// Output from the match loop back to the connection
#[derive(Debug, Clone)]
pub enum SessionOutput {
    Frame(Box<FrameMsg>),
    Event(UiEvent),
    /// Simulation hit an unrecoverable state and stopped
    Halted(String),
}

/// Run one match. Owns the session until quit, halt or disconnect.
pub async fn run_session(
    mut session: MatchSession,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    out_tx: mpsc::Sender<SessionOutput>,
    server_config: ServerConfig,
    session_id: u64,
) {
    let tick_duration = Duration::from_secs_f64(1.0 / server_config.tick_rate_hz as f64);
    let frame_every_n = server_config.frame_every_n_ticks();
    let mut tick_count: u64 = 0;
    let mut last_tick = Instant::now();

    let mut tick_interval = tokio::time::interval(tick_duration);
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let now = Instant::now();
                let real_dt = now.duration_since(last_tick).as_secs_f64();
                last_tick = now;

                if let Err(e) = session.tick(real_dt) {
                    tracing::error!("Session {} halted: {}", session_id, e);
                    let _ = out_tx.send(SessionOutput::Halted(e.to_string())).await;
                    break;
                }

                for event in session.drain_events() {
                    if out_tx.send(SessionOutput::Event(event)).await.is_err() {
                        return;
                    }
                }

                // Frames at a lower rate than ticks
                tick_count += 1;
                if tick_count % frame_every_n == 0 {
                    // Renderer lagging behind: drop the frame, the next one supersedes it
                    match out_tx.try_send(SessionOutput::Frame(Box::new(session.frame_msg()))) {
                        Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Input(input)) => session.set_input(input),
                    Some(SessionCommand::TrainingScenario { kind, spot }) => {
                        if let Err(e) = session.set_training_scenario(kind, spot) {
                            tracing::warn!("Session {} rejected drill {:?}: {}", session_id, kind, e);
                        }
                    }
                    Some(SessionCommand::TogglePause) => {
                        let paused = session.toggle_pause();
                        tracing::debug!("Session {} paused: {}", session_id, paused);
                        // Keep the HUD in step while frozen
                        let _ = out_tx.try_send(SessionOutput::Frame(Box::new(session.frame_msg())));
                    }
                    Some(SessionCommand::Quit) | None => {
                        session.quit();
                        break;
                    }
                }
            }
        }
    }

    let hud = session.hud_frame();
    tracing::info!(
        "Session {} ended at {}-{} ({:?})",
        session_id,
        hud.home_score,
        hud.away_score,
        hud.phase
    );
}
