use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::game_loop::{run_session, SessionCommand, SessionOutput};
use crate::protocol::{ClientMsg, ErrorMsg, EventMsg, HaltedMsg, ServerMsg, WelcomeMsg, PROTOCOL_VERSION};
use crate::session::MatchSession;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    /// One permit per running match
    pub sessions: Arc<Semaphore>,
    pub next_session_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            sessions: Arc::new(Semaphore::new(config.max_sessions)),
            next_session_id: Arc::new(AtomicU64::new(1)),
            config,
        }
    }
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

type Sink = SplitSink<WebSocket, Message>;

async fn send_msg(sink: &mut Sink, msg: &ServerMsg) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            false
        }
    }
}

async fn send_error(sink: &mut Sink, message: String) -> bool {
    send_msg(sink, &ServerMsg::Error(ErrorMsg { message })).await
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();

    // Nothing runs until the client picks its match settings
    let settings = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(ClientMsg::Start { settings }) => break settings,
                Ok(other) => {
                    tracing::debug!("Ignoring {:?} before start", other);
                }
                Err(e) => {
                    if !send_error(&mut sink, format!("Malformed message: {}", e)).await {
                        return;
                    }
                }
            },
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
            _ => {} // Ignore ping/pong/binary
        }
    };

    let permit = match app_state.sessions.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            let err = SessionError::NoSlot {
                max: app_state.config.max_sessions,
            };
            tracing::warn!("{}", err);
            send_error(&mut sink, err.to_string()).await;
            return;
        }
    };

    let session_id = app_state.next_session_id.fetch_add(1, Ordering::Relaxed);
    let seed = app_state.config.rng_seed.wrapping_add(session_id);
    let mut session = match MatchSession::from_settings(&settings, seed, app_state.config.max_frame_dt) {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Session {} refused: {}", session_id, e);
            send_error(&mut sink, e.to_string()).await;
            return;
        }
    };
    if let Err(e) = session.start() {
        send_error(&mut sink, e.to_string()).await;
        return;
    }

    let welcome = ServerMsg::Welcome(WelcomeMsg {
        protocol_version: PROTOCOL_VERSION,
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        config: session.state().config.clone(),
    });
    if !send_msg(&mut sink, &welcome).await {
        return;
    }
    tracing::info!("Session {} started (seed {})", session_id, seed);

    let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(64);
    let (out_tx, mut out_rx) = mpsc::channel::<SessionOutput>(256);
    let config = app_state.config.clone();
    tokio::spawn(async move {
        run_session(session, cmd_rx, out_tx, config, session_id).await;
        drop(permit);
    });

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let cmd = match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(ClientMsg::Input(input)) => Some(SessionCommand::Input(input)),
                            Ok(ClientMsg::TrainingScenario { kind, spot }) => {
                                Some(SessionCommand::TrainingScenario { kind, spot })
                            }
                            Ok(ClientMsg::TogglePause) => Some(SessionCommand::TogglePause),
                            Ok(ClientMsg::Quit) => Some(SessionCommand::Quit),
                            Ok(ClientMsg::Start { .. }) => {
                                if !send_error(&mut sink, SessionError::AlreadyStarted.to_string()).await {
                                    break;
                                }
                                None
                            }
                            Err(e) => {
                                tracing::debug!("Session {} sent malformed message: {}", session_id, e);
                                None
                            }
                        };
                        if let Some(cmd) = cmd {
                            if cmd_tx.send(cmd).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client
            out = out_rx.recv() => {
                let msg = match out {
                    Some(SessionOutput::Frame(frame)) => ServerMsg::Frame(*frame),
                    Some(SessionOutput::Event(event)) => ServerMsg::Event(EventMsg { event }),
                    Some(SessionOutput::Halted(reason)) => {
                        send_msg(&mut sink, &ServerMsg::Halted(HaltedMsg { reason })).await;
                        break;
                    }
                    // Match loop finished (quit)
                    None => break,
                };
                if !send_msg(&mut sink, &msg).await {
                    break;
                }
            }
        }
    }

    // Dropping the command channel stops the match loop
    drop(cmd_tx);
    tracing::info!("Session {} disconnected", session_id);
}
