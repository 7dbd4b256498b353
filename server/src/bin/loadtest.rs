//! Load test for the soccer server.
//!
//! Spawns multiple fake WebSocket clients that:
//! - Connect and start a match each
//! - Mash random inputs at a fixed rate
//! - Receive and count frames and events
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 32)
//!   --duration S     Test duration in seconds (default: 30)
//!   --input-rate R   Input messages per second per client (default: 20)
//!   --training       Start training sessions instead of matches
//!   --url URL        Server URL (default: ws://127.0.0.1:9001/ws)

use futures_util::{SinkExt, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use soccer_shared::config::{GameMode, MatchSettings};
use soccer_shared::protocol::{ClientMsg, InputState, ServerMsg, UiEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    frames_received: AtomicU64,
    events_received: AtomicU64,
    goals_seen: AtomicU64,
    inputs_sent: AtomicU64,
    halted: AtomicU64,
    errors: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

fn random_input(rng: &mut impl Rng) -> InputState {
    InputState {
        up: rng.gen_bool(0.6),
        down: rng.gen_bool(0.1),
        left: rng.gen_bool(0.2),
        right: rng.gen_bool(0.2),
        sprint: rng.gen_bool(0.3),
        shoot: rng.gen_bool(0.1),
        pass: rng.gen_bool(0.05),
        through: rng.gen_bool(0.02),
        switch: rng.gen_bool(0.01),
    }
}

fn encode(msg: &ClientMsg) -> Option<Message> {
    serde_json::to_string(msg).ok().map(|json| Message::Text(json.into()))
}

// === Client task ===

async fn run_client(
    client_id: u32,
    url: String,
    input_rate: f64,
    mode: GameMode,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let settings = MatchSettings {
        mode,
        home_team: client_id as usize % 6,
        away_team: (client_id as usize + 1) % 6,
        ..MatchSettings::default()
    };
    let Some(start) = encode(&ClientMsg::Start { settings }) else {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        return;
    };
    if ws.send(start).await.is_err() {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        return;
    }

    // Wait for welcome message before doing anything else
    let welcome = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                    match serde_json::from_str::<ServerMsg>(&text) {
                        Ok(ServerMsg::Welcome(_)) => return true,
                        Ok(ServerMsg::Error(e)) => {
                            if client_id < 5 {
                                eprintln!("Client {} refused: {}", client_id, e.message);
                            }
                            return false;
                        }
                        _ => {}
                    }
                }
                Ok(Message::Close(_)) | Err(_) => return false,
                _ => {}
            }
        }
        false
    })
    .await;

    if !matches!(welcome, Ok(true)) {
        if client_id < 3 {
            eprintln!("Client {} never got a welcome", client_id);
        }
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        return;
    }

    let connect_latency = connect_start.elapsed();
    metrics
        .latency_sum_ms
        .fetch_add(connect_latency.as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let input_interval = Duration::from_secs_f64(1.0 / input_rate.max(0.1));
    let mut input_timer = tokio::time::interval(input_interval);
    input_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let test_end = Instant::now() + duration;
    let mut rng = ChaCha8Rng::seed_from_u64(client_id as u64 * 12345 + 67890);

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = input_timer.tick() => {
                let Some(msg) = encode(&ClientMsg::Input(random_input(&mut rng))) else {
                    continue;
                };
                if ws.send(msg).await.is_ok() {
                    metrics.inputs_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::Frame(_)) => {
                                metrics.frames_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::Event(e)) => {
                                metrics.events_received.fetch_add(1, Ordering::Relaxed);
                                if matches!(e.event, UiEvent::ScoreChanged { home, away } if home + away > 0) {
                                    metrics.goals_seen.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                            Ok(ServerMsg::Halted(h)) => {
                                eprintln!("Client {} session halted: {}", client_id, h.reason);
                                metrics.halted.fetch_add(1, Ordering::Relaxed);
                                break;
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(_) => {}
                }
            }
        }
    }

    if let Some(quit) = encode(&ClientMsg::Quit) {
        let _ = ws.send(quit).await;
    }
    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 32;
    let mut duration_secs: u64 = 30;
    let mut input_rate: f64 = 20.0;
    let mut mode = GameMode::Match;
    let mut url = "ws://127.0.0.1:9001/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(32);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--input-rate" => {
                i += 1;
                input_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(20.0);
            }
            "--training" => mode = GameMode::Training,
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Soccer Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Input rate: {}/s per client", input_rate);
    println!("Mode: {:?}", mode);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_clients as usize);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);

        handles.push(tokio::spawn(async move {
            run_client(client_id, url, input_rate, mode, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 16 == 15 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }
            println!(
                "[{:3}s] connected={}, frames={}, events={}, goals={}, inputs={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.frames_received.load(Ordering::Relaxed),
                metrics_clone.events_received.load(Ordering::Relaxed),
                metrics_clone.goals_seen.load(Ordering::Relaxed),
                metrics_clone.inputs_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }
    stats_handle.abort();

    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let frames = metrics.frames_received.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Total frames: {}", frames);
    println!("Total events: {}", metrics.events_received.load(Ordering::Relaxed));
    println!("Total goals: {}", metrics.goals_seen.load(Ordering::Relaxed));
    println!("Total inputs sent: {}", metrics.inputs_sent.load(Ordering::Relaxed));
    println!("Halted sessions: {}", metrics.halted.load(Ordering::Relaxed));
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));
    if latency_count > 0 {
        println!("Average start latency: {}ms", latency_sum / latency_count);
    }

    let frames_per_client = frames as f64 / num_clients.max(1) as f64;
    // 30 Hz frame stream per session
    let expected = duration_secs as f64 * 30.0;
    println!();
    println!("Messages/sec (total): {:.0}", msgs as f64 / duration_secs.max(1) as f64);
    println!("Frames per client: {:.1} (expected {:.1})", frames_per_client, expected);
    println!("Delivery rate: {:.1}%", frames_per_client / expected * 100.0);
}
