mod assets;

use std::{
    convert::Infallible,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::{
    net::TcpListener,
    sync::{broadcast, mpsc},
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{error, info, warn};

use crate::{
    engine::{EngineBuilder, EngineSettings},
    geometry::{Rect, WorldPoint},
    map::GridMap,
    presentation::{cursor_hint, AnimationCatalog, AnimationClip, AnimationKey, CursorHint},
    scenario::Scenario,
    world::{Command, MapSnapshot, WorldSnapshot},
};

#[derive(Clone, Serialize)]
pub struct UiFrame {
    pub snapshot: WorldSnapshot,
    pub completed: bool,
}

#[derive(Clone, Serialize)]
pub struct StateEnvelope {
    pub scenario: String,
    pub total_ticks: Option<u64>,
    pub frame: Option<UiFrame>,
    pub completed: bool,
}

#[derive(Clone)]
struct AppState {
    broadcaster: broadcast::Sender<String>,
    latest_frame: Arc<Mutex<Option<UiFrame>>>,
    commands: mpsc::UnboundedSender<Command>,
    grid: Arc<GridMap>,
    map: Arc<MapSnapshot>,
    animations: Arc<Vec<AnimationClip>>,
    total_ticks: Option<u64>,
    scenario_name: String,
    simulation_done: Arc<AtomicBool>,
}

pub struct WebServerConfig {
    pub scenario: Scenario,
    /// Stop stepping after this many ticks. `None` keeps the world running
    /// until the server shuts down.
    pub ticks: Option<u64>,
    pub snapshot_interval: u64,
    pub snapshot_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        scenario,
        ticks,
        snapshot_interval,
        snapshot_dir,
        host,
        port,
    } = config;

    let catalog = AnimationCatalog::villager()
        .validate(assets::animation_ids())
        .context("viewer sprite manifest is incomplete")?;
    let animations: Vec<AnimationClip> = AnimationKey::all()
        .filter_map(|key| catalog.clip(key).cloned())
        .collect();

    let scenario_name = scenario.name.clone();
    let mut world = scenario
        .build_world()
        .with_context(|| format!("failed to build world for '{scenario_name}'"))?;
    let grid = Arc::new(world.grid().clone());
    let map = Arc::new(world.map_snapshot());
    let pace = Duration::from_secs_f32(world.dt_ms() / 1000.0);

    let settings = EngineSettings {
        scenario_name: scenario_name.clone(),
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir,
    };
    let mut engine = EngineBuilder::new(settings).with_default_systems().build();

    let (tx, _) = broadcast::channel::<String>(512);
    let (command_tx, mut command_rx) = mpsc::unbounded_channel::<Command>();
    let latest_frame: Arc<Mutex<Option<UiFrame>>> = Arc::new(Mutex::new(None));
    let simulation_done = Arc::new(AtomicBool::new(false));
    let shutting_down = Arc::new(AtomicBool::new(false));

    let latest_for_sim = latest_frame.clone();
    let done_for_sim = simulation_done.clone();
    let tx_for_sim = tx.clone();
    let stop_for_sim = shutting_down.clone();
    let scenario_label = scenario_name.clone();

    let sim_handle = tokio::task::spawn_blocking(move || -> Result<()> {
        let publish = |frame: UiFrame| {
            if let Ok(payload) = serde_json::to_string(&frame) {
                let _ = tx_for_sim.send(payload);
            }
            let mut guard = latest_for_sim.lock().expect("latest frame lock poisoned");
            *guard = Some(frame);
        };

        let mut tick = 0_u64;
        while keep_stepping(tick, ticks, &stop_for_sim) {
            let started = Instant::now();
            while let Ok(command) = command_rx.try_recv() {
                world.queue(command);
            }
            engine.step(&mut world)?;
            publish(UiFrame {
                snapshot: world.snapshot(engine.scenario_name()),
                completed: ticks == Some(tick + 1),
            });
            tick += 1;
            if let Some(rest) = pace.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }

        done_for_sim.store(true, Ordering::SeqCst);
        Ok(())
    });

    let state = Arc::new(AppState {
        broadcaster: tx.clone(),
        latest_frame: latest_frame.clone(),
        commands: command_tx,
        grid,
        map,
        animations: Arc::new(animations),
        total_ticks: ticks,
        scenario_name: scenario_label.clone(),
        simulation_done: simulation_done.clone(),
    });

    tokio::spawn(async move {
        match sim_handle.await {
            Ok(Ok(())) => info!(scenario = %scenario_label, "simulation completed"),
            Ok(Err(err)) => error!(error = ?err, "simulation error"),
            Err(err) => error!(error = ?err, "simulation task failed"),
        }
    });

    let router = Router::new()
        .route("/", get(index))
        .route("/styles.css", get(styles))
        .route("/app.js", get(script))
        .route("/api/map", get(map_layout))
        .route("/api/animations", get(animation_clips))
        .route("/api/state", get(latest_state))
        .route("/api/cursor", get(cursor))
        .route("/api/events", get(stream_events))
        .route("/api/select", post(select))
        .route("/api/order", post(order))
        .with_state(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("homestead viewer live at http://{addr} (Ctrl+C to stop)");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    shutting_down.store(true, Ordering::SeqCst);

    Ok(())
}

/// The viewer steps until `limit` ticks have run, or forever without one,
/// and always stops once the server is shutting down.
fn keep_stepping(tick: u64, limit: Option<u64>, stop: &AtomicBool) -> bool {
    !stop.load(Ordering::SeqCst) && limit.map_or(true, |limit| tick < limit)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down viewer");
}

async fn index() -> Html<&'static str> {
    Html(assets::INDEX_HTML)
}

async fn styles() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        Bytes::from_static(assets::STYLES_CSS.as_bytes()),
    )
}

async fn script() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        Bytes::from_static(assets::APP_JS.as_bytes()),
    )
}

async fn map_layout(State(state): State<Arc<AppState>>) -> Json<MapSnapshot> {
    Json(state.map.as_ref().clone())
}

async fn animation_clips(State(state): State<Arc<AppState>>) -> Json<Vec<AnimationClip>> {
    Json(state.animations.as_ref().clone())
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateEnvelope> {
    let frame = state
        .latest_frame
        .lock()
        .expect("latest frame lock poisoned")
        .clone();
    Json(StateEnvelope {
        scenario: state.scenario_name.clone(),
        total_ticks: state.total_ticks,
        frame,
        completed: state.simulation_done.load(Ordering::SeqCst),
    })
}

#[derive(Deserialize)]
struct PointQuery {
    x: f32,
    y: f32,
}

#[derive(Serialize)]
struct CursorResponse {
    cursor: CursorHint,
}

async fn cursor(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PointQuery>,
) -> Json<CursorResponse> {
    let has_selection = state
        .latest_frame
        .lock()
        .expect("latest frame lock poisoned")
        .as_ref()
        .is_some_and(|frame| !frame.snapshot.selection.is_empty());
    let point = WorldPoint::new(query.x, query.y);
    Json(CursorResponse {
        cursor: cursor_hint(&state.grid, point, has_selection),
    })
}

/// A click selects at a point; a drag selects everything in its box.
#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum SelectRequest {
    Point { x: f32, y: f32 },
    Rect { x0: f32, y0: f32, x1: f32, y1: f32 },
}

async fn select(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> StatusCode {
    let command = match request {
        SelectRequest::Point { x, y } => Command::SelectAt(WorldPoint::new(x, y)),
        SelectRequest::Rect { x0, y0, x1, y1 } => Command::SelectInRect(Rect::from_corners(
            WorldPoint::new(x0, y0),
            WorldPoint::new(x1, y1),
        )),
    };
    forward(&state, command)
}

async fn order(
    State(state): State<Arc<AppState>>,
    Json(point): Json<PointQuery>,
) -> StatusCode {
    forward(&state, Command::OrderAt(WorldPoint::new(point.x, point.y)))
}

fn forward(state: &AppState, command: Command) -> StatusCode {
    match state.commands.send(command) {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => {
            warn!("command dropped, simulation has stopped");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_viewer_runs_until_shutdown() {
        let stop = AtomicBool::new(false);
        assert!(keep_stepping(0, None, &stop));
        assert!(keep_stepping(1_000_000, None, &stop));
        stop.store(true, Ordering::SeqCst);
        assert!(!keep_stepping(0, None, &stop));
    }

    #[test]
    fn tick_limit_still_applies_when_given() {
        let stop = AtomicBool::new(false);
        assert!(keep_stepping(1199, Some(1200), &stop));
        assert!(!keep_stepping(1200, Some(1200), &stop));
    }
}
