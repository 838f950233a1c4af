//! Shared application state: the guarded game engine, the connection
//! registry, and the countdown task handle.

pub mod arbiter;
pub mod game;
pub mod scoring;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    registry::TeamRegistry,
    state::{
        arbiter::RoleArbiter,
        game::{GameState, Question, TeamId},
    },
};

/// Cheaply clonable handle to the whole application state.
pub type SharedState = Arc<AppState>;

/// Handle used to push messages to a connected client.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    /// Connection identifier, allocated at upgrade time.
    pub id: Uuid,
    /// Authenticated identity (email).
    pub email: String,
    /// Team the principal belongs to; `None` for admins.
    pub team_id: Option<TeamId>,
    /// Whether the principal is an admin.
    pub is_admin: bool,
    /// Outbound channel drained by the connection's writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// The authoritative game data guarded as one unit.
///
/// State and seats live behind the same mutex so a role check and the
/// mutation it guards are a single atomic step.
#[derive(Debug)]
pub struct GameEngine {
    /// Game state proper (teams, question, lock flag, history, timer data).
    pub state: GameState,
    /// Controller/viewer seats per team.
    pub seats: RoleArbiter,
}

/// Central application state shared across routes, sockets, and tasks.
pub struct AppState {
    config: AppConfig,
    registry: TeamRegistry,
    question_bank: Vec<Question>,
    engine: Mutex<GameEngine>,
    clients: DashMap<Uuid, ClientConnection>,
    countdown: Mutex<Option<JoinHandle<()>>>,
}

impl AppState {
    /// Construct the shared state with teams initialised from the roster.
    pub fn new(
        config: AppConfig,
        registry: TeamRegistry,
        question_bank: Vec<Question>,
    ) -> SharedState {
        let state = GameState::new(&registry, &config.rules);
        let seats = RoleArbiter::new(registry.teams().iter().map(|team| team.id));

        Arc::new(Self {
            config,
            registry,
            question_bank,
            engine: Mutex::new(GameEngine { state, seats }),
            clients: DashMap::new(),
            countdown: Mutex::new(None),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The static team/admin whitelist.
    pub fn registry(&self) -> &TeamRegistry {
        &self.registry
    }

    /// Sample questions loaded at startup.
    pub fn question_bank(&self) -> &[Question] {
        &self.question_bank
    }

    /// Registry of connected clients keyed by connection id.
    pub fn clients(&self) -> &DashMap<Uuid, ClientConnection> {
        &self.clients
    }

    /// Run `work` with exclusive access to the game engine.
    ///
    /// Every caller goes through this single mutex, which serialises all
    /// mutations and gives each operation linearizable semantics; `work` is
    /// synchronous so no I/O can happen while the lock is held.
    pub async fn with_engine<T>(&self, work: impl FnOnce(&mut GameEngine) -> T) -> T {
        let mut guard = self.engine.lock().await;
        work(&mut guard)
    }

    /// Install a freshly spawned countdown task, aborting any previous one
    /// first so two timers never race on the same round.
    pub async fn install_countdown(&self, handle: JoinHandle<()>) {
        let mut slot = self.countdown.lock().await;
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Abort the running countdown task, if any.
    pub async fn cancel_countdown(&self) {
        let mut slot = self.countdown.lock().await;
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}
