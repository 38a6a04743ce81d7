//! Relay server: listener setup, HTTP routing and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding the UDP ingest socket and the TCP listener for browsers.  Both
//!    happen up front in [`RelayServer::bind`]; failure to bind either is
//!    fatal.
//! 2. Running the ingest loop as a single task that publishes into the
//!    [`BroadcastHub`].  The hub is subscribed to exactly once, no matter how
//!    many browsers connect.
//! 3. Serving browsers with an `axum` router on the HTTP port: `GET /` returns
//!    the presentation page, and a WebSocket upgrade on any path starts a
//!    session.  Other plain requests get `404`, or `405` for a non-GET on the
//!    page route.
//! 4. Running each WebSocket session as two concurrent halves:
//!    - **Hub → Browser**: drains the session's queue into the socket.
//!    - **Browser → Relay**: reads frames only to notice Close and errors;
//!      their content is ignored.
//! 5. Stopping everything when the `running` flag is cleared.
//!
//! # Scalability
//!
//! Each connection is served by its own Tokio task.  A browser whose socket
//! stalls only stalls its own writer; its queue fills up and it starts
//! missing events, while ingestion and every other session continue.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use axum::extract::ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::sleep;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::application::hub::{BroadcastHub, EventSink};
use crate::domain::config::RelayConfig;
use crate::domain::session::{SessionEvent, SessionState};
use crate::infrastructure::ingest::IngestListener;
use crate::infrastructure::static_page::{serve_index, IndexPage};

/// How often the shutdown flag is checked.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// A relay with both listeners bound, ready to [`run`](RelayServer::run).
pub struct RelayServer {
    ingest: IngestListener,
    listener: TcpListener,
    http_addr: SocketAddr,
    hub: BroadcastHub,
    page: Arc<IndexPage>,
}

impl RelayServer {
    /// Binds the ingest socket and the browser listener.
    ///
    /// # Errors
    ///
    /// Returns an error if either port cannot be bound (already in use, or
    /// the process lacks permission).  There is no fallback port.
    pub async fn bind(config: RelayConfig) -> anyhow::Result<Self> {
        let ingest = IngestListener::bind(config.ingest_bind_addr)
            .await?
            .with_report_interval(config.malformed_report_interval);

        let listener = TcpListener::bind(config.http_bind_addr)
            .await
            .with_context(|| {
                format!(
                    "failed to bind HTTP/WebSocket listener on {}",
                    config.http_bind_addr
                )
            })?;
        let http_addr = listener
            .local_addr()
            .context("failed to read HTTP/WebSocket listener address")?;

        Ok(Self {
            ingest,
            listener,
            http_addr,
            hub: BroadcastHub::new(config.session_queue_capacity),
            page: Arc::new(IndexPage::from_config(config.index_path)),
        })
    }

    /// Address producers send datagrams to.
    pub fn ingest_addr(&self) -> SocketAddr {
        self.ingest.local_addr()
    }

    /// Address browsers connect to.
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Handle to the session set, e.g. for observing the session count.
    pub fn hub(&self) -> BroadcastHub {
        self.hub.clone()
    }

    /// Runs the ingest loop and the HTTP server until `running` is cleared.
    ///
    /// Open WebSocket sessions are closed on shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server fails; ingestion is stopped first.
    pub async fn run(self, running: Arc<AtomicBool>) -> anyhow::Result<()> {
        let Self {
            ingest,
            listener,
            http_addr,
            hub,
            page,
        } = self;

        let sink: Arc<dyn EventSink> = Arc::new(hub.clone());
        let ingest_task = tokio::spawn(ingest.run(sink, Arc::clone(&running)));

        let (stop_tx, stop_rx) = watch::channel(false);
        let stop_watch = tokio::spawn(watch_running(Arc::clone(&running), stop_tx));

        let app = router(AppState {
            hub,
            page,
            shutdown: stop_rx.clone(),
        });

        info!("browser page and WebSocket listening on http://{http_addr}/");

        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(stopped(stop_rx))
        .await;

        // Whatever ended the server also ends ingestion.
        running.store(false, Ordering::Relaxed);
        stop_watch.abort();
        if let Err(e) = ingest_task.await {
            error!("ingest task ended abnormally: {e}");
        }

        served.context("HTTP/WebSocket server failed")
    }
}

/// Binds and runs a relay with `config` until `running` is cleared.
///
/// # Errors
///
/// Returns an error if either listener cannot be bound.
pub async fn run_server(config: RelayConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    RelayServer::bind(config).await?.run(running).await
}

// ── Routing ───────────────────────────────────────────────────────────────────

/// State shared by every request handler.
#[derive(Clone)]
struct AppState {
    hub: BroadcastHub,
    page: Arc<IndexPage>,
    shutdown: watch::Receiver<bool>,
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_or_upgrade))
        .route("/index.html", get(index_or_upgrade))
        .fallback(upgrade_or_not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// `GET /`: the page for a plain fetch, a session for a WebSocket upgrade.
async fn index_or_upgrade(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    match upgrade {
        Ok(ws) => ws.on_upgrade(move |socket| {
            run_session(socket, peer_addr, state.hub, state.shutdown)
        }),
        Err(_) => serve_index(&state.page).await,
    }
}

/// Any other path: a session for a WebSocket upgrade, `404` otherwise.
async fn upgrade_or_not_found(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    match upgrade {
        Ok(ws) => ws.on_upgrade(move |socket| {
            run_session(socket, peer_addr, state.hub, state.shutdown)
        }),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

// ── Shutdown ──────────────────────────────────────────────────────────────────

/// Publishes `true` on `stop` once `running` is cleared.
async fn watch_running(running: Arc<AtomicBool>, stop: watch::Sender<bool>) {
    while running.load(Ordering::Relaxed) {
        sleep(SHUTDOWN_POLL_INTERVAL).await;
    }
    info!("shutdown flag set; stopping HTTP/WebSocket server");
    stop.send_replace(true);
}

/// Resolves once `true` is published (or the sender is gone).
async fn stopped(mut stop: watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Runs the complete lifecycle of a single browser WebSocket session.
///
/// 1. The upgrade has completed (`Connecting → Connected`).
/// 2. Joins the hub.  Only events broadcast from now on are delivered.
/// 3. Runs the hub→browser writer and the browser reader concurrently until
///    either ends or the relay shuts down (`Connected → Disconnected`).
/// 4. Leaves the hub when the subscription is dropped.
async fn run_session(
    socket: WebSocket,
    peer_addr: SocketAddr,
    hub: BroadcastHub,
    shutdown: watch::Receiver<bool>,
) {
    let mut state = SessionState::Connecting.advance(SessionEvent::HandshakeCompleted);
    if !state.can_receive() {
        warn!("browser {peer_addr}: session in state {state:?} cannot receive events");
        return;
    }

    let mut subscription = hub.join();
    let session_id = subscription.id();
    info!(
        "session {session_id} ({peer_addr}): {state:?}; {} browser(s) connected",
        hub.session_count()
    );

    let (mut ws_tx, mut ws_rx) = socket.split();

    // ── Hub → Browser ─────────────────────────────────────────────────────────
    let writer = async {
        while let Some(frame) = subscription.recv().await {
            if let Err(e) = ws_tx.send(Message::Text(frame.as_ref().into())).await {
                debug!("session {session_id}: send failed (browser gone): {e}");
                break;
            }
        }
    };

    // ── Browser → Relay ───────────────────────────────────────────────────────
    //
    // Browsers have nothing to say to the relay; frames are read only so
    // that Close frames and socket errors end the session promptly.
    let reader = async {
        while let Some(result) = ws_rx.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("session {session_id}: Close frame received");
                    break;
                }
                Ok(msg) => {
                    debug!(
                        "session {session_id}: ignoring {} frame from browser",
                        frame_type_name(&msg)
                    );
                }
                Err(e) => {
                    debug!("session {session_id}: WebSocket closed: {e}");
                    break;
                }
            }
        }
    };

    // The session ends as soon as either half finishes; the other half is
    // dropped (cancelled) with it.
    tokio::select! {
        _ = writer => debug!("session {session_id}: writer ended"),
        _ = reader => debug!("session {session_id}: reader ended"),
        _ = stopped(shutdown) => debug!("session {session_id}: relay shutting down"),
    }

    drop(subscription);
    state = state.advance(SessionEvent::Closed);
    info!(
        "session {session_id} ({peer_addr}): {state:?}; {} browser(s) connected",
        hub.session_count()
    );
}

// ── Helper ────────────────────────────────────────────────────────────────────

/// Returns a short name for a WebSocket frame, for debug logs.
fn frame_type_name(msg: &Message) -> &'static str {
    match msg {
        Message::Text(_) => "Text",
        Message::Binary(_) => "Binary",
        Message::Ping(_) => "Ping",
        Message::Pong(_) => "Pong",
        Message::Close(_) => "Close",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
