//! Relay client: uploads the local fleet and loads fleets delivered by the
//! server into the local game session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::events::EventSink;
use crate::fleet::FleetLayout;
use crate::game::GameSession;
use crate::relay::{
    PROTOCOL_END, PROTOCOL_RECEIVE_FLEET, PROTOCOL_SEND_FLEET, PROTOCOL_SEPARATOR,
};

/// Client handle. The socket read loop runs on a background task, so the
/// owning thread is never blocked on the server.
pub struct RelayClient {
    shared: Arc<Shared>,
    default_dim: usize,
}

struct Shared {
    /// Local game session; created on demand when a configuration arrives
    /// before the game was launched. Shared with the layer driving the game.
    session: Arc<Mutex<Option<GameSession>>>,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    client_id: Mutex<Option<u32>>,
    connected: AtomicBool,
    events: Arc<dyn EventSink>,
}

impl RelayClient {
    pub fn new(events: Arc<dyn EventSink>, default_dim: usize) -> Self {
        RelayClient {
            shared: Arc::new(Shared {
                session: Arc::new(Mutex::new(None)),
                writer: tokio::sync::Mutex::new(None),
                client_id: Mutex::new(None),
                connected: AtomicBool::new(false),
                events,
            }),
            default_dim,
        }
    }

    /// Launches a fresh local game session if none exists yet.
    pub fn new_game(&self) {
        let mut session = self.shared.session.lock().unwrap();
        if session.is_none() {
            *session = Some(GameSession::new(
                self.default_dim,
                self.shared.events.clone(),
            ));
        }
    }

    /// Shared handle to the local session, for the layer driving the game.
    pub fn session_handle(&self) -> Arc<Mutex<Option<GameSession>>> {
        self.shared.session.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn client_id(&self) -> Option<u32> {
        *self.shared.client_id.lock().unwrap()
    }

    /// Connects, reads the id the server assigns on its first line, and
    /// spawns the background read loop.
    pub async fn connect(&self, addr: &str) -> anyhow::Result<()> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("no server listening on {addr}"))?;
        let (read_half, write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let welcome = lines
            .next_line()
            .await?
            .context("server closed the connection before assigning an id")?;
        let id: u32 = welcome
            .trim()
            .parse()
            .with_context(|| format!("malformed welcome line {welcome:?}"))?;

        *self.shared.client_id.lock().unwrap() = Some(id);
        *self.shared.writer.lock().await = Some(write_half);
        self.shared.connected.store(true, Ordering::SeqCst);
        self.shared.events.on_log_event(&format!(
            "Connected to the relay server; your id is {id}"
        ));

        tokio::spawn(read_loop(lines, self.shared.clone(), self.default_dim));
        Ok(())
    }

    /// Uploads the local fleet. Refuses unless connected and the fleet is
    /// fully and validly placed.
    pub async fn send_configuration(&self) -> bool {
        if !self.is_connected() {
            self.shared
                .events
                .on_log_event("Must connect to a server before sending a configuration");
            return false;
        }
        let layout = {
            let session = self.shared.session.lock().unwrap();
            match session.as_ref() {
                None => {
                    self.shared
                        .events
                        .on_log_event("Game not launched, there is no fleet to send");
                    return false;
                }
                Some(session) if !session.is_player_fleet_placed() => {
                    self.shared.events.on_log_event(
                        "Fleet configuration is not valid; place all boats on the board first",
                    );
                    return false;
                }
                Some(session) => session.player_fleet_layout(),
            }
        };
        let Some(id) = self.client_id() else {
            return false;
        };
        let line = format!(
            "{id}{sep}{code}{sep}{layout}",
            sep = PROTOCOL_SEPARATOR,
            code = PROTOCOL_SEND_FLEET,
        );
        log::debug!("sending fleet configuration to the server: {line}");
        self.send_line(line).await
    }

    /// Asks the server for one of its stored configurations. The reply is
    /// applied by the background read loop.
    pub async fn request_configuration(&self) -> bool {
        if !self.is_connected() {
            self.shared
                .events
                .on_log_event("You must be connected to a server to receive a configuration");
            return false;
        }
        let Some(id) = self.client_id() else {
            return false;
        };
        self.send_line(format!(
            "{id}{sep}{code}",
            sep = PROTOCOL_SEPARATOR,
            code = PROTOCOL_RECEIVE_FLEET,
        ))
        .await
    }

    /// Announces the end of the session and closes the connection.
    pub async fn disconnect(&self) {
        if !self.is_connected() {
            return;
        }
        if let Some(id) = self.client_id() {
            self.send_line(format!(
                "{id}{sep}{code}",
                sep = PROTOCOL_SEPARATOR,
                code = PROTOCOL_END,
            ))
            .await;
        }
        let mut writer = self.shared.writer.lock().await;
        if let Some(mut write_half) = writer.take() {
            let _ = write_half.shutdown().await;
        }
        self.shared.connected.store(false, Ordering::SeqCst);
        self.shared
            .events
            .on_log_event("Connection with server closed");
    }

    async fn send_line(&self, line: String) -> bool {
        let mut writer = self.shared.writer.lock().await;
        let Some(write_half) = writer.as_mut() else {
            return false;
        };
        match write_line(write_half, &line).await {
            Ok(()) => true,
            Err(err) => {
                self.shared
                    .events
                    .on_log_event(&format!("Failed to write to the server: {err}"));
                *writer = None;
                self.shared.connected.store(false, Ordering::SeqCst);
                false
            }
        }
    }
}

async fn write_line(write_half: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    write_half.write_all(line.as_bytes()).await?;
    write_half.write_all(b"\n").await
}

async fn read_loop(
    mut lines: Lines<BufReader<OwnedReadHalf>>,
    shared: Arc<Shared>,
    default_dim: usize,
) {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match line.split_once(PROTOCOL_SEPARATOR) {
                Some((PROTOCOL_RECEIVE_FLEET, payload)) => {
                    apply_configuration(&shared, payload, default_dim);
                }
                Some((PROTOCOL_END, _)) => {
                    shared
                        .events
                        .on_log_event("Server is shutting down, closing connection ...");
                    break;
                }
                Some((code, _)) => {
                    log::debug!("ignoring unknown server message {code:?}");
                }
                // Lines without a separator are plain log text.
                None => shared.events.on_log_event(&line),
            },
            Ok(None) => {
                shared
                    .events
                    .on_log_event("Disconnected; the server has closed the connection");
                break;
            }
            Err(err) => {
                shared
                    .events
                    .on_log_event(&format!("Disconnected from the server: {err}"));
                break;
            }
        }
    }
    shared.connected.store(false, Ordering::SeqCst);
    let mut writer = shared.writer.lock().await;
    if let Some(mut write_half) = writer.take() {
        let _ = write_half.shutdown().await;
    }
}

/// Hands a delivered fleet payload to the local session's loading path,
/// launching the session first if the game was not running yet.
fn apply_configuration(shared: &Shared, payload: &str, default_dim: usize) {
    let layout: FleetLayout = match payload.parse() {
        Ok(layout) => layout,
        Err(err) => {
            shared
                .events
                .on_log_event(&format!("Received a malformed configuration: {err}"));
            return;
        }
    };
    shared
        .events
        .on_log_event("Loading configuration from server ...");
    let mut session = shared.session.lock().unwrap();
    let session =
        session.get_or_insert_with(|| GameSession::new(default_dim, shared.events.clone()));
    if let Err(err) = session.load_player_layout(&layout) {
        shared
            .events
            .on_log_event(&format!("Configuration from server is invalid: {err}"));
    }
}
