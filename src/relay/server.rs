//! Relay server: accepts clients, stores uploaded fleet configurations, and
//! serves a random stored configuration on request.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use rand::Rng;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::events::EventSink;
use crate::relay::{
    Request, RequestKind, EMPTY_STORE_NOTICE, PROTOCOL_END, PROTOCOL_RECEIVE_FLEET,
    PROTOCOL_SEPARATOR,
};

/// Relay server handle. Accepting and client handling run on background tasks;
/// the handle only inspects and controls them.
pub struct RelayServer {
    shared: Arc<Shared>,
    local_addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

struct Shared {
    /// Uploaded fleet configurations, append-only, read by random pick.
    configurations: Mutex<Vec<String>>,
    /// Outbound channels of the handlers still running, for shutdown
    /// broadcasts.
    handlers: Mutex<Vec<HandlerHandle>>,
    connected: AtomicUsize,
    finalized: AtomicBool,
    shutdown: Notify,
    events: Arc<dyn EventSink>,
}

struct HandlerHandle {
    id: u32,
    outbound: mpsc::UnboundedSender<String>,
}

impl RelayServer {
    /// Binds the listening socket and starts accepting. A port that cannot be
    /// bound surfaces here, before any client interaction.
    pub async fn bind(addr: &str, events: Arc<dyn EventSink>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("unable to listen on {addr}"))?;
        let local_addr = listener.local_addr()?;
        events.on_log_event(&format!(
            "Server is now listening for clients on {local_addr}"
        ));

        let shared = Arc::new(Shared {
            configurations: Mutex::new(Vec::new()),
            handlers: Mutex::new(Vec::new()),
            connected: AtomicUsize::new(0),
            finalized: AtomicBool::new(false),
            shutdown: Notify::new(),
            events,
        });
        let accept_task = tokio::spawn(accept_loop(listener, shared.clone()));
        Ok(RelayServer {
            shared,
            local_addr,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn connected_clients(&self) -> usize {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn stored_configurations(&self) -> usize {
        self.shared.configurations.lock().unwrap().len()
    }

    /// A finalized server closes its listener once the last client leaves.
    pub fn set_finalized(&self, finalized: bool) {
        self.shared.finalized.store(finalized, Ordering::SeqCst);
        self.shared.events.on_log_event(&format!(
            "Server is{} in a finalized state",
            if finalized { "" } else { " not" }
        ));
    }

    /// Closes the listening socket and asks every connected client to
    /// disconnect with an end-of-session message.
    pub fn close_connections(&self) {
        self.shared.events.on_log_event(
            "Shutting down the server, sending disconnect requests to clients ...",
        );
        let handlers = std::mem::take(&mut *self.shared.handlers.lock().unwrap());
        for handler in handlers {
            let _ = handler
                .outbound
                .send(format!("{PROTOCOL_END}{PROTOCOL_SEPARATOR}"));
        }
        self.shared.shutdown.notify_one();
    }

    /// Waits until the accept loop has stopped, i.e. after
    /// [`RelayServer::close_connections`] or a finalized shutdown.
    pub async fn shutdown_complete(self) {
        let _ = self.accept_task.await;
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    let mut next_client_id: u32 = 0;
    loop {
        tokio::select! {
            _ = shared.shutdown.notified() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let id = next_client_id;
                    next_client_id += 1;
                    shared.connected.fetch_add(1, Ordering::SeqCst);
                    shared
                        .events
                        .on_log_event(&format!("Client {id} has connected to the server"));
                    tokio::spawn(handle_client(stream, id, shared.clone()));
                }
                Err(err) => {
                    log::warn!("accept failed: {err}");
                }
            },
        }
    }
    log::debug!("accept loop stopped, listening socket closed");
}

async fn handle_client(stream: TcpStream, id: u32, shared: Arc<Shared>) {
    let (read_half, write_half) = stream.into_split();
    let (outbound, outbound_rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(write_loop(write_half, outbound_rx));

    shared.handlers.lock().unwrap().push(HandlerHandle {
        id,
        outbound: outbound.clone(),
    });
    // Welcome line: the assigned id on its own.
    let _ = outbound.send(id.to_string());

    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                log::debug!("received from client {id}: {line}");
                match Request::parse(&line) {
                    Ok(request) => {
                        if !dispatch(&shared, id, &outbound, request.kind) {
                            break;
                        }
                    }
                    Err(err) => {
                        log::warn!("client {id}: ignoring malformed line ({err})");
                    }
                }
            }
            Ok(None) => {
                log::debug!("client {id} has terminated the connection");
                break;
            }
            Err(err) => {
                log::debug!("read from client {id} failed: {err}");
                break;
            }
        }
    }

    drop(outbound);
    shared.handlers.lock().unwrap().retain(|h| h.id != id);
    client_disconnected(&shared);
    shared
        .events
        .on_log_event(&format!("Connection with client {id} closed"));
    let _ = writer_task.await;
}

/// Handles one parsed request; returns `false` when the session should end.
fn dispatch(
    shared: &Shared,
    id: u32,
    outbound: &mpsc::UnboundedSender<String>,
    kind: RequestKind,
) -> bool {
    match kind {
        RequestKind::UploadFleet(payload) => {
            log::debug!("received fleet configuration from client {id}: {payload}");
            shared
                .events
                .on_log_event(&format!("Received fleet configuration from client {id}"));
            shared.configurations.lock().unwrap().push(payload);
            true
        }
        RequestKind::RequestFleet => {
            shared
                .events
                .on_log_event(&format!("Sending a configuration to client {id}"));
            let reply = match random_configuration(shared) {
                Some(configuration) => {
                    format!("{PROTOCOL_RECEIVE_FLEET}{PROTOCOL_SEPARATOR}{configuration}")
                }
                None => EMPTY_STORE_NOTICE.to_string(),
            };
            let _ = outbound.send(reply);
            true
        }
        RequestKind::End => {
            shared
                .events
                .on_log_event(&format!("Client {id} is requesting to terminate connection"));
            false
        }
        RequestKind::Data(_) => {
            log::debug!("client {id}: ignoring reserved data message");
            true
        }
    }
}

fn random_configuration(shared: &Shared) -> Option<String> {
    let configurations = shared.configurations.lock().unwrap();
    if configurations.is_empty() {
        return None;
    }
    let index = rand::rng().random_range(0..configurations.len());
    Some(configurations[index].clone())
}

fn client_disconnected(shared: &Shared) {
    let remaining = shared.connected.fetch_sub(1, Ordering::SeqCst) - 1;
    if shared.finalized.load(Ordering::SeqCst) && remaining == 0 {
        shared
            .events
            .on_log_event("All clients disconnected, server shutting down");
        shared.shutdown.notify_one();
    }
}

async fn write_loop(mut write_half: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = rx.recv().await {
        if write_half.write_all(line.as_bytes()).await.is_err() {
            break;
        }
        if write_half.write_all(b"\n").await.is_err() {
            break;
        }
    }
    let _ = write_half.shutdown().await;
}
