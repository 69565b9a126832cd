//! TCP server for the engine link
//!
//! Accepts display and input processes, registers them under their role
//! index, and moves instructions between the sockets and the engine.
//! Uses tokio for async networking.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::protocol::*;
use crate::runtime::{InboundInstruction, OutboundMessage, PeerEvent, PeerId};
use crate::types::{
    Instruction, Role, DEFAULT_ENGINE_QUEUE, DEFAULT_MAX_DISPLAYS,
    DEFAULT_MAX_INPUTS, DEFAULT_SCREEN_HEIGHT, DEFAULT_SCREEN_WIDTH,
};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_pending: usize,
    pub max_displays: usize,
    pub max_inputs: usize,
    /// Sent to displays in their welcome.
    pub title: String,
    pub screen: ScreenSize,
    /// Sent to inputs in their welcome.
    pub tasks: TaskList,
    pub log_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            max_pending: DEFAULT_ENGINE_QUEUE,
            max_displays: DEFAULT_MAX_DISPLAYS,
            max_inputs: DEFAULT_MAX_INPUTS,
            title: "game".to_string(),
            screen: ScreenSize {
                height: DEFAULT_SCREEN_HEIGHT,
                width: DEFAULT_SCREEN_WIDTH,
            },
            tasks: TaskList::default_vocabulary(),
            log_path: None,
        }
    }
}

impl ServerConfig {
    /// Create from `TEXTGAME_*` environment variables.
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();

        let host = env::var("TEXTGAME_HOST").unwrap_or(defaults.host);
        let port = env_parse("TEXTGAME_PORT").unwrap_or(defaults.port);
        let max_pending = env_parse("TEXTGAME_MAX_PENDING").unwrap_or(defaults.max_pending);
        let max_displays = env_parse("TEXTGAME_MAX_DISPLAYS").unwrap_or(defaults.max_displays);
        let max_inputs = env_parse("TEXTGAME_MAX_INPUTS").unwrap_or(defaults.max_inputs);
        let title = env::var("TEXTGAME_TITLE").unwrap_or(defaults.title);
        let screen = env::var("TEXTGAME_SCREEN")
            .ok()
            .and_then(|s| parse_screen(&s))
            .unwrap_or(defaults.screen);

        let log_path = env::var("TEXTGAME_LOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(s) });

        Self {
            host,
            port,
            max_pending,
            max_displays,
            max_inputs,
            title,
            screen,
            tasks: defaults.tasks,
            log_path,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid socket address {}:{}", self.host, self.port))
    }

    fn max_for(&self, role: Role) -> usize {
        match role {
            Role::Display => self.max_displays,
            Role::Input => self.max_inputs,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Parse a `HxW` screen size such as `40x70`.
pub fn parse_screen(s: &str) -> Option<ScreenSize> {
    let (h, w) = s.trim().split_once(|c| c == 'x' || c == 'X')?;
    Some(ScreenSize {
        height: h.trim().parse().ok()?,
        width: w.trim().parse().ok()?,
    })
}

/// Check whether `host:port` can be bound right now.
pub fn check_tcp_listen_available(host: &str, port: u16) -> std::io::Result<()> {
    let listener = std::net::TcpListener::bind((host, port))?;
    drop(listener);
    Ok(())
}

/// Shared server state
struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
    events_tx: Option<mpsc::UnboundedSender<PeerEvent>>,
}

impl ServerState {
    fn emit(&self, event: PeerEvent) {
        if let Some(tx) = self.events_tx.as_ref() {
            let _ = tx.send(event);
        }
    }
}

/// Handle to a connected client
struct ClientHandle {
    id: usize,
    peer: Option<PeerId>,
    last_seq: Option<u64>,
    tx: mpsc::UnboundedSender<ClientOutbound>,
}

#[derive(Debug, Clone)]
enum ClientOutbound {
    Welcome(WelcomeMessage),
    Error(ErrorMessage),
    Instruction(Instruction),
}

/// Start the TCP server
pub async fn run_server(
    config: ServerConfig,
    inbound_tx: mpsc::Sender<InboundInstruction>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    events_tx: Option<mpsc::UnboundedSender<PeerEvent>>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let wire_log_tx: Option<mpsc::UnboundedSender<Vec<u8>>> = match config.log_path.clone() {
        Some(path) => Some(spawn_wire_log(path)),
        None => None,
    };

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let bound = listener.local_addr()?;
    info!("engine listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState {
        config,
        clients: RwLock::new(Vec::new()),
        events_tx,
    });
    let mut client_id_counter = 0usize;

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                dispatch(&state, msg).await;
            }
        });
    }

    // Accept incoming connections
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        debug!("client {} connected from {}", client_id, addr);

        let state = Arc::clone(&state);
        let inbound_tx = inbound_tx.clone();
        let wire_log_tx = wire_log_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, addr, client_id, state, inbound_tx, wire_log_tx).await {
                warn!("client {} error: {:#}", client_id, e);
            }
            debug!("client {} disconnected", client_id);
        });
    }
}

fn spawn_wire_log(path: String) -> mpsc::UnboundedSender<Vec<u8>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        use tokio::fs::OpenOptions;

        let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(f) => f,
            Err(e) => {
                warn!("wire log {} unavailable: {}", path, e);
                return;
            }
        };

        while let Some(bytes) = rx.recv().await {
            if file.write_all(&bytes).await.is_err() {
                break;
            }
            if file.write_all(b"\n").await.is_err() {
                break;
            }
            if file.flush().await.is_err() {
                break;
            }
        }

        let _ = file.flush().await;
    });
    tx
}

async fn dispatch(state: &ServerState, msg: OutboundMessage) {
    match msg {
        OutboundMessage::ToPeer { to, instruction } => {
            let delivered = {
                let clients = state.clients.read().await;
                match clients.iter().find(|c| c.peer.map(|p| p.destination()) == Some(to)) {
                    Some(c) => c.tx.send(ClientOutbound::Instruction(instruction.clone())).is_ok(),
                    None => false,
                }
            };
            if !delivered {
                state.emit(PeerEvent::Undeliverable { to, instruction });
            }
        }
        OutboundMessage::Broadcast { role, instruction } => {
            let clients = state.clients.read().await;
            for c in clients.iter() {
                let Some(peer) = c.peer else { continue };
                if role.map_or(true, |r| r == peer.role) {
                    let _ = c.tx.send(ClientOutbound::Instruction(instruction.clone()));
                }
            }
        }
    }
}

/// Lowest index not in use by a registered peer of `role`, or `None` when
/// the role is at capacity.
fn free_index(clients: &[ClientHandle], role: Role, max: usize) -> Option<usize> {
    let taken: Vec<usize> = clients
        .iter()
        .filter_map(|c| c.peer)
        .filter(|p| p.role == role)
        .map(|p| p.index)
        .collect();
    if taken.len() >= max {
        return None;
    }
    (0..max).find(|i| !taken.contains(i))
}

async fn registered_peer(state: &ServerState, client_id: usize) -> Option<PeerId> {
    let clients = state.clients.read().await;
    clients.iter().find(|c| c.id == client_id).and_then(|c| c.peer)
}

async fn check_and_update_seq(state: &ServerState, client_id: usize, seq: u64) -> bool {
    let mut clients = state.clients.write().await;
    let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
        return true;
    };

    match client.last_seq {
        Some(prev) if seq <= prev => false,
        _ => {
            client.last_seq = Some(seq);
            true
        }
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: usize,
    state: Arc<ServerState>,
    inbound_tx: mpsc::Sender<InboundInstruction>,
    wire_log_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();

    {
        let mut clients = state.clients.write().await;
        clients.push(ClientHandle {
            id: client_id,
            peer: None,
            last_seq: None,
            tx: tx.clone(),
        });
    }

    let wire_log_tx_out = wire_log_tx.clone();

    // Writer task: serialize outbound messages and stamp one seq sequence
    // across welcome, error and instruction.
    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        let mut seq = 0u64;
        while let Some(msg) = rx.recv().await {
            buf.clear();
            seq += 1;
            let encoded = match msg {
                ClientOutbound::Welcome(mut m) => {
                    m.seq = seq;
                    serde_json::to_writer(&mut buf, &m)
                }
                ClientOutbound::Error(mut m) => {
                    m.seq = seq;
                    serde_json::to_writer(&mut buf, &m)
                }
                ClientOutbound::Instruction(ins) => {
                    serde_json::to_writer(&mut buf, &create_instruction(seq, ins))
                }
            };
            if encoded.is_err() {
                continue;
            }
            if let Some(tx) = wire_log_tx_out.as_ref() {
                let _ = tx.send(buf.clone());
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut line = String::new();
    let result = loop {
        line.clear();
        let bytes_read = match reader.read_line(&mut line).await {
            Ok(n) => n,
            Err(e) => break Err(anyhow::Error::from(e).context("read failed")),
        };

        if bytes_read == 0 {
            break Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(tx) = wire_log_tx.as_ref() {
            let _ = tx.send(trimmed.as_bytes().to_vec());
        }

        match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                if registered_peer(&state, client_id).await.is_some() {
                    let error =
                        create_error(hello.seq, ErrorCode::InvalidInstruction, "already registered");
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                if !is_compatible_version(&hello.protocol_version) {
                    let error = create_error(
                        hello.seq,
                        ErrorCode::ProtocolMismatch,
                        &format!("Protocol version {} not supported", hello.protocol_version),
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    break Ok(());
                }

                let assigned = {
                    let mut clients = state.clients.write().await;
                    let max = state.config.max_for(hello.role);
                    let index = free_index(&clients, hello.role, max);
                    if let (Some(index), Some(client)) =
                        (index, clients.iter_mut().find(|c| c.id == client_id))
                    {
                        let peer = PeerId {
                            role: hello.role,
                            index,
                        };
                        client.peer = Some(peer);
                        client.last_seq = Some(hello.seq);
                        Some(peer)
                    } else {
                        None
                    }
                };

                let Some(peer) = assigned else {
                    let error = create_error(
                        hello.seq,
                        ErrorCode::Capacity,
                        &format!("no free {} slot", hello.role.as_str()),
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    break Ok(());
                };

                let tasks = match peer.role {
                    Role::Input => state.config.tasks.clone(),
                    Role::Display => TaskList::default(),
                };
                let welcome = create_welcome(
                    0,
                    peer.role,
                    peer.index,
                    &state.config.title,
                    state.config.screen,
                    tasks,
                );
                let _ = tx.send(ClientOutbound::Welcome(welcome));

                info!("{} registered as {} ({})", addr, peer, hello.name);
                state.emit(PeerEvent::Registered(peer));
            }

            Ok(ParsedMessage::Instruction(msg)) => {
                let Some(peer) = registered_peer(&state, client_id).await else {
                    let error = create_error(
                        msg.seq,
                        ErrorCode::HandshakeRequired,
                        "Send hello before instruction",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                };

                if !check_and_update_seq(&state, client_id, msg.seq).await {
                    let error = create_error(
                        msg.seq,
                        ErrorCode::InvalidInstruction,
                        "seq must be strictly increasing",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                let seq = msg.seq;
                let inbound = InboundInstruction {
                    from: peer,
                    seq,
                    instruction: msg.into_instruction(),
                };
                // Backpressure: bounded queue.
                if inbound_tx.try_send(inbound).is_err() {
                    let error =
                        create_error(seq, ErrorCode::Backpressure, "Instruction queue is full");
                    let _ = tx.send(ClientOutbound::Error(error));
                }
            }

            Ok(ParsedMessage::Unknown(u)) => {
                let error = create_error(u.seq, ErrorCode::InvalidInstruction, "Unknown message type");
                let _ = tx.send(ClientOutbound::Error(error));
            }

            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                let error = create_error(
                    seq,
                    ErrorCode::InvalidInstruction,
                    &format!("JSON parse error: {}", e),
                );
                let _ = tx.send(ClientOutbound::Error(error));
            }
        }
    };

    // Clean up: free the role slot.
    let peer = {
        let mut clients = state.clients.write().await;
        let peer = clients.iter().find(|c| c.id == client_id).and_then(|c| c.peer);
        clients.retain(|c| c.id != client_id);
        peer
    };
    if let Some(peer) = peer {
        info!("{} disconnected", peer);
        state.emit(PeerEvent::Disconnected(peer));
    }

    drop(tx);
    let _ = write_task.await;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Destination;

    fn handle(id: usize, peer: Option<PeerId>) -> ClientHandle {
        let (tx, _rx) = mpsc::unbounded_channel();
        ClientHandle {
            id,
            peer,
            last_seq: None,
            tx,
        }
    }

    #[test]
    fn free_index_fills_gaps_first() {
        let clients = vec![
            handle(1, Some(PeerId { role: Role::Display, index: 1 })),
            handle(2, Some(PeerId { role: Role::Input, index: 0 })),
            handle(3, None),
        ];
        assert_eq!(free_index(&clients, Role::Display, 2), Some(0));
        assert_eq!(free_index(&clients, Role::Input, 2), Some(1));
        assert_eq!(free_index(&clients, Role::Input, 1), None);
    }

    #[test]
    fn parse_screen_accepts_hxw() {
        assert_eq!(parse_screen("40x70"), Some(ScreenSize { height: 40, width: 70 }));
        assert_eq!(parse_screen(" 3 X 4 "), Some(ScreenSize { height: 3, width: 4 }));
        assert_eq!(parse_screen("40"), None);
    }

    #[test]
    fn socket_addr_rejects_bad_host() {
        let config = ServerConfig {
            host: "not a host".into(),
            ..ServerConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn default_config_matches_constants() {
        let config = ServerConfig::default();
        assert_eq!(config.max_pending, DEFAULT_ENGINE_QUEUE);
        assert_eq!(config.screen.height, DEFAULT_SCREEN_HEIGHT);
        assert_eq!(config.tasks, TaskList::default_vocabulary());
    }

    #[test]
    fn destination_of_peer() {
        let p = PeerId { role: Role::Input, index: 2 };
        assert_eq!(p.destination(), Destination::Input(2));
    }
}
