//! Adapter runtime integration.
//!
//! Bridges the engine loop with the async TCP server.

use std::fmt;
use std::net::SocketAddr;

use anyhow::Context;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::server::{run_server, ServerConfig};
use crate::types::{Destination, Instruction, Role};

/// A registered peer: its role and index within that role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId {
    pub role: Role,
    pub index: usize,
}

impl PeerId {
    pub fn destination(&self) -> Destination {
        self.role.destination(self.index)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.destination())
    }
}

/// Instruction delivered to the engine loop.
#[derive(Debug, Clone)]
pub struct InboundInstruction {
    pub from: PeerId,
    pub seq: u64,
    pub instruction: Instruction,
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToPeer {
        to: Destination,
        instruction: Instruction,
    },
    /// Every registered peer, or only those with `role`.
    Broadcast {
        role: Option<Role>,
        instruction: Instruction,
    },
}

/// Connection lifecycle reported by the server.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    Registered(PeerId),
    Disconnected(PeerId),
    /// No registered peer matches `to`.
    Undeliverable {
        to: Destination,
        instruction: Instruction,
    },
}

/// Anything the server hands to the engine loop.
#[derive(Debug, Clone)]
pub enum Incoming {
    Instruction(InboundInstruction),
    Event(PeerEvent),
}

/// Running adapter instance.
pub struct Adapter {
    addr: SocketAddr,
    server: JoinHandle<anyhow::Result<()>>,
    inbound_rx: mpsc::Receiver<InboundInstruction>,
    events_rx: mpsc::UnboundedReceiver<PeerEvent>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Adapter {
    /// Start the server on the current tokio runtime and wait until it
    /// is listening.
    pub async fn start(config: ServerConfig) -> anyhow::Result<Self> {
        let max_pending = config.max_pending.max(1);
        let (inbound_tx, inbound_rx) = mpsc::channel::<InboundInstruction>(max_pending);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<PeerEvent>();
        let (ready_tx, ready_rx) = oneshot::channel();

        let mut server = tokio::spawn(run_server(
            config,
            inbound_tx,
            out_rx,
            Some(events_tx),
            Some(ready_tx),
        ));

        let addr = tokio::select! {
            ready = ready_rx => ready.context("server stopped before listening")?,
            res = &mut server => {
                res.context("server task panicked")??;
                anyhow::bail!("server exited before listening");
            }
        };

        Ok(Self {
            addr,
            server,
            inbound_rx,
            events_rx,
            out_tx,
        })
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn recv(&mut self) -> Option<InboundInstruction> {
        self.inbound_rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<InboundInstruction> {
        self.inbound_rx.try_recv().ok()
    }

    pub async fn next_event(&mut self) -> Option<PeerEvent> {
        self.events_rx.recv().await
    }

    /// Next instruction or peer event, instructions first.
    ///
    /// `None` once the server has gone away.
    pub async fn next_incoming(&mut self) -> Option<Incoming> {
        tokio::select! {
            biased;

            Some(ins) = self.inbound_rx.recv() => Some(Incoming::Instruction(ins)),
            Some(ev) = self.events_rx.recv() => Some(Incoming::Event(ev)),
            else => None,
        }
    }

    pub fn try_event(&mut self) -> Option<PeerEvent> {
        self.events_rx.try_recv().ok()
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    pub fn shutdown(&self) {
        self.server.abort();
    }
}

impl Drop for Adapter {
    fn drop(&mut self) {
        self.server.abort();
    }
}
