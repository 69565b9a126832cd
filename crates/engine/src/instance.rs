//! The engine instance: owns the server, the peers and the game channel.

use std::collections::HashSet;
use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use log::{debug, info, warn, LevelFilter};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::adapter::{Adapter, Incoming, OutboundMessage, PeerEvent, PeerId};
use crate::config::{EngineConfig, DISPLAY_BIN, INPUT_BIN};
use crate::router::{route, Route};
use crate::types::{Arg, Destination, Instruction, Role, Task, DEFAULT_PROMPT};

/// Instructions addressed to `game`.
pub type GameReceiver = mpsc::UnboundedReceiver<Instruction>;

pub struct Instance {
    config: EngineConfig,
    adapter: Adapter,
    local_tx: mpsc::Sender<Instruction>,
    local_rx: mpsc::Receiver<Instruction>,
    game_tx: mpsc::UnboundedSender<Instruction>,
    peers: HashSet<PeerId>,
    children: Vec<Child>,
    running: bool,
}

impl Instance {
    /// Start the server and return the instance with its game channel.
    pub async fn new(config: EngineConfig) -> Result<(Self, GameReceiver)> {
        let adapter = Adapter::start(config.server.clone())
            .await
            .context("failed to start engine server")?;
        info!("engine listening on {}", adapter.local_addr());

        let (local_tx, local_rx) = mpsc::channel(config.queue_len.max(1));
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok((
            Self {
                config,
                adapter,
                local_tx,
                local_rx,
                game_tx,
                peers: HashSet::new(),
                children: Vec::new(),
                running: false,
            },
            game_rx,
        ))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.adapter.local_addr()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Registered peers.
    pub fn peers(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.iter()
    }

    /// Sender onto the local queue, for game logic running beside the engine.
    pub fn sender(&self) -> mpsc::Sender<Instruction> {
        self.local_tx.clone()
    }

    /// Queue an instruction for the loop. A full queue drops it.
    pub fn instruction_put(&self, ins: Instruction) -> bool {
        match self.local_tx.try_send(ins) {
            Ok(()) => true,
            Err(e) => {
                warn!("engine queue full, dropping {}", e.into_inner());
                false
            }
        }
    }

    /// Route one instruction.
    pub fn handle(&mut self, ins: Instruction) {
        debug!("engine handling {}", ins);
        match route(&ins) {
            Route::Peer(to) => self.adapter.send(OutboundMessage::ToPeer {
                to,
                instruction: ins,
            }),
            Route::Game => {
                if self.game_tx.send(ins).is_err() {
                    warn!("game channel closed");
                }
            }
            Route::Stop => self.stop(),
            Route::Start => {
                if self.running {
                    debug!("start ignored, already running");
                } else {
                    self.running = true;
                }
            }
            Route::HideLogs => self.hide_logs(),
            Route::Unhandled(task) => {
                warn!("did not recognize destination {} for {}", ins.destination(), task)
            }
        }
    }

    fn handle_event(&mut self, ev: PeerEvent) {
        match ev {
            PeerEvent::Registered(peer) => {
                info!("{} connected", peer);
                self.peers.insert(peer);
            }
            PeerEvent::Disconnected(peer) => {
                info!("{} disconnected", peer);
                self.peers.remove(&peer);
            }
            PeerEvent::Undeliverable { to, instruction } => {
                warn!("did not recognize destination {} for {}", to, instruction.task())
            }
        }
    }

    /// Broadcast `stop` to every peer and end the loop.
    pub fn stop(&mut self) {
        info!("stopping engine");
        self.adapter.send(OutboundMessage::Broadcast {
            role: None,
            instruction: Instruction::new(Task::Stop, Destination::Engine),
        });
        self.running = false;
    }

    /// Quiet this process and every peer down to errors.
    pub fn hide_logs(&mut self) {
        log::set_max_level(LevelFilter::Error);
        self.adapter.send(OutboundMessage::Broadcast {
            role: None,
            instruction: Instruction::new(Task::HideLogs, Destination::Engine),
        });
    }

    /// Launch one display and one input, each in its own terminal when a
    /// launcher is configured.
    pub fn spawn_peers(&mut self) -> Result<()> {
        let addr = self.local_addr().to_string();
        for name in [DISPLAY_BIN, INPUT_BIN] {
            let bin = self.config.peer_bin(name);
            let mut cmd = match self.config.launcher.split_first() {
                Some((program, prefix)) => {
                    let mut c = Command::new(program);
                    c.args(prefix).arg(&bin);
                    c
                }
                None => Command::new(&bin),
            };
            cmd.arg("--engine").arg(&addr).kill_on_drop(true);
            let child = cmd
                .spawn()
                .with_context(|| format!("failed to launch {}", bin.display()))?;
            info!("launched {} (pid {:?})", name, child.id());
            self.children.push(child);
        }
        Ok(())
    }

    /// Wait until every peer in `wanted` has registered.
    pub async fn wait_for_peers(&mut self, wanted: &[PeerId]) -> Result<()> {
        let deadline = tokio::time::Instant::now() + self.config.connect_timeout;
        while !wanted.iter().all(|p| self.peers.contains(p)) {
            match tokio::time::timeout_at(deadline, self.adapter.next_event()).await {
                Ok(Some(ev)) => self.handle_event(ev),
                Ok(None) => bail!("server stopped while waiting for peers"),
                Err(_) => {
                    let missing: Vec<String> = wanted
                        .iter()
                        .filter(|p| !self.peers.contains(p))
                        .map(|p| p.to_string())
                        .collect();
                    bail!("timed out waiting for {}", missing.join(", "));
                }
            }
        }
        Ok(())
    }

    /// Spawn the peers, wait for `display0` and `input0`, open the first
    /// prompt, and run until stopped.
    pub async fn default_start(&mut self) -> Result<()> {
        if self.config.spawn_peers {
            self.spawn_peers()?;
        }
        let display0 = PeerId {
            role: Role::Display,
            index: 0,
        };
        let input0 = PeerId {
            role: Role::Input,
            index: 0,
        };
        self.wait_for_peers(&[display0, input0]).await?;

        self.handle(
            Instruction::new(Task::GetFromPrompt, input0.destination()).with_args([
                Arg::Text(DEFAULT_PROMPT.to_string()),
                Arg::Text(display0.destination().to_string()),
            ]),
        );
        self.run().await
    }

    /// The engine loop. Returns once `stop` was handled.
    pub async fn run(&mut self) -> Result<()> {
        self.running = true;
        let mut clock = tokio::time::interval(self.config.clock);
        clock.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while self.running {
            tokio::select! {
                biased;

                Some(ins) = self.local_rx.recv() => self.handle(ins),
                incoming = self.adapter.next_incoming() => match incoming {
                    Some(Incoming::Instruction(inbound)) => {
                        debug!("from {} seq {}", inbound.from, inbound.seq);
                        self.handle(inbound.instruction);
                    }
                    Some(Incoming::Event(ev)) => self.handle_event(ev),
                    None => {
                        warn!("engine server stopped");
                        self.running = false;
                    }
                },
                _ = clock.tick() => {}
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Give peers one clock to receive the stop, then reap the children.
    async fn shutdown(&mut self) {
        tokio::time::sleep(self.config.clock).await;
        for mut child in self.children.drain(..) {
            match tokio::time::timeout(self.config.connect_timeout, child.wait()).await {
                Ok(Ok(status)) => debug!("peer exited with {}", status),
                Ok(Err(e)) => warn!("failed to wait for peer: {}", e),
                Err(_) => {
                    warn!("peer did not exit, killing it");
                    let _ = child.kill().await;
                }
            }
        }
        self.adapter.shutdown();
    }
}
