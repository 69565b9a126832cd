//! Peer side of the engine link, used by the display and input processes.

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::protocol::*;
use crate::types::{Instruction, Role};

/// Connected and registered peer.
pub struct PeerClient {
    reader: PeerReader,
    writer: PeerWriter,
}

/// Receiving half of a [`PeerClient`].
pub struct PeerReader {
    lines: Lines<BufReader<OwnedReadHalf>>,
}

/// Sending half of a [`PeerClient`].
pub struct PeerWriter {
    half: OwnedWriteHalf,
    seq: u64,
}

impl PeerClient {
    /// Connect to the engine at `addr` and register as `role`.
    ///
    /// Returns the client together with the engine's welcome.
    pub async fn connect(addr: SocketAddr, role: Role, name: &str) -> Result<(Self, WelcomeMessage)> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to engine at {addr}"))?;
        let (read_half, write_half) = stream.into_split();
        let mut reader = PeerReader {
            lines: BufReader::new(read_half).lines(),
        };
        let mut writer = PeerWriter {
            half: write_half,
            seq: 0,
        };

        writer.seq += 1;
        let hello = create_hello(writer.seq, role, name);
        writer.write_json(&hello).await?;

        let welcome = match reader.recv().await? {
            Some(PeerMessage::Welcome(w)) => w,
            Some(PeerMessage::Error(e)) => bail!("engine refused registration: {}", e.message),
            Some(other) => bail!("expected welcome, got {other:?}"),
            None => bail!("engine closed the connection during handshake"),
        };
        debug!("registered as {}", welcome.name);

        Ok((Self { reader, writer }, welcome))
    }

    pub async fn send(&mut self, instruction: Instruction) -> Result<()> {
        self.writer.send(instruction).await
    }

    pub async fn recv(&mut self) -> Result<Option<PeerMessage>> {
        self.reader.recv().await
    }

    pub fn split(self) -> (PeerReader, PeerWriter) {
        (self.reader, self.writer)
    }
}

impl PeerReader {
    /// Next message from the engine; `None` once the engine hung up.
    ///
    /// Lines that fail to parse are skipped.
    pub async fn recv(&mut self) -> Result<Option<PeerMessage>> {
        while let Some(line) = self.lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match parse_peer_message(trimmed) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => debug!("dropping unparsable line from engine: {}", e),
            }
        }
        Ok(None)
    }
}

impl PeerWriter {
    /// Send an instruction; seq and ts are stamped here.
    pub async fn send(&mut self, instruction: Instruction) -> Result<()> {
        self.seq += 1;
        let msg = create_instruction(self.seq, instruction);
        self.write_json(&msg).await
    }

    async fn write_json<T: serde::Serialize>(&mut self, value: &T) -> Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        self.half.write_all(&line).await?;
        self.half.flush().await?;
        Ok(())
    }
}
