//! Adapter module - the engine link over a TCP socket with a JSON protocol
//!
//! The engine and its peer processes (displays and input screens) talk
//! over TCP. The engine listens; every peer connects, registers under a
//! role, and from then on exchanges instructions.
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Peer connects to the engine socket (default: 127.0.0.1:7878)
//! 2. **Handshake**: Peer sends `hello` with its role, engine responds with `welcome`
//! 3. **Registration**: The peer gets the lowest free index of its role (`display0`, `input1`, ...)
//! 4. **Instructions**: Both sides send `instruction` messages; the engine routes them
//!
//! # Message Types
//!
//! ## Peer → Engine
//!
//! - **hello**: role (`display` or `input`), name, protocol version
//! - **instruction**: task, args, destination
//!
//! ## Engine → Peer
//!
//! - **welcome**: assigned index and name, title, screen size, command vocabulary
//! - **instruction**: an instruction routed to this peer
//! - **error**: error response with code and message
//!
//! # Environment Variables
//!
//! - `TEXTGAME_HOST`: Bind address (default: "127.0.0.1")
//! - `TEXTGAME_PORT`: Port number (default: 7878)
//! - `TEXTGAME_MAX_PENDING`: Inbound queue size before `backpressure` errors (default: 20)
//! - `TEXTGAME_MAX_DISPLAYS` / `TEXTGAME_MAX_INPUTS`: Peers accepted per role (default: 2)
//! - `TEXTGAME_TITLE`, `TEXTGAME_SCREEN`: Title and `HxW` size sent to displays
//! - `TEXTGAME_LOG_PATH`: Append every wire line to this file
//!
//! # Example Protocol Flow
//!
//! ```text
//! Peer   -> Engine: {"type":"hello","seq":1,"ts":1700000000000,"role":"input","name":"tty","protocol_version":"1.0.0"}
//! Engine -> Peer:   {"type":"welcome","seq":1,"ts":1700000000001,"protocol_version":"1.0.0","role":"input","index":0,"name":"input0",...}
//! Engine -> Peer:   {"type":"instruction","seq":1,"ts":1700000000002,"task":"getFromPrompt","args":["Input: ","display0"],"to":"input0"}
//! Peer   -> Engine: {"type":"instruction","seq":2,"ts":1700000000100,"task":"print","args":["hello"],"to":"display0"}
//! ```
//!
//! # Testing
//!
//! Connect with netcat for manual testing:
//!
//! ```bash
//! nc 127.0.0.1 7878
//! {"type":"hello","seq":1,"ts":0,"role":"input","name":"nc","protocol_version":"1.0.0"}
//! ```

pub mod client;
pub mod protocol;
pub mod runtime;
pub mod server;

pub use textgame_types as types;

pub use client::{PeerClient, PeerReader, PeerWriter};
pub use protocol::*;
pub use runtime::{Adapter, InboundInstruction, Incoming, OutboundMessage, PeerEvent, PeerId};
pub use server::*;
