//! Protocol module - JSON message types for the engine link
//!
//! Line-delimited JSON between the engine and its peer processes.
//! All messages have: type, seq (sequence number), ts (timestamp in ms).
//! `seq` counts per sender and per connection; the engine stamps its side in
//! the connection writer, so the values passed to the `create_*` helpers on
//! the engine side are placeholders.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::types::{Arg, Destination, Instruction, Role, Task, DEFAULT_VOCABULARY};

/// Protocol version spoken by this build.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Maximum number of commands a welcome can advertise.
pub const MAX_TASKS: usize = 32;

// ============== Peer -> Engine Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HelloType {
    #[serde(rename = "hello")]
    Hello,
}

impl Default for HelloType {
    fn default() -> Self {
        Self::Hello
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstructionType {
    #[serde(rename = "instruction")]
    Instruction,
}

impl Default for InstructionType {
    fn default() -> Self {
        Self::Instruction
    }
}

/// Peer hello message (first message on a connection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: HelloType,
    pub seq: u64,
    pub ts: u64,
    pub role: Role,
    pub name: String,
    pub protocol_version: String,
}

/// An instruction on the wire, in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: InstructionType,
    pub seq: u64,
    pub ts: u64,
    pub task: Task,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Arg>,
    pub to: Destination,
}

impl InstructionMessage {
    pub fn into_instruction(self) -> Instruction {
        Instruction {
            task: self.task,
            args: self.args,
            to: self.to,
        }
    }
}

// ============== Engine -> Peer Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

impl Default for WelcomeType {
    fn default() -> Self {
        Self::Welcome
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

impl Default for ErrorType {
    fn default() -> Self {
        Self::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "handshake_required")]
    HandshakeRequired,
    #[serde(rename = "protocol_mismatch")]
    ProtocolMismatch,
    #[serde(rename = "invalid_instruction")]
    InvalidInstruction,
    #[serde(rename = "capacity")]
    Capacity,
    #[serde(rename = "backpressure")]
    Backpressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub height: u16,
    pub width: u16,
}

/// Commands an input screen may accept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskList(pub ArrayVec<String, MAX_TASKS>);

impl TaskList {
    pub fn from_words<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        let mut out = ArrayVec::new();
        for w in words {
            if out.try_push(w.to_string()).is_err() {
                break;
            }
        }
        TaskList(out)
    }

    pub fn default_vocabulary() -> Self {
        Self::from_words(DEFAULT_VOCABULARY)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<'de> Deserialize<'de> for TaskList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = TaskList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of command strings")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut out = ArrayVec::<String, MAX_TASKS>::new();
                while let Some(t) = seq.next_element::<String>()? {
                    out.try_push(t)
                        .map_err(|_| serde::de::Error::custom("too many tasks"))?;
                }
                Ok(TaskList(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

impl Serialize for TaskList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.0.iter())
    }
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub role: Role,
    pub index: usize,
    /// Destination name of the peer, e.g. `display0`.
    pub name: String,
    pub title: String,
    pub screen: ScreenSize,
    #[serde(default)]
    pub tasks: TaskList,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    /// `seq` of the peer message that caused the error, 0 when unknown.
    #[serde(default)]
    pub request_seq: u64,
    pub code: ErrorCode,
    pub message: String,
}

// ============== Parsing ==============

/// Messages the engine receives from peers.
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Instruction(InstructionMessage),
    Unknown(UnknownMessage),
}

/// Messages a peer receives from the engine.
#[derive(Debug, Clone)]
pub enum PeerMessage {
    Welcome(WelcomeMessage),
    Instruction(InstructionMessage),
    Error(ErrorMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

#[derive(Debug, Deserialize)]
struct TypeOnly<'a> {
    #[serde(rename = "type")]
    msg_type: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SeqOnly {
    seq: Option<u64>,
}

fn unknown_or<E>(json: &str, known: &[&str], e: E) -> Result<UnknownMessage, E>
where
    E: From<serde_json::Error>,
{
    let msg_type = serde_json::from_str::<TypeOnly>(json)?
        .msg_type
        .unwrap_or("unknown");
    if !known.contains(&msg_type) {
        let seq = serde_json::from_str::<SeqOnly>(json)?.seq.unwrap_or(0);
        return Ok(UnknownMessage { seq });
    }
    Err(e)
}

/// Parse a line sent by a peer.
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "instruction")]
        Instruction(InstructionMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Instruction(m)) => Ok(ParsedMessage::Instruction(m)),
        // Unknown message type is not a hard parse error for the protocol.
        Err(e) => unknown_or(json, &["hello", "instruction"], e).map(ParsedMessage::Unknown),
    }
}

/// Parse a line sent by the engine.
pub fn parse_peer_message(json: &str) -> Result<PeerMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum OutboundMessage {
        #[serde(rename = "welcome")]
        Welcome(WelcomeMessage),
        #[serde(rename = "instruction")]
        Instruction(InstructionMessage),
        #[serde(rename = "error")]
        Error(ErrorMessage),
    }

    match serde_json::from_str::<OutboundMessage>(json) {
        Ok(OutboundMessage::Welcome(m)) => Ok(PeerMessage::Welcome(m)),
        Ok(OutboundMessage::Instruction(m)) => Ok(PeerMessage::Instruction(m)),
        Ok(OutboundMessage::Error(m)) => Ok(PeerMessage::Error(m)),
        Err(e) => unknown_or(json, &["welcome", "instruction", "error"], e).map(PeerMessage::Unknown),
    }
}

/// Best-effort `seq` extraction from a line that failed to parse.
pub fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let mut end = 0usize;
    for b in rest.as_bytes() {
        if b.is_ascii_digit() {
            end += 1;
        } else {
            break;
        }
    }
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

// ============== Utility Functions ==============

/// Create a hello message
pub fn create_hello(seq: u64, role: Role, name: &str) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        ts: current_timestamp_ms(),
        role,
        name: name.to_string(),
        protocol_version: PROTOCOL_VERSION.to_string(),
    }
}

/// Wrap an instruction for the wire
pub fn create_instruction(seq: u64, instruction: Instruction) -> InstructionMessage {
    InstructionMessage {
        msg_type: InstructionType::Instruction,
        seq,
        ts: current_timestamp_ms(),
        task: instruction.task,
        args: instruction.args,
        to: instruction.to,
    }
}

/// Create a welcome message
pub fn create_welcome(
    seq: u64,
    role: Role,
    index: usize,
    title: &str,
    screen: ScreenSize,
    tasks: TaskList,
) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        role,
        index,
        name: role.destination(index).to_string(),
        title: title.to_string(),
        screen,
        tasks,
    }
}

/// Create an error message answering the peer message `request_seq`
pub fn create_error(request_seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq: 0,
        ts: current_timestamp_ms(),
        request_seq,
        code,
        message: message.to_string(),
    }
}

/// Whether a peer's protocol version can talk to this build.
pub fn is_compatible_version(version: &str) -> bool {
    let major = PROTOCOL_VERSION.split('.').next().unwrap_or("1");
    version.split('.').next() == Some(major)
}

/// Get current timestamp in milliseconds
pub(crate) fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hello() {
        let json = r#"{"type":"hello","seq":1,"ts":1234567890,"role":"display","name":"tty-1","protocol_version":"1.0.0"}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Hello(msg) => {
                assert_eq!(msg.msg_type, HelloType::Hello);
                assert_eq!(msg.seq, 1);
                assert_eq!(msg.role, Role::Display);
                assert_eq!(msg.name, "tty-1");
            }
            other => panic!("Expected Hello message, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_instruction() {
        let json = r#"{"type":"instruction","seq":2,"ts":1,"task":"print","args":[3,"hi"],"to":"display0"}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Instruction(msg) => {
                assert_eq!(msg.seq, 2);
                let ins = msg.into_instruction();
                assert_eq!(ins.task(), Task::Print);
                assert_eq!(ins.args(), &[Arg::Int(3), Arg::Text("hi".into())]);
                assert_eq!(ins.destination(), Destination::Display(0));
            }
            other => panic!("Expected Instruction message, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let json = r#"{"type":"observation","seq":9,"ts":1}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Unknown(u) => assert_eq!(u.seq, 9),
            other => panic!("Expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_destination_is_an_error() {
        let json = r#"{"type":"instruction","seq":2,"ts":1,"task":"print","to":"moon"}"#;
        assert!(parse_message(json).is_err());
    }

    #[test]
    fn test_welcome_roundtrip_through_peer_parser() {
        let welcome = create_welcome(
            1,
            Role::Input,
            3,
            "game",
            ScreenSize {
                height: 40,
                width: 70,
            },
            TaskList::default_vocabulary(),
        );
        assert_eq!(welcome.name, "input3");

        let line = serde_json::to_string(&welcome).unwrap();
        match parse_peer_message(&line).unwrap() {
            PeerMessage::Welcome(w) => {
                assert_eq!(w.index, 3);
                assert_eq!(w.tasks.iter().collect::<Vec<_>>(), DEFAULT_VOCABULARY);
            }
            other => panic!("Expected Welcome, got {other:?}"),
        }
    }

    #[test]
    fn test_task_list_limit() {
        let words: Vec<String> = (0..MAX_TASKS + 1).map(|i| format!("\"t{i}\"")).collect();
        let json = format!("[{}]", words.join(","));
        assert!(serde_json::from_str::<TaskList>(&json).is_err());
    }

    #[test]
    fn test_create_error() {
        let error = create_error(5, ErrorCode::HandshakeRequired, "Send hello first");
        assert_eq!(error.msg_type, ErrorType::Error);
        let v: serde_json::Value = serde_json::to_value(&error).unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["code"], "handshake_required");
        assert_eq!(v["request_seq"], 5);
    }

    #[test]
    fn test_version_compatibility() {
        assert!(is_compatible_version("1.2.0"));
        assert!(!is_compatible_version("2.0.0"));
    }

    #[test]
    fn test_extract_seq_best_effort() {
        assert_eq!(extract_seq_best_effort(r#"{"seq": 42, broken"#), Some(42));
        assert_eq!(extract_seq_best_effort("garbage"), None);
    }
}
