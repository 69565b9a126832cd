//! Shared types module - the instruction envelope and constants
//!
//! This module defines the vocabulary every process in the game speaks.
//! The types are plain data with serde support, so they can travel over the
//! engine's line protocol unchanged and be used by core logic, the display,
//! and the input screen alike.
//!
//! # Processes
//!
//! | Process | Destination | Role |
//! |---------|-------------|------|
//! | engine | `displayEngine` | routes instructions, owns the game channel |
//! | display N | `displayN` | owns a frame buffer and a terminal |
//! | input N | `inputN` | reads and validates commands |
//! | game logic | `game` | consumes instructions addressed to the game |
//!
//! # Defaults
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `DEFAULT_SCREEN_HEIGHT` | 40 | Display rows |
//! | `DEFAULT_SCREEN_WIDTH` | 70 | Display columns |
//! | `DEFAULT_BUFFER_LEN` | 5 | Frames pending per display |
//! | `DEFAULT_CLOCK_MS` | 100 | Engine wait and display tick |
//! | `DEFAULT_ENGINE_QUEUE` | 20 | Engine local instruction queue |
//! | `MAX_FRAME_CELLS` | 1048576 | Largest frame (`height * width`) anyone builds |
//!
//! # Examples
//!
//! ```
//! use textgame_types::{Arg, Destination, Instruction, Task};
//!
//! let dest = Destination::from_str("display0").unwrap();
//! assert_eq!(dest, Destination::Display(0));
//!
//! let ins = Instruction::new(Task::Print, dest)
//!     .with_arg(Arg::Text("hello".into()))
//!     .with_arg(Arg::Int(3));
//! assert_eq!(ins.text_from(0).as_deref(), Some("hello 3"));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Display rows for a new screen.
pub const DEFAULT_SCREEN_HEIGHT: u16 = 40;

/// Display columns for a new screen.
pub const DEFAULT_SCREEN_WIDTH: u16 = 70;

/// Frames a display can hold before new ones are dropped.
pub const DEFAULT_BUFFER_LEN: usize = 5;

/// Engine wait and display tick in milliseconds.
pub const DEFAULT_CLOCK_MS: u64 = 100;

/// Maximum number of display peers the engine accepts.
pub const DEFAULT_MAX_DISPLAYS: usize = 2;

/// Maximum number of input peers the engine accepts.
pub const DEFAULT_MAX_INPUTS: usize = 2;

/// Capacity of the engine's local instruction queue.
pub const DEFAULT_ENGINE_QUEUE: usize = 20;

/// Prompt shown by the input screen.
pub const DEFAULT_PROMPT: &str = "Input: ";

/// Commands an input screen accepts unless the engine sends another list.
pub const DEFAULT_VOCABULARY: [&str; 4] = ["print", "clear", "fill", "stop"];

/// Character a blank display is filled with.
pub const DEFAULT_FILL_CHAR: char = ' ';

/// Upper bound on `height * width` for any frame, sprite or display.
pub const MAX_FRAME_CELLS: usize = 1 << 20;

/// Marker for an empty cell inside [`GridData`] rows.
pub const EMPTY_CELL: char = '\u{0}';

/// Process an instruction is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Input screen with the given index (`input0`, `input1`, ...)
    Input(usize),
    /// Display with the given index (`display0`, `display1`, ...)
    Display(usize),
    /// The engine itself (`displayEngine`)
    Engine,
    /// Game logic behind the engine (`game`)
    Game,
}

impl Destination {
    /// Parse a destination name.
    ///
    /// # Examples
    ///
    /// ```
    /// use textgame_types::Destination;
    ///
    /// assert_eq!(Destination::from_str("input0"), Some(Destination::Input(0)));
    /// assert_eq!(Destination::from_str("display12"), Some(Destination::Display(12)));
    /// assert_eq!(Destination::from_str("displayEngine"), Some(Destination::Engine));
    /// assert_eq!(Destination::from_str("game"), Some(Destination::Game));
    /// assert_eq!(Destination::from_str("display"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("displayEngine") || s.eq_ignore_ascii_case("engine") {
            return Some(Destination::Engine);
        }
        if s.eq_ignore_ascii_case("game") {
            return Some(Destination::Game);
        }
        if let Some(n) = strip_prefix_ci(s, "display") {
            return parse_index(n).map(Destination::Display);
        }
        if let Some(n) = strip_prefix_ci(s, "input") {
            return parse_index(n).map(Destination::Input);
        }
        None
    }

    /// Peer role this destination belongs to, if it is a peer.
    pub fn role(&self) -> Option<Role> {
        match self {
            Destination::Input(_) => Some(Role::Input),
            Destination::Display(_) => Some(Role::Display),
            Destination::Engine | Destination::Game => None,
        }
    }
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s.is_char_boundary(prefix.len()) {
        let (head, tail) = s.split_at(prefix.len());
        if head.eq_ignore_ascii_case(prefix) {
            return Some(tail);
        }
    }
    None
}

fn parse_index(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Input(n) => write!(f, "input{n}"),
            Destination::Display(n) => write!(f, "display{n}"),
            Destination::Engine => f.write_str("displayEngine"),
            Destination::Game => f.write_str("game"),
        }
    }
}

impl Serialize for Destination {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Destination {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Destination::from_str(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid destination: {s}")))
    }
}

/// Kind of peer process connected to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "display")]
    Display,
    #[serde(rename = "input")]
    Input,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Display => "display",
            Role::Input => "input",
        }
    }

    /// Destination of the peer with this role and index.
    pub fn destination(&self, index: usize) -> Destination {
        match self {
            Role::Display => Destination::Display(index),
            Role::Input => Destination::Input(index),
        }
    }
}

/// Tasks an instruction can carry.
///
/// Which process understands which task:
/// - **display**: print, clear, fill, drawSprite, updateFrameBuffer, updateDisplay,
///   changeDisplaySize, resetDisplay, returnSize, changeTitle, hideLogs, stop
/// - **input**: getFromPrompt, changeTitle, hideLogs, stop
/// - **engine**: start, stop, hideLogs
/// - **game**: reportSize and anything forwarded by players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Print,
    Clear,
    Fill,
    Stop,
    Start,
    Help,
    GetFromPrompt,
    ChangeTitle,
    HideLogs,
    ChangeDisplaySize,
    ResetDisplay,
    UpdateDisplay,
    UpdateFrameBuffer,
    ReturnSize,
    ReportSize,
    DrawSprite,
}

impl Task {
    /// Parse a task name (case-insensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use textgame_types::Task;
    ///
    /// assert_eq!(Task::from_str("print"), Some(Task::Print));
    /// assert_eq!(Task::from_str("getFromPrompt"), Some(Task::GetFromPrompt));
    /// assert_eq!(Task::from_str("CHANGETITLE"), Some(Task::ChangeTitle));
    /// assert_eq!(Task::from_str("jump"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "print" => Some(Task::Print),
            "clear" => Some(Task::Clear),
            "fill" => Some(Task::Fill),
            "stop" => Some(Task::Stop),
            "start" => Some(Task::Start),
            "help" => Some(Task::Help),
            "getfromprompt" => Some(Task::GetFromPrompt),
            "changetitle" => Some(Task::ChangeTitle),
            "hidelogs" => Some(Task::HideLogs),
            "changedisplaysize" => Some(Task::ChangeDisplaySize),
            "resetdisplay" => Some(Task::ResetDisplay),
            "updatedisplay" => Some(Task::UpdateDisplay),
            "updateframebuffer" => Some(Task::UpdateFrameBuffer),
            "returnsize" => Some(Task::ReturnSize),
            "reportsize" => Some(Task::ReportSize),
            "drawsprite" => Some(Task::DrawSprite),
            _ => None,
        }
    }

    /// camelCase wire spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Print => "print",
            Task::Clear => "clear",
            Task::Fill => "fill",
            Task::Stop => "stop",
            Task::Start => "start",
            Task::Help => "help",
            Task::GetFromPrompt => "getFromPrompt",
            Task::ChangeTitle => "changeTitle",
            Task::HideLogs => "hideLogs",
            Task::ChangeDisplaySize => "changeDisplaySize",
            Task::ResetDisplay => "resetDisplay",
            Task::UpdateDisplay => "updateDisplay",
            Task::UpdateFrameBuffer => "updateFrameBuffer",
            Task::ReturnSize => "returnSize",
            Task::ReportSize => "reportSize",
            Task::DrawSprite => "drawSprite",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Task {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Task {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Task::from_str(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown task: {s}")))
    }
}

/// A frame as it travels over the wire.
///
/// `rows` holds one string per row; [`EMPTY_CELL`] marks an empty cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridData {
    pub height: u16,
    pub width: u16,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub row: u16,
    #[serde(default)]
    pub col: u16,
    pub rows: Vec<String>,
}

fn default_priority() -> u8 {
    1
}

/// One instruction argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arg {
    Int(i64),
    Text(String),
    Grid(GridData),
}

impl Arg {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Arg::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_grid(&self) -> Option<&GridData> {
        match self {
            Arg::Grid(g) => Some(g),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Int(v) => write!(f, "{v}"),
            Arg::Text(s) => f.write_str(s),
            Arg::Grid(g) => write!(f, "<grid {}x{}>", g.height, g.width),
        }
    }
}

impl From<i64> for Arg {
    fn from(v: i64) -> Self {
        Arg::Int(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Text(v.to_string())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Text(v)
    }
}

impl From<GridData> for Arg {
    fn from(v: GridData) -> Self {
        Arg::Grid(v)
    }
}

/// The message envelope passed between processes: a task, its arguments,
/// and where it should go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub task: Task,
    #[serde(default)]
    pub args: Vec<Arg>,
    pub to: Destination,
}

impl Instruction {
    pub fn new(task: Task, to: Destination) -> Self {
        Self {
            task,
            args: Vec::new(),
            to,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = Arg>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn with_arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn destination(&self) -> Destination {
        self.to
    }

    pub fn int_arg(&self, i: usize) -> Option<i64> {
        self.args.get(i).and_then(Arg::as_int)
    }

    pub fn text_arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).and_then(Arg::as_text)
    }

    pub fn grid_arg(&self, i: usize) -> Option<&GridData> {
        self.args.get(i).and_then(Arg::as_grid)
    }

    /// Join the arguments from index `i` on with single spaces.
    ///
    /// Returns `None` when there are no arguments past `i`.
    pub fn text_from(&self, i: usize) -> Option<String> {
        let rest = self.args.get(i..)?;
        if rest.is_empty() {
            return None;
        }
        let mut out = String::new();
        for (n, arg) in rest.iter().enumerate() {
            if n > 0 {
                out.push(' ');
            }
            out.push_str(&arg.to_string());
        }
        Some(out)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.task, self.to)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
