use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapter::ServerConfig;
use crate::types::{DEFAULT_CLOCK_MS, DEFAULT_ENGINE_QUEUE};

/// Binary a display peer runs.
pub const DISPLAY_BIN: &str = "textgame-display";

/// Binary an input peer runs.
pub const INPUT_BIN: &str = "textgame-input";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub server: ServerConfig,
    /// Loop wait between checks of the running flag.
    pub clock: Duration,
    /// Local instruction queue capacity.
    pub queue_len: usize,
    /// Command prefix that opens a new terminal, e.g. `gnome-terminal --`.
    /// Empty runs peers directly.
    pub launcher: Vec<String>,
    /// Launch one display and one input on start.
    pub spawn_peers: bool,
    /// Directory holding the peer binaries.
    pub bin_dir: Option<PathBuf>,
    /// How long start waits for peers to register.
    pub connect_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            clock: Duration::from_millis(DEFAULT_CLOCK_MS),
            queue_len: DEFAULT_ENGINE_QUEUE,
            launcher: Vec::new(),
            spawn_peers: true,
            bin_dir: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    /// Create from `TEXTGAME_*` environment variables.
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();

        let clock = env_parse::<u64>("TEXTGAME_CLOCK_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.clock);
        let launcher = env::var("TEXTGAME_TERMINAL")
            .map(|s| parse_launcher(&s))
            .unwrap_or(defaults.launcher);
        let spawn_peers = !env::var("TEXTGAME_NO_SPAWN")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        let connect_timeout = env_parse::<u64>("TEXTGAME_CONNECT_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.connect_timeout);

        Self {
            server: ServerConfig::from_env(),
            clock,
            queue_len: defaults.queue_len,
            launcher,
            spawn_peers,
            bin_dir: env::var_os("TEXTGAME_BIN_DIR").map(PathBuf::from),
            connect_timeout,
        }
    }

    /// Full path of a peer binary.
    ///
    /// Defaults to the directory of the running executable.
    pub fn peer_bin(&self, name: &str) -> PathBuf {
        let file = format!("{name}{}", std::env::consts::EXE_SUFFIX);
        let dir = self.bin_dir.clone().or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(Path::to_path_buf))
        });
        match dir {
            Some(d) => d.join(file),
            None => PathBuf::from(file),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn is_truthy(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Split a launcher prefix on whitespace.
pub fn parse_launcher(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}
