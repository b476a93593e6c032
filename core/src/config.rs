/// Configuration management
use crate::error::{ChatViewError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Pretty-printed JSON of the final derived view
    Json,
    /// Coloured transcript, one line per message
    #[default]
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = ChatViewError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            other => Err(ChatViewError::Config(format!(
                "Unknown format '{}' (expected json or text)",
                other
            ))),
        }
    }
}

/// Replay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Conversation snapshot (JSON)
    pub snapshot_path: PathBuf,

    /// Optional event log replayed on top of the snapshot (JSON lines)
    pub events_path: Option<PathBuf>,

    /// Participant the view is derived for
    pub viewer_id: String,

    /// How the final view is printed
    pub format: OutputFormat,

    /// Capacity of the hub's broadcast channel and the transport queue
    pub event_buffer: usize,

    /// Text of a not-yet-acknowledged message appended after the replay
    pub compose: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("conversation.json"),
            events_path: None,
            viewer_id: String::new(),
            format: OutputFormat::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
            compose: None,
        }
    }
}

impl Config {
    /// Create config from command line arguments
    pub fn from_args(args: &[String]) -> Result<Self> {
        if args.len() < 2 {
            return Err(ChatViewError::Config(format!(
                "Usage: {} <snapshot.json> --viewer <id> [--events <file.jsonl>] [--format json|text] [--buffer <n>] [--compose <text>]",
                args.first().map(|s| s.as_str()).unwrap_or("chatview")
            )));
        }

        let snapshot_path = PathBuf::from(&args[1]);
        let mut events_path: Option<PathBuf> = None;
        let mut viewer_id: Option<String> = None;
        let mut format = OutputFormat::default();
        let mut event_buffer = DEFAULT_EVENT_BUFFER;
        let mut compose: Option<String> = None;

        let mut i = 2;
        while i < args.len() {
            let value = |flag: &str| {
                args.get(i + 1).ok_or_else(|| {
                    ChatViewError::Config(format!("{} requires an argument", flag))
                })
            };
            match args[i].as_str() {
                "--viewer" => {
                    viewer_id = Some(value("--viewer")?.clone());
                    i += 2;
                }
                "--events" => {
                    events_path = Some(PathBuf::from(value("--events")?));
                    i += 2;
                }
                "--format" => {
                    format = value("--format")?.parse()?;
                    i += 2;
                }
                "--buffer" => {
                    event_buffer = parse_buffer(value("--buffer")?)?;
                    i += 2;
                }
                "--compose" => {
                    compose = Some(value("--compose")?.clone());
                    i += 2;
                }
                other => {
                    return Err(ChatViewError::Config(format!(
                        "Unexpected argument: {}",
                        other
                    )));
                }
            }
        }

        // Env overrides (nice for scripts)
        if let Ok(v) = std::env::var("CHATVIEW_VIEWER") {
            viewer_id = Some(v);
        }
        if let Ok(f) = std::env::var("CHATVIEW_FORMAT") {
            format = f.parse()?;
        }
        if let Some(n) = std::env::var("CHATVIEW_EVENT_BUFFER")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            event_buffer = n;
        }

        let viewer_id = viewer_id
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ChatViewError::Config("--viewer <id> is required".to_string()))?;

        Ok(Self {
            snapshot_path,
            events_path,
            viewer_id,
            format,
            event_buffer: event_buffer.max(1),
            compose,
        })
    }
}

fn parse_buffer(s: &str) -> Result<usize> {
    s.parse::<usize>()
        .map_err(|_| ChatViewError::Config("--buffer must be a positive number".to_string()))
}
