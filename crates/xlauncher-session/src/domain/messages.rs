//! Typed wire commands for the launcher server protocol.
//!
//! Text frames on the wire are JSON objects with a `"type"` discriminant.
//! Most commands wrap their arguments in a `"data"` object; the screen
//! sharing, settings, and input commands put their fields at the top level.  Serde's
//! `#[serde(tag = "type")]` attribute reproduces both shapes:
//!
//! ```json
//! {"type":"launch_app","data":{"path":"/usr/bin/gimp","arguments":[]}}
//! {"type":"start_sharing","width":1280,"height":720,"quality":60,"fps":15}
//! {"type":"list_apps"}
//! ```
//!
//! The session core never *interprets* inbound `type` values — routing
//! server replies is the consumer's job.  This module only gives outbound
//! command construction a typed surface so callers cannot misspell a
//! discriminant or forget a field.

use serde::{Deserialize, Serialize};

// ── Command argument objects ──────────────────────────────────────────────────

/// Arguments for `launch_app`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchAppData {
    /// Executable path on the server machine.
    pub path: String,
    /// Extra command-line arguments (usually empty).
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// Reference to an application known to the server, by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRef {
    pub id: String,
}

/// A full application record for `add_app`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSpec {
    pub id: String,
    pub name: String,
    pub path: String,
    /// Extra command-line arguments (may be empty).
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// A config file location on the server, for `save_config` / `load_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPath {
    pub path: String,
}

/// Inline config file content for `upload_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigContent {
    pub content: String,
}

// ── The command enum ──────────────────────────────────────────────────────────

/// All commands the xlauncher front-ends send to the launcher server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireCommand {
    /// Ask the server for its list of launchable applications.
    ListApps,
    /// Launch an executable on the server machine.
    LaunchApp { data: LaunchAppData },
    /// Close a previously launched application.
    CloseApp { data: AppRef },
    /// Register a new launchable application.
    AddApp { data: AppSpec },
    /// Remove a registered application.
    RemoveApp { data: AppRef },
    /// Persist the server's application list to a config file.
    SaveConfig { data: ConfigPath },
    /// Reload the server's application list from a config file.
    LoadConfig { data: ConfigPath },
    /// Upload config file content directly.
    UploadConfig { data: ConfigContent },
    /// Adjust the live screen stream's quality and frame rate.
    UpdateSettings { quality: u8, fps: u8 },
    /// Start streaming the server's screen as binary frames.
    StartSharing {
        width: u32,
        height: u32,
        quality: u8,
        fps: u8,
    },
    /// Stop the screen stream.
    StopSharing,
    /// Forward a user input event to the shared screen.
    ///
    /// The detail fields vary by event (`x`/`y` for mouse events, `key` for
    /// keyboard events) and are carried opaquely at the top level of the
    /// JSON object, matching the flat wire shape.
    InputEvent {
        #[serde(rename = "eventType")]
        event_type: String,
        #[serde(flatten)]
        detail: serde_json::Map<String, serde_json::Value>,
    },
}

impl WireCommand {
    /// Shorthand for a `launch_app` command with no extra arguments.
    pub fn launch_app(path: impl Into<String>) -> Self {
        WireCommand::LaunchApp {
            data: LaunchAppData {
                path: path.into(),
                arguments: Vec::new(),
            },
        }
    }

    /// Shorthand for a `close_app` command.
    pub fn close_app(id: impl Into<String>) -> Self {
        WireCommand::CloseApp {
            data: AppRef { id: id.into() },
        }
    }

    /// Shorthand for a `remove_app` command.
    pub fn remove_app(id: impl Into<String>) -> Self {
        WireCommand::RemoveApp {
            data: AppRef { id: id.into() },
        }
    }
}

impl From<WireCommand> for super::log::Payload {
    /// Commands log and transmit as their structured JSON form.
    fn from(command: WireCommand) -> Self {
        // An in-memory command enum always serializes; a failure here would
        // be a bug in the serde derives, so fall back to a null value rather
        // than panicking in library code.
        let value = serde_json::to_value(&command).unwrap_or(serde_json::Value::Null);
        super::log::Payload::Json(value)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
