//! Configuration management for the Symphovert CLI
//!
//! Built-in defaults, then an optional TOML file, then `SYMPHOVERT_*`
//! environment variables. The defaults are the values the conversion
//! protocol was tuned with against IBM Symphony on Windows.

use crate::conductor::ExistingArtifactPolicy;
use crate::desktop::{KeyChord, LaunchCommand};
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// CLI Configuration Constants
// ============================================================================

/// Tool name this driver claims in the catalog's per-record convert action.
pub const DEFAULT_TOOL_NAME: &str = "symphovert";

/// Executable started for every conversion.
pub const DEFAULT_EXECUTABLE: &str = "symphony.exe";

/// Environment variable overriding [`Config::application`]'s executable.
pub const ENV_EXECUTABLE: &str = "SYMPHOVERT_EXECUTABLE";

/// Environment variable overriding [`Config::tool_name`].
pub const ENV_TOOL_NAME: &str = "SYMPHOVERT_TOOL_NAME";

/// Fixed waits of the conversion protocol, in milliseconds
///
/// Each wait is dead time tuned by hand: the application exposes no
/// readiness or completion signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverTimings {
    /// Pause after every synthetic key chord or key press
    pub action_pause_ms: u64,
    /// After launch, before the window is assumed interactive
    pub launch_settle_ms: u64,
    /// Between the individual key events of the open chord
    pub open_chord_interval_ms: u64,
    /// After the open chord, before pasting the source path
    pub open_dialog_ms: u64,
    /// After confirming the source path
    pub after_open_ms: u64,
    /// After dismissing the stray dialog, while the document loads
    pub document_load_ms: u64,
    /// Between the individual key events of the save-as chord
    pub save_as_chord_interval_ms: u64,
    /// After confirming the destination path, while the file is written
    pub after_save_ms: u64,
    /// After killing the application process
    pub after_app_kill_ms: u64,
    /// After killing each runtime subprocess
    pub after_runtime_kill_ms: u64,
}

impl Default for DriverTimings {
    fn default() -> Self {
        Self {
            action_pause_ms: 1000,
            launch_settle_ms: 2000,
            open_chord_interval_ms: 500,
            open_dialog_ms: 1000,
            after_open_ms: 500,
            document_load_ms: 2000,
            save_as_chord_interval_ms: 100,
            after_save_ms: 2000,
            after_app_kill_ms: 500,
            after_runtime_kill_ms: 1000,
        }
    }
}

impl DriverTimings {
    /// Every wait set to zero (tests)
    pub fn zero() -> Self {
        Self {
            action_pause_ms: 0,
            launch_settle_ms: 0,
            open_chord_interval_ms: 0,
            open_dialog_ms: 0,
            after_open_ms: 0,
            document_load_ms: 0,
            save_as_chord_interval_ms: 0,
            after_save_ms: 0,
            after_app_kill_ms: 0,
            after_runtime_kill_ms: 0,
        }
    }

    pub fn action_pause(&self) -> Duration {
        Duration::from_millis(self.action_pause_ms)
    }

    pub fn launch_settle(&self) -> Duration {
        Duration::from_millis(self.launch_settle_ms)
    }

    pub fn open_chord_interval(&self) -> Duration {
        Duration::from_millis(self.open_chord_interval_ms)
    }

    pub fn open_dialog(&self) -> Duration {
        Duration::from_millis(self.open_dialog_ms)
    }

    pub fn after_open(&self) -> Duration {
        Duration::from_millis(self.after_open_ms)
    }

    pub fn document_load(&self) -> Duration {
        Duration::from_millis(self.document_load_ms)
    }

    pub fn save_as_chord_interval(&self) -> Duration {
        Duration::from_millis(self.save_as_chord_interval_ms)
    }

    pub fn after_save(&self) -> Duration {
        Duration::from_millis(self.after_save_ms)
    }

    pub fn after_app_kill(&self) -> Duration {
        Duration::from_millis(self.after_app_kill_ms)
    }

    pub fn after_runtime_kill(&self) -> Duration {
        Duration::from_millis(self.after_runtime_kill_ms)
    }
}

/// How to start, drive and stop the external application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationProfile {
    /// Executable name or path, looked up on PATH
    pub executable: String,
    /// Arguments passed to the executable
    pub launch_args: Vec<String>,
    /// Image-name prefix of the application process
    pub process_pattern: String,
    /// Image-name prefixes of runtime subprocesses that outlive the application
    pub runtime_patterns: Vec<String>,
    pub open_chord: KeyChord,
    pub save_as_chord: KeyChord,
    pub paste_chord: KeyChord,
}

impl Default for ApplicationProfile {
    fn default() -> Self {
        use crate::desktop::Key;

        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            launch_args: Vec::new(),
            process_pattern: "symphony".to_string(),
            runtime_patterns: vec!["soffice".to_string()],
            open_chord: KeyChord::new(vec![Key::Ctrl, Key::Char('o')]),
            save_as_chord: KeyChord::new(vec![Key::Ctrl, Key::Shift, Key::Char('s')]),
            paste_chord: KeyChord::new(vec![Key::Ctrl, Key::Char('v')]),
        }
    }
}

impl ApplicationProfile {
    pub fn launch_command(&self) -> LaunchCommand {
        LaunchCommand::new(self.executable.clone()).with_args(self.launch_args.iter().cloned())
    }
}

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Declared conversion tool handled by this driver
    pub tool_name: String,

    pub application: ApplicationProfile,

    pub timings: DriverTimings,

    /// Extra `format identifier -> extension` routes, overriding built-ins
    pub routing: BTreeMap<String, String>,

    /// What to do with a record whose master copy is already catalogued
    pub existing_artifact: ExistingArtifactPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            application: ApplicationProfile::default(),
            timings: DriverTimings::default(),
            routing: BTreeMap::new(),
            existing_artifact: ExistingArtifactPolicy::default(),
        }
    }
}

impl Config {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TOML config file; missing keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn merge_env(mut self) -> Self {
        if let Ok(executable) = std::env::var(ENV_EXECUTABLE) {
            self.application.executable = executable;
        }

        if let Ok(tool) = std::env::var(ENV_TOOL_NAME) {
            self.tool_name = tool;
        }

        self
    }

    /// Defaults, then `file` if given, then environment; validated
    pub fn resolve(file: Option<&Path>) -> Result<Self> {
        let config = match file {
            Some(path) => Self::load(path)?,
            None => Self::new(),
        };
        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the driver cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.tool_name.trim().is_empty() {
            return Err(CliError::config("tool_name must not be empty"));
        }

        if self.application.executable.trim().is_empty() {
            return Err(CliError::config("application.executable must not be empty"));
        }

        if self.application.process_pattern.trim().is_empty()
            || self.application.runtime_patterns.iter().any(|p| p.trim().is_empty())
        {
            return Err(CliError::config("process patterns must not be empty"));
        }

        for (format, extension) in &self.routing {
            extension.parse::<crate::routing::TargetFormat>().map_err(|e| {
                CliError::config(format!("routing entry '{}': {}", format, e))
            })?;
        }

        Ok(())
    }
}
