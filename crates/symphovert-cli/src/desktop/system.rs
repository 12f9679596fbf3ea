//! The real desktop: system clipboard, OS keyboard input, OS processes

use super::{DesktopError, DesktopSession, Key, KeyChord, LaunchCommand};
use arboard::Clipboard;
use std::process::{Command, Stdio};
use std::time::Duration;
use sysinfo::System;
use tracing::debug;

/// Desktop session backed by the machine the CLI runs on
///
/// The clipboard handle is opened on first use, so constructing a
/// `SystemDesktop` never fails, even without a display.
#[derive(Default)]
pub struct SystemDesktop {
    clipboard: Option<Clipboard>,
}

impl SystemDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    fn clipboard(&mut self) -> Result<&mut Clipboard, DesktopError> {
        if self.clipboard.is_none() {
            let clipboard =
                Clipboard::new().map_err(|e| DesktopError::Clipboard(e.to_string()))?;
            self.clipboard = Some(clipboard);
        }
        self.clipboard
            .as_mut()
            .ok_or_else(|| DesktopError::Clipboard("clipboard handle lost".to_string()))
    }
}

impl DesktopSession for SystemDesktop {
    fn set_clipboard(&mut self, text: &str) -> Result<(), DesktopError> {
        self.clipboard()?
            .set_text(text.to_string())
            .map_err(|e| DesktopError::Clipboard(e.to_string()))
    }

    fn send_chord(&mut self, chord: &KeyChord) -> Result<(), DesktopError> {
        let mut pressed: Vec<Key> = Vec::with_capacity(chord.keys().len());

        for key in chord.keys() {
            if let Err(e) = send_key(*key, false) {
                release_all(&pressed);
                return Err(e);
            }
            pressed.push(*key);
            std::thread::sleep(chord.interval());
        }

        for key in chord.keys().iter().rev() {
            send_key(*key, true)?;
            std::thread::sleep(chord.interval());
        }

        Ok(())
    }

    fn launch(&mut self, command: &LaunchCommand) -> Result<(), DesktopError> {
        let program = which::which(&command.program).map_err(|e| {
            DesktopError::Launch(format!("could not find {}: {}", command.program, e))
        })?;
        debug!(program = %program.display(), args = ?command.args, "launching application");

        let output = Command::new(&program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                DesktopError::Launch(format!("could not execute {}: {}", program.display(), e))
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            Err(DesktopError::Launch(format!(
                "{} exited with {}",
                command.program, output.status
            )))
        } else {
            Err(DesktopError::Launch(stderr))
        }
    }

    fn terminate(&mut self, pattern: &str) -> Result<usize, DesktopError> {
        let pattern = pattern.to_lowercase();
        if pattern.is_empty() {
            return Err(DesktopError::Process(
                "refusing to kill with an empty name pattern".to_string(),
            ));
        }

        let system = System::new_all();
        let mut killed = 0;
        for (pid, process) in system.processes() {
            let name = process.name().to_string_lossy().to_lowercase();
            if name.starts_with(&pattern) && process.kill() {
                debug!(pid = %pid, name = %name, "killed process");
                killed += 1;
            }
        }

        Ok(killed)
    }

    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

fn release_all(pressed: &[Key]) {
    for key in pressed.iter().rev() {
        let _ = send_key(*key, true);
    }
}

#[cfg(windows)]
fn send_key(key: Key, up: bool) -> Result<(), DesktopError> {
    super::win_input::send_key(key, up)
}

#[cfg(not(windows))]
fn send_key(_key: Key, _up: bool) -> Result<(), DesktopError> {
    Err(DesktopError::Unsupported("keyboard injection"))
}
