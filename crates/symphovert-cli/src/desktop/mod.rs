//! Interaction primitives against the interactive desktop session
//!
//! The conversion driver only ever talks to the desktop through
//! [`DesktopSession`]. [`SystemDesktop`] is the real implementation; tests
//! substitute a scripted session.

pub mod keys;
pub mod system;

#[cfg(windows)]
mod win_input;

pub use keys::{Key, KeyChord};
pub use system::SystemDesktop;

use std::time::Duration;
use thiserror::Error;

/// Failures of a single interaction primitive
#[derive(Error, Debug)]
pub enum DesktopError {
    /// The application could not be started, or exited with an error
    #[error("{0}")]
    Launch(String),

    /// Clipboard could not be opened or written
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    /// Synthetic input was rejected by the OS
    #[error("input injection failed: {0}")]
    Input(String),

    /// Process table could not be inspected
    #[error("process control failed: {0}")]
    Process(String),

    /// Primitive not available on this platform
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

/// How to start the external application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl std::fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Low-level operations on the desktop the application runs in
///
/// None of these report whether the application *reacted*; there is no such
/// signal. An `Ok` only means the primitive itself was carried out.
pub trait DesktopSession {
    /// Replace the system clipboard text
    fn set_clipboard(&mut self, text: &str) -> Result<(), DesktopError>;

    /// Press the chord's keys in order, then release them in reverse
    fn send_chord(&mut self, chord: &KeyChord) -> Result<(), DesktopError>;

    /// Run the launch command; `Err` carries the process's diagnostic text
    fn launch(&mut self, command: &LaunchCommand) -> Result<(), DesktopError>;

    /// Force-kill every process whose image name starts with `pattern`,
    /// returning how many were signalled
    fn terminate(&mut self, pattern: &str) -> Result<usize, DesktopError>;

    /// Block for `duration`
    fn pause(&mut self, duration: Duration);
}

impl<D: DesktopSession + ?Sized> DesktopSession for &mut D {
    fn set_clipboard(&mut self, text: &str) -> Result<(), DesktopError> {
        (**self).set_clipboard(text)
    }

    fn send_chord(&mut self, chord: &KeyChord) -> Result<(), DesktopError> {
        (**self).send_chord(chord)
    }

    fn launch(&mut self, command: &LaunchCommand) -> Result<(), DesktopError> {
        (**self).launch(command)
    }

    fn terminate(&mut self, pattern: &str) -> Result<usize, DesktopError> {
        (**self).terminate(pattern)
    }

    fn pause(&mut self, duration: Duration) {
        (**self).pause(duration)
    }
}

/// Type `text` into the focused field by pasting it, then confirm with Enter
///
/// `action_pause` is slept after each key event, the way the application
/// needs time to process every input. A failed primitive does not stop the
/// sequence; every step and pause still runs, and the first error is
/// returned at the end.
pub fn paste_and_confirm<D: DesktopSession + ?Sized>(
    session: &mut D,
    text: &str,
    paste_chord: &KeyChord,
    action_pause: Duration,
) -> Result<(), DesktopError> {
    let clipboard = session.set_clipboard(text);
    let paste = session.send_chord(paste_chord);
    session.pause(action_pause);
    let confirm = session.send_chord(&KeyChord::single(Key::Enter));
    session.pause(action_pause);
    clipboard.and(paste).and(confirm)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        clipboard_fails: bool,
    }

    impl DesktopSession for Recorder {
        fn set_clipboard(&mut self, text: &str) -> Result<(), DesktopError> {
            if self.clipboard_fails {
                return Err(DesktopError::Clipboard("no display".to_string()));
            }
            self.calls.push(format!("clip:{}", text));
            Ok(())
        }

        fn send_chord(&mut self, chord: &KeyChord) -> Result<(), DesktopError> {
            self.calls.push(format!("keys:{}", chord));
            Ok(())
        }

        fn launch(&mut self, command: &LaunchCommand) -> Result<(), DesktopError> {
            self.calls.push(format!("launch:{}", command));
            Ok(())
        }

        fn terminate(&mut self, pattern: &str) -> Result<usize, DesktopError> {
            self.calls.push(format!("kill:{}", pattern));
            Ok(0)
        }

        fn pause(&mut self, duration: Duration) {
            self.calls.push(format!("pause:{}", duration.as_millis()));
        }
    }

    #[test]
    fn test_paste_and_confirm_sequence() {
        let mut desktop = Recorder::default();
        let paste: KeyChord = "ctrl+v".parse().unwrap();

        paste_and_confirm(&mut desktop, "C:\\docs\\a.lwp", &paste, Duration::from_millis(7))
            .unwrap();

        assert_eq!(
            desktop.calls,
            vec![
                "clip:C:\\docs\\a.lwp",
                "keys:ctrl+v",
                "pause:7",
                "keys:enter",
                "pause:7",
            ]
        );
    }

    #[test]
    fn test_paste_and_confirm_keeps_going_when_clipboard_fails() {
        let mut desktop = Recorder {
            clipboard_fails: true,
            ..Default::default()
        };
        let paste: KeyChord = "ctrl+v".parse().unwrap();

        let err =
            paste_and_confirm(&mut desktop, "x", &paste, Duration::from_millis(7)).unwrap_err();
        assert!(matches!(err, DesktopError::Clipboard(_)));
        assert_eq!(
            desktop.calls,
            vec!["keys:ctrl+v", "pause:7", "keys:enter", "pause:7"]
        );
    }

    #[test]
    fn test_launch_command_display() {
        let cmd = LaunchCommand::new("symphony.exe").with_args(["-nosplash"]);
        assert_eq!(cmd.to_string(), "symphony.exe -nosplash");
    }
}
