//! Conversion driver
//!
//! Treats the office application as a black-box converter: launch it, open
//! the source through the file dialog, save it under the destination name,
//! kill it, and then look at the filesystem to find out what happened.
//! Every wait is a fixed delay from [`DriverTimings`]; the application has
//! no readiness or completion signal to poll.

use crate::config::{ApplicationProfile, DriverTimings};
use crate::desktop::{paste_and_confirm, DesktopSession, Key, KeyChord};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Result of converting one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// The destination file exists after the protocol ran
    Success { destination: PathBuf },
    /// Nothing usable was produced
    Failure { reason: String },
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success { .. })
    }
}

/// Why a conversion failed
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The application process could not be started
    #[error("launch failed: {0}")]
    LaunchFailed(String),

    /// The protocol ran to the end but the destination does not exist
    #[error("conversion produced no output")]
    NoOutput,

    /// A filesystem step around the protocol failed
    #[error("could not {stage}: {source}")]
    Io {
        stage: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Something that turns a source document into a destination document
pub trait DocumentConverter {
    /// Convert `source` into `destination`; never panics, never returns `Err`
    fn convert(&mut self, source: &Path, destination: &Path) -> ConversionOutcome;
}

impl<C: DocumentConverter + ?Sized> DocumentConverter for &mut C {
    fn convert(&mut self, source: &Path, destination: &Path) -> ConversionOutcome {
        (**self).convert(source, destination)
    }
}

/// Drives IBM Symphony (or a compatible suite) through the desktop session
pub struct SymphonyDriver<D: DesktopSession> {
    desktop: D,
    profile: ApplicationProfile,
    timings: DriverTimings,
}

impl<D: DesktopSession> SymphonyDriver<D> {
    pub fn new(desktop: D, profile: ApplicationProfile, timings: DriverTimings) -> Self {
        Self {
            desktop,
            profile,
            timings,
        }
    }

    #[cfg(test)]
    pub(crate) fn desktop(&self) -> &D {
        &self.desktop
    }

    #[cfg(test)]
    pub(crate) fn into_desktop(self) -> D {
        self.desktop
    }

    fn run(&mut self, source: &Path, destination: &Path) -> Result<PathBuf, ConversionError> {
        remove_stale_output(destination)?;

        let source_abs = absolute(source);
        let destination_abs = absolute(destination);

        {
            // Created before launch so the application is killed on every path out.
            let mut app = ApplicationGuard::new(&mut self.desktop, &self.profile, &self.timings);

            app.launch()?;
            app.open(&source_abs);
            app.dismiss_stray_dialog();

            if let Some(parent) = destination_abs.parent() {
                std::fs::create_dir_all(parent).map_err(|source| ConversionError::Io {
                    stage: "create output directory",
                    source,
                })?;
            }

            app.save_as(&destination_abs);
        }

        if destination.is_file() {
            Ok(destination.to_path_buf())
        } else {
            Err(ConversionError::NoOutput)
        }
    }
}

impl<D: DesktopSession> DocumentConverter for SymphonyDriver<D> {
    fn convert(&mut self, source: &Path, destination: &Path) -> ConversionOutcome {
        debug!(source = %source.display(), destination = %destination.display(), "converting");

        match self.run(source, destination) {
            Ok(destination) => ConversionOutcome::Success { destination },
            Err(e) => {
                debug!(error = %e, "conversion failed");
                ConversionOutcome::Failure {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// A previous partial run must not look like a finished conversion.
fn remove_stale_output(destination: &Path) -> Result<(), ConversionError> {
    match std::fs::remove_file(destination) {
        Ok(()) => {
            debug!(path = %destination.display(), "removed stale output");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ConversionError::Io {
            stage: "remove stale output",
            source,
        }),
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// The running application, terminated when dropped
struct ApplicationGuard<'a, D: DesktopSession> {
    session: &'a mut D,
    profile: &'a ApplicationProfile,
    timings: &'a DriverTimings,
}

impl<'a, D: DesktopSession> ApplicationGuard<'a, D> {
    fn new(
        session: &'a mut D,
        profile: &'a ApplicationProfile,
        timings: &'a DriverTimings,
    ) -> Self {
        Self {
            session,
            profile,
            timings,
        }
    }

    fn launch(&mut self) -> Result<(), ConversionError> {
        self.session
            .launch(&self.profile.launch_command())
            .map_err(|e| ConversionError::LaunchFailed(e.to_string()))?;
        self.session.pause(self.timings.launch_settle());
        Ok(())
    }

    fn open(&mut self, source: &Path) {
        let chord = self
            .profile
            .open_chord
            .clone()
            .with_interval(self.timings.open_chord_interval());
        self.act(&chord);
        self.session.pause(self.timings.open_dialog());
        self.paste_path(source);
        self.session.pause(self.timings.after_open());
    }

    /// Symphony pops up a secondary dialog after opening; Escape is a no-op without it.
    fn dismiss_stray_dialog(&mut self) {
        self.act(&KeyChord::single(Key::Escape));
        self.session.pause(self.timings.document_load());
    }

    fn save_as(&mut self, destination: &Path) {
        let chord = self
            .profile
            .save_as_chord
            .clone()
            .with_interval(self.timings.save_as_chord_interval());
        self.act(&chord);
        self.paste_path(destination);
        self.session.pause(self.timings.after_save());
    }

    fn act(&mut self, chord: &KeyChord) {
        if let Err(e) = self.session.send_chord(chord) {
            warn!(chord = %chord, error = %e, "key input not delivered");
        }
        self.session.pause(self.timings.action_pause());
    }

    fn paste_path(&mut self, path: &Path) {
        let text = path.display().to_string();
        if let Err(e) = paste_and_confirm(
            &mut *self.session,
            &text,
            &self.profile.paste_chord,
            self.timings.action_pause(),
        ) {
            warn!(path = %text, error = %e, "path input not delivered");
        }
    }

    fn kill(&mut self, pattern: &str) {
        match self.session.terminate(pattern) {
            Ok(count) => debug!(pattern, count, "terminated processes"),
            Err(e) => warn!(pattern, error = %e, "could not terminate processes"),
        }
    }
}

impl<D: DesktopSession> Drop for ApplicationGuard<'_, D> {
    fn drop(&mut self) {
        let profile = self.profile;
        self.kill(&profile.process_pattern);
        self.session.pause(self.timings.after_app_kill());

        for pattern in &profile.runtime_patterns {
            self.kill(pattern);
            self.session.pause(self.timings.after_runtime_kill());
        }
    }
}
