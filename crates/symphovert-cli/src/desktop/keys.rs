//! Keys and key chords
//!
//! Chords are written the way they are configured: `ctrl+shift+s`, `escape`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A single key the driver can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Ctrl,
    Shift,
    Alt,
    Enter,
    Escape,
    Tab,
    /// Letter or digit key; letters are stored lowercase
    Char(char),
}

impl Key {
    pub fn is_modifier(self) -> bool {
        matches!(self, Key::Ctrl | Key::Shift | Key::Alt)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Ctrl => f.write_str("ctrl"),
            Key::Shift => f.write_str("shift"),
            Key::Alt => f.write_str("alt"),
            Key::Enter => f.write_str("enter"),
            Key::Escape => f.write_str("escape"),
            Key::Tab => f.write_str("tab"),
            Key::Char(c) => write!(f, "{}", c),
        }
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        match name.as_str() {
            "ctrl" | "control" => Ok(Key::Ctrl),
            "shift" => Ok(Key::Shift),
            "alt" => Ok(Key::Alt),
            "enter" | "return" => Ok(Key::Enter),
            "esc" | "escape" => Ok(Key::Escape),
            "tab" => Ok(Key::Tab),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphanumeric() => Ok(Key::Char(c)),
                    _ => Err(format!("unknown key '{}'", s.trim())),
                }
            }
        }
    }
}

/// Keys pressed together, modifiers first, released in reverse order
///
/// `interval` is the delay between each individual key event, matching how
/// the target application needs a chord spread out to register it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    keys: Vec<Key>,
    interval: Duration,
}

impl KeyChord {
    pub fn new(keys: impl Into<Vec<Key>>) -> Self {
        Self {
            keys: keys.into(),
            interval: Duration::ZERO,
        }
    }

    /// A lone key press
    pub fn single(key: Key) -> Self {
        Self::new(vec![key])
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.keys.iter().map(Key::to_string).collect();
        f.write_str(&names.join("+"))
    }
}

impl FromStr for KeyChord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("empty key chord".to_string());
        }

        let keys = s
            .split('+')
            .map(|part| {
                if part.trim().is_empty() {
                    Err(format!("empty key in chord '{}'", s))
                } else {
                    part.parse::<Key>()
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Exactly one non-modifier, and it goes last.
        let (last, modifiers) = keys
            .split_last()
            .ok_or_else(|| format!("empty key chord '{}'", s))?;
        if last.is_modifier() || modifiers.iter().any(|k| !k.is_modifier()) {
            return Err(format!(
                "chord '{}' must be modifiers followed by one key",
                s
            ));
        }

        Ok(KeyChord::new(keys))
    }
}

impl Serialize for KeyChord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KeyChord {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_save_as_chord() {
        let chord: KeyChord = "ctrl+shift+s".parse().unwrap();
        assert_eq!(chord.keys(), &[Key::Ctrl, Key::Shift, Key::Char('s')]);
        assert_eq!(chord.to_string(), "ctrl+shift+s");
    }

    #[test]
    fn test_parse_is_case_and_space_insensitive() {
        let chord: KeyChord = " Ctrl + O ".parse().unwrap();
        assert_eq!(chord.keys(), &[Key::Ctrl, Key::Char('o')]);
    }

    #[test]
    fn test_single_keys() {
        assert_eq!("esc".parse::<KeyChord>().unwrap(), KeyChord::single(Key::Escape));
        assert_eq!("Return".parse::<KeyChord>().unwrap(), KeyChord::single(Key::Enter));
    }

    #[test]
    fn test_rejects_malformed_chords() {
        assert!("".parse::<KeyChord>().is_err());
        assert!("ctrl+".parse::<KeyChord>().is_err());
        assert!("ctrl+shift".parse::<KeyChord>().is_err());
        assert!("s+ctrl".parse::<KeyChord>().is_err());
        assert!("ctrl+f13".parse::<KeyChord>().is_err());
    }

    #[test]
    fn test_interval_is_kept() {
        let chord = KeyChord::single(Key::Enter).with_interval(Duration::from_millis(100));
        assert_eq!(chord.interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_serde_as_string() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            chord: KeyChord,
        }

        let parsed: Wrapper = toml::from_str("chord = \"ctrl+v\"").unwrap();
        assert_eq!(parsed.chord.keys(), &[Key::Ctrl, Key::Char('v')]);
        assert!(toml::from_str::<Wrapper>("chord = \"ctrl+\"").is_err());

        let out = toml::to_string(&parsed).unwrap();
        assert!(out.contains("chord = \"ctrl+v\""));
    }
}
