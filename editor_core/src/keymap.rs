//! Keyboard shortcut mapping.
//!
//! Shortcuts are written as `"Mod+Shift+Z"`. `Mod` is the platform's primary
//! modifier (Cmd on macOS, Ctrl elsewhere); the host decides which physical
//! key that is when it builds a [`KeyChord`].

use crate::command::CommandRegistry;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A key press together with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub primary: bool,
    pub shift: bool,
    pub alt: bool,
    /// Lowercased key name: a single character (`"z"`, `` "`" ``) or a named
    /// key (`"enter"`, `"escape"`).
    pub key: String,
}

impl KeyChord {
    /// A chord without modifiers.
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            primary: false,
            shift: false,
            alt: false,
            key: key.into().to_lowercase(),
        }
    }

    /// A chord with the primary modifier held.
    pub fn primary(key: impl Into<String>) -> Self {
        Self {
            primary: true,
            ..Self::plain(key)
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

impl FromStr for KeyChord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key = match parts.pop() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(format!("missing key in shortcut '{s}'")),
        };
        let mut chord = KeyChord::plain(key);
        for modifier in parts {
            match modifier.to_lowercase().as_str() {
                "mod" | "cmd" | "ctrl" | "primary" => chord.primary = true,
                "shift" => chord.shift = true,
                "alt" | "option" => chord.alt = true,
                other => return Err(format!("unknown modifier '{other}' in shortcut '{s}'")),
            }
        }
        Ok(chord)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.primary {
            f.write_str("Mod+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        if self.alt {
            f.write_str("Alt+")?;
        }
        if self.key.chars().count() == 1 {
            f.write_str(&self.key.to_uppercase())
        } else {
            f.write_str(&self.key)
        }
    }
}

/// Resolves key chords to command ids.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<KeyChord, String>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a keymap from the shortcuts declared by registered commands.
    /// Malformed shortcuts are skipped with a warning; when two commands
    /// claim the same chord the lexicographically smaller id wins.
    pub fn from_commands(commands: &CommandRegistry) -> Self {
        let mut keymap = Self::new();
        for command in commands.sorted() {
            let Some(shortcut) = &command.shortcut else {
                continue;
            };
            match shortcut.parse::<KeyChord>() {
                Ok(chord) => {
                    let keep_existing = keymap
                        .bindings
                        .get(&chord)
                        .is_some_and(|existing| existing.as_str() < command.id.as_str());
                    if keep_existing {
                        log::warn!("Shortcut {} already bound, ignoring {}", chord, command.id);
                    } else {
                        keymap.bind(chord, command.id.clone());
                    }
                }
                Err(e) => log::warn!("Ignoring shortcut for {}: {}", command.id, e),
            }
        }
        keymap
    }

    /// Binds `chord` to `command_id`, replacing any previous binding.
    pub fn bind(&mut self, chord: KeyChord, command_id: impl Into<String>) {
        self.bindings.insert(chord, command_id.into());
    }

    /// Returns the command bound to `chord`.
    pub fn resolve(&self, chord: &KeyChord) -> Option<&str> {
        self.bindings.get(chord).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::registry::Owner;

    #[test]
    fn test_parse_chords() {
        assert_eq!("Mod+Z".parse::<KeyChord>(), Ok(KeyChord::primary("z")));
        assert_eq!(
            "Mod+Shift+Z".parse::<KeyChord>(),
            Ok(KeyChord::primary("z").with_shift())
        );
        assert_eq!("Ctrl+`".parse::<KeyChord>(), Ok(KeyChord::primary("`")));
        assert_eq!("Escape".parse::<KeyChord>(), Ok(KeyChord::plain("escape")));
        assert!("Hyper+K".parse::<KeyChord>().is_err());
        assert!("Mod+".parse::<KeyChord>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let chord = KeyChord::primary("k").with_shift();
        assert_eq!(chord.to_string(), "Mod+Shift+K");
        assert_eq!(chord.to_string().parse::<KeyChord>(), Ok(chord));
    }

    #[test]
    fn test_from_commands() {
        let mut commands = CommandRegistry::default();
        commands
            .register(
                Owner::Core,
                Command::new("history.undo", "Undo", |_, _| Ok(())).with_shortcut("Mod+Z"),
            )
            .unwrap();
        commands
            .register(
                Owner::Core,
                Command::new("broken", "Broken", |_, _| Ok(())).with_shortcut("Meta+"),
            )
            .unwrap();
        commands
            .register(Owner::Core, Command::new("plain", "Plain", |_, _| Ok(())))
            .unwrap();

        let keymap = Keymap::from_commands(&commands);
        assert_eq!(keymap.len(), 1);
        assert_eq!(keymap.resolve(&KeyChord::primary("z")), Some("history.undo"));
        assert_eq!(keymap.resolve(&KeyChord::primary("z").with_shift()), None);
    }
}
