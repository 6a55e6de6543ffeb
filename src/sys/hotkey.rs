use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT   = 0b0001;
        const CONTROL = 0b0010;
        const ALT     = 0b0100;
        const META    = 0b1000;
    }
}

impl Modifiers {
    pub fn insert_from_token(&mut self, token: &str) -> bool {
        match token.to_lowercase().as_str() {
            "shift" => {
                self.insert(Modifiers::SHIFT);
                true
            }
            "ctrl" | "control" => {
                self.insert(Modifiers::CONTROL);
                true
            }
            "alt" | "option" => {
                self.insert(Modifiers::ALT);
                true
            }
            "meta" | "cmd" | "command" | "super" => {
                self.insert(Modifiers::META);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, flag) in [
            ("shift", Modifiers::SHIFT),
            ("ctrl", Modifiers::CONTROL),
            ("alt", Modifiers::ALT),
            ("meta", Modifiers::META),
        ] {
            if self.contains(flag) {
                if !first {
                    write!(f, "+")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A modifier set plus a key token, parsed from specs like `"alt+shift+h"`.
///
/// The key token is passed through to the host untouched; which tokens a
/// host accepts is its own contract. We only insist the token exists and
/// is a single word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key: String,
}

impl FromStr for Hotkey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::empty();
        let mut key = None;
        for token in s.split('+').map(str::trim) {
            if token.is_empty() {
                return Err(anyhow!("empty token in hotkey spec '{s}'"));
            }
            if modifiers.insert_from_token(token) {
                continue;
            }
            if key.replace(token.to_lowercase()).is_some() {
                return Err(anyhow!("more than one key in hotkey spec '{s}'"));
            }
        }
        let key = key.ok_or_else(|| anyhow!("hotkey spec '{s}' has no key"))?;
        Ok(Hotkey { modifiers, key })
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}
