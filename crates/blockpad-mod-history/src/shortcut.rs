//! Keyboard shortcut definitions and matching.
//!
//! A shortcut is a key plus an exact modifier set. An event carrying an
//! extra, unrequested modifier does not match: Ctrl+Shift+Z never
//! triggers a plain `CTRL+Z` binding.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Modifier keys held during a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

/// A key press delivered by the host's input source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Key name as reported by the platform (`"z"`, `"Z"`, `"Enter"`).
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
}

impl KeyEvent {
    /// A key press with no modifiers held.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            meta: false,
            alt: false,
            shift: false,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn modifiers(&self) -> Modifiers {
        Modifiers {
            ctrl: self.ctrl,
            meta: self.meta,
            alt: self.alt,
            shift: self.shift,
        }
    }
}

/// A shortcut as written in configuration: either a `+`-delimited
/// combination (`"CTRL+SHIFT+Z"`) or the equivalent token list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShortcutDef {
    Combo(String),
    Tokens(Vec<String>),
}

impl From<&str> for ShortcutDef {
    fn from(combo: &str) -> Self {
        Self::Combo(combo.to_string())
    }
}

/// A parsed shortcut: lowercase key token plus required modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    key: String,
    modifiers: Modifiers,
}

impl Shortcut {
    /// Parses a configured definition.
    ///
    /// # Errors
    ///
    /// Returns an error for empty definitions, empty tokens, and unknown
    /// modifier names.
    pub fn parse(def: &ShortcutDef) -> Result<Self> {
        match def {
            ShortcutDef::Combo(combo) => Self::from_tokens(combo.split('+')),
            ShortcutDef::Tokens(tokens) => Self::from_tokens(tokens.iter().map(String::as_str)),
        }
    }

    fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut tokens: Vec<String> = tokens
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .collect();
        if tokens.iter().any(String::is_empty) {
            bail!("Shortcut contains an empty token");
        }
        let Some(key) = tokens.pop() else {
            bail!("Shortcut has no key");
        };

        let mut modifiers = Modifiers::default();
        for token in &tokens {
            match token.as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "meta" | "cmd" | "command" | "super" => modifiers.meta = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                other => bail!("Unknown modifier '{other}'"),
            }
        }
        Ok(Self { key, modifiers })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Exact modifier-set match plus case-insensitive key match.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.modifiers() == self.modifiers && event.key.to_lowercase() == self.key
    }
}

impl FromStr for Shortcut {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tokens(s.split('+'))
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Modifiers {
            ctrl,
            meta,
            alt,
            shift,
        } = self.modifiers;
        for (held, name) in [(ctrl, "CTRL"), (meta, "CMD"), (alt, "ALT"), (shift, "SHIFT")] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.key.to_uppercase())
    }
}

/// Any-of collection of shortcuts bound to one action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortcutSet(Vec<Shortcut>);

impl ShortcutSet {
    /// Parses every definition, skipping invalid ones with a warning.
    /// Falls back to `defaults` when nothing valid remains.
    pub fn resolve(defs: &[ShortcutDef], defaults: &[ShortcutDef]) -> Self {
        let parsed: Vec<Shortcut> = defs
            .iter()
            .filter_map(|def| match Shortcut::parse(def) {
                Ok(shortcut) => Some(shortcut),
                Err(e) => {
                    tracing::warn!("Ignoring shortcut {def:?}: {e}");
                    None
                }
            })
            .collect();
        if parsed.is_empty() {
            return Self(defaults.iter().filter_map(|d| Shortcut::parse(d).ok()).collect());
        }
        Self(parsed)
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.0.iter().any(|s| s.matches(event))
    }

    pub fn shortcuts(&self) -> &[Shortcut] {
        &self.0
    }
}

/// History action a key event maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Undo,
    Redo,
}

/// Resolved undo and redo bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutBindings {
    pub undo: ShortcutSet,
    pub redo: ShortcutSet,
}

impl ShortcutBindings {
    /// Maps an event to an action. Undo is checked first.
    pub fn action_for(&self, event: &KeyEvent) -> Option<ShortcutAction> {
        if self.undo.matches(event) {
            Some(ShortcutAction::Undo)
        } else if self.redo.matches(event) {
            Some(ShortcutAction::Redo)
        } else {
            None
        }
    }
}

impl Default for ShortcutBindings {
    fn default() -> Self {
        Self {
            undo: ShortcutSet::resolve(&[], &default_undo()),
            redo: ShortcutSet::resolve(&[], &default_redo()),
        }
    }
}

pub fn default_undo() -> Vec<ShortcutDef> {
    vec!["CMD+Z".into(), "CTRL+Z".into()]
}

pub fn default_redo() -> Vec<ShortcutDef> {
    vec![
        "CMD+Y".into(),
        "CTRL+Y".into(),
        "CMD+SHIFT+Z".into(),
        "CTRL+SHIFT+Z".into(),
    ]
}
