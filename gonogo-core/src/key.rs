use serde::{Deserialize, Serialize};

/// A logical keyboard key as delivered by the platform layer.
///
/// The task only distinguishes printable keys (response pad buttons report as
/// digit characters, the scanner trigger as `'5'`), so a single `char` is
/// enough to identify every key the protocol cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(pub char);

impl Key {
    pub fn as_char(&self) -> char {
        self.0
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Key(c)
    }
}

/// Which keys a timeline step accepts while it is on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySet {
    /// No key is accepted; the step always runs out its timer.
    None,
    /// Any key qualifies (instruction pages, debrief).
    Any,
    /// Only the listed keys qualify; everything else is ignored.
    Set(Vec<Key>),
}

impl KeySet {
    pub fn one(key: Key) -> Self {
        KeySet::Set(vec![key])
    }

    pub fn accepts(&self, key: Key) -> bool {
        match self {
            KeySet::None => false,
            KeySet::Any => true,
            KeySet::Set(keys) => keys.contains(&key),
        }
    }
}
