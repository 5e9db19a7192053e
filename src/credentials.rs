use std::fmt;

use log::warn;

/// An API key. Debug output is redacted so keys never reach the logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Credential {
        Credential(key.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // keys this short would be shown whole
        if self.0.chars().count() <= 4 {
            return f.write_str("Credential(…)");
        }
        let start = self.0.char_indices().rev().nth(3).map_or(0, |(i, _)| i);
        write!(f, "Credential(…{})", &self.0[start..])
    }
}

/// Ordered credentials plus a cursor. Rotation only advances the cursor; a
/// failing key stays in the pool and comes around again on the next cycle.
#[derive(Debug, Clone, Default)]
pub struct CredentialPool {
    keys: Vec<Credential>,
    index: usize,
}

impl CredentialPool {
    pub fn new(keys: Vec<Credential>) -> CredentialPool {
        CredentialPool { keys, index: 0 }
    }

    pub fn current(&self) -> Option<&Credential> {
        self.keys.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Advances to the next credential. No-op returning false without redundancy.
    pub fn rotate(&mut self) -> bool {
        if self.keys.len() <= 1 {
            return false;
        }
        self.index = (self.index + 1) % self.keys.len();
        warn!(
            "switching to credential #{} of {}",
            self.index + 1,
            self.keys.len()
        );
        true
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
