//! Command definitions
//!
//! Requests sent from clients to the server.

use crate::error::RelayError;

/// Command kind tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandKind {
    Put = 0,
    Get = 1,
    Delete = 2,
}

impl TryFrom<u8> for CommandKind {
    type Error = RelayError;

    fn try_from(kind: u8) -> Result<Self, Self::Error> {
        match kind {
            0 => Ok(CommandKind::Put),
            1 => Ok(CommandKind::Get),
            2 => Ok(CommandKind::Delete),
            _ => Err(RelayError::UnknownKind {
                direction: "command",
                kind,
            }),
        }
    }
}

/// A request payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Insert a key-value pair if the key is absent
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Look up a value by key
    Get { key: Vec<u8> },

    /// Remove a key
    Delete { key: Vec<u8> },
}

impl Command {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Command::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn get(key: impl Into<Vec<u8>>) -> Self {
        Command::Get { key: key.into() }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Command::Delete { key: key.into() }
    }

    /// Get the command kind
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Put { .. } => CommandKind::Put,
            Command::Get { .. } => CommandKind::Get,
            Command::Delete { .. } => CommandKind::Delete,
        }
    }

    /// The key every command carries
    pub fn key(&self) -> &[u8] {
        match self {
            Command::Put { key, .. } | Command::Get { key } | Command::Delete { key } => key,
        }
    }
}
