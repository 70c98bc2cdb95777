//! Response definitions
//!
//! Replies sent from the server back to the requesting client.

use std::fmt;

use crate::error::RelayError;

/// Response kind tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseKind {
    KeyAdded = 0,
    KeyValue = 1,
    KeyDeleted = 2,
    KeyNotExist = 3,
    KeyAlreadyExist = 4,
}

impl TryFrom<u8> for ResponseKind {
    type Error = RelayError;

    fn try_from(kind: u8) -> Result<Self, Self::Error> {
        match kind {
            0 => Ok(ResponseKind::KeyAdded),
            1 => Ok(ResponseKind::KeyValue),
            2 => Ok(ResponseKind::KeyDeleted),
            3 => Ok(ResponseKind::KeyNotExist),
            4 => Ok(ResponseKind::KeyAlreadyExist),
            _ => Err(RelayError::UnknownKind {
                direction: "response",
                kind,
            }),
        }
    }
}

/// A reply payload
///
/// Negative outcomes (`KeyNotExist`, `KeyAlreadyExist`) are valid protocol
/// results, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A Put inserted a new key
    KeyAdded { key: Vec<u8>, value: Vec<u8> },

    /// A Get found the key
    KeyValue { key: Vec<u8>, value: Vec<u8> },

    /// A Delete removed the key
    KeyDeleted { key: Vec<u8> },

    /// A Get or Delete named an absent key
    KeyNotExist { key: Vec<u8> },

    /// A Put named a key that is already stored
    KeyAlreadyExist { key: Vec<u8> },
}

impl Response {
    /// Get the response kind
    pub fn kind(&self) -> ResponseKind {
        match self {
            Response::KeyAdded { .. } => ResponseKind::KeyAdded,
            Response::KeyValue { .. } => ResponseKind::KeyValue,
            Response::KeyDeleted { .. } => ResponseKind::KeyDeleted,
            Response::KeyNotExist { .. } => ResponseKind::KeyNotExist,
            Response::KeyAlreadyExist { .. } => ResponseKind::KeyAlreadyExist,
        }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            Response::KeyAdded { key, .. }
            | Response::KeyValue { key, .. }
            | Response::KeyDeleted { key }
            | Response::KeyNotExist { key }
            | Response::KeyAlreadyExist { key } => key,
        }
    }

    /// The value, for the kinds that carry one
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Response::KeyAdded { value, .. } | Response::KeyValue { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = String::from_utf8_lossy(self.key());
        match self {
            Response::KeyAdded { value, .. } => write!(
                f,
                "The item '{}: {}' was successfully added to the store.",
                key,
                String::from_utf8_lossy(value)
            ),
            Response::KeyValue { value, .. } => write!(
                f,
                "The value of the key '{}' is '{}'",
                key,
                String::from_utf8_lossy(value)
            ),
            Response::KeyDeleted { .. } => write!(
                f,
                "The item with key '{}' was successfully removed from the store.",
                key
            ),
            Response::KeyNotExist { .. } => {
                write!(f, "The item with key '{}' does NOT exist in the store.", key)
            }
            Response::KeyAlreadyExist { .. } => {
                write!(f, "An item with key '{}' already exists in the store.", key)
            }
        }
    }
}
