//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────────────┬─────────────────────────────────────┐
//! │ Envelope (11)    │         Payload                     │
//! └──────────────────┴─────────────────────────────────────┘
//! ```
//!
//! ### Payload by Kind
//! - Put / KeyAdded / KeyValue:                 String(key) String(value)
//! - Get / Delete / KeyDeleted / KeyNotExist /
//!   KeyAlreadyExist:                           String(key)
//!
//! where `String` is a 2 byte length followed by exactly that many bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Command, CommandKind, Envelope, Response, ResponseKind, Timestamp, ENVELOPE_SIZE};
use crate::error::{RelayError, Result};

/// Size of a string length prefix
pub const LEN_PREFIX_SIZE: usize = 2;

/// Longest key or value a string field can carry
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// A message type that travels behind an [`Envelope`]
///
/// Implemented by the two closed message families, [`Command`] and
/// [`Response`]. The kind tag always comes from the message itself.
pub trait WireMessage: Sized {
    /// Kind tag written into the envelope
    fn tag(&self) -> u8;

    /// Bytes the payload will occupy
    fn payload_len(&self) -> usize;

    /// Append the payload fields to `buf`
    fn encode_payload(&self, buf: &mut BytesMut) -> Result<()>;

    /// Parse the payload for `kind`, advancing `buf` past the consumed bytes
    fn decode_payload(kind: u8, buf: &mut &[u8]) -> Result<Self>;
}

// =============================================================================
// Field Helpers
// =============================================================================

fn put_field(buf: &mut BytesMut, field: &'static str, bytes: &[u8]) -> Result<()> {
    let len = u16::try_from(bytes.len()).map_err(|_| RelayError::FieldTooLong {
        field,
        len: bytes.len(),
    })?;
    buf.put_u16_ne(len);
    buf.put_slice(bytes);
    Ok(())
}

fn take_field(buf: &mut &[u8], field: &'static str) -> Result<Vec<u8>> {
    if buf.len() < LEN_PREFIX_SIZE {
        return Err(RelayError::Truncated {
            field,
            needed: LEN_PREFIX_SIZE,
            available: buf.len(),
        });
    }
    let len = buf.get_u16_ne() as usize;

    if buf.len() < len {
        return Err(RelayError::Truncated {
            field,
            needed: len,
            available: buf.len(),
        });
    }
    let bytes = buf[..len].to_vec();
    buf.advance(len);
    Ok(bytes)
}

fn field_len(bytes: &[u8]) -> usize {
    LEN_PREFIX_SIZE + bytes.len()
}

// =============================================================================
// Command Payloads
// =============================================================================

impl WireMessage for Command {
    fn tag(&self) -> u8 {
        self.kind() as u8
    }

    fn payload_len(&self) -> usize {
        match self {
            Command::Put { key, value } => field_len(key) + field_len(value),
            Command::Get { key } | Command::Delete { key } => field_len(key),
        }
    }

    fn encode_payload(&self, buf: &mut BytesMut) -> Result<()> {
        match self {
            Command::Put { key, value } => {
                put_field(buf, "key", key)?;
                put_field(buf, "value", value)
            }
            Command::Get { key } | Command::Delete { key } => put_field(buf, "key", key),
        }
    }

    fn decode_payload(kind: u8, buf: &mut &[u8]) -> Result<Self> {
        match CommandKind::try_from(kind)? {
            CommandKind::Put => {
                let key = take_field(buf, "key")?;
                let value = take_field(buf, "value")?;
                Ok(Command::Put { key, value })
            }
            CommandKind::Get => Ok(Command::Get {
                key: take_field(buf, "key")?,
            }),
            CommandKind::Delete => Ok(Command::Delete {
                key: take_field(buf, "key")?,
            }),
        }
    }
}

// =============================================================================
// Response Payloads
// =============================================================================

impl WireMessage for Response {
    fn tag(&self) -> u8 {
        self.kind() as u8
    }

    fn payload_len(&self) -> usize {
        match self {
            Response::KeyAdded { key, value } | Response::KeyValue { key, value } => {
                field_len(key) + field_len(value)
            }
            Response::KeyDeleted { key }
            | Response::KeyNotExist { key }
            | Response::KeyAlreadyExist { key } => field_len(key),
        }
    }

    fn encode_payload(&self, buf: &mut BytesMut) -> Result<()> {
        match self {
            Response::KeyAdded { key, value } | Response::KeyValue { key, value } => {
                put_field(buf, "key", key)?;
                put_field(buf, "value", value)
            }
            Response::KeyDeleted { key }
            | Response::KeyNotExist { key }
            | Response::KeyAlreadyExist { key } => put_field(buf, "key", key),
        }
    }

    fn decode_payload(kind: u8, buf: &mut &[u8]) -> Result<Self> {
        let kind = ResponseKind::try_from(kind)?;
        let key = take_field(buf, "key")?;

        Ok(match kind {
            ResponseKind::KeyAdded => Response::KeyAdded {
                key,
                value: take_field(buf, "value")?,
            },
            ResponseKind::KeyValue => Response::KeyValue {
                key,
                value: take_field(buf, "value")?,
            },
            ResponseKind::KeyDeleted => Response::KeyDeleted { key },
            ResponseKind::KeyNotExist => Response::KeyNotExist { key },
            ResponseKind::KeyAlreadyExist => Response::KeyAlreadyExist { key },
        })
    }
}

// =============================================================================
// Message Encoding/Decoding
// =============================================================================

/// Encode a message stamped with the current time
pub fn encode<M: WireMessage>(correlation_id: u16, message: &M) -> Result<Bytes> {
    encode_at(Timestamp::now(), correlation_id, message)
}

/// Encode a message with an explicit timestamp
///
/// Format: envelope (11) + payload
pub fn encode_at<M: WireMessage>(
    timestamp: Timestamp,
    correlation_id: u16,
    message: &M,
) -> Result<Bytes> {
    let envelope = Envelope {
        timestamp,
        correlation_id,
        kind: message.tag(),
    };

    let mut buf = BytesMut::with_capacity(ENVELOPE_SIZE + message.payload_len());
    envelope.write_to(&mut buf);
    message.encode_payload(&mut buf)?;

    Ok(buf.freeze())
}

/// Split a message into its envelope and the undecoded payload
pub fn decode_envelope(bytes: &[u8]) -> Result<(Envelope, &[u8])> {
    let mut cursor = bytes;
    let envelope = Envelope::read_from(&mut cursor)?;
    Ok((envelope, cursor))
}

/// Decode a payload of the given kind
///
/// The payload must be consumed exactly; leftover bytes are a failure.
pub fn decode_payload<M: WireMessage>(kind: u8, payload: &[u8]) -> Result<M> {
    let mut cursor = payload;
    let message = M::decode_payload(kind, &mut cursor)?;

    if !cursor.is_empty() {
        return Err(RelayError::TrailingBytes(cursor.len()));
    }
    Ok(message)
}

/// Decode a full message: envelope, then payload
pub fn decode<M: WireMessage>(bytes: &[u8]) -> Result<(Envelope, M)> {
    let (envelope, payload) = decode_envelope(bytes)?;
    let message = decode_payload(envelope.kind, payload)?;
    Ok((envelope, message))
}

/// Encode a client request
pub fn encode_request(correlation_id: u16, command: &Command) -> Result<Bytes> {
    encode(correlation_id, command)
}

/// Decode a client request
pub fn decode_request(bytes: &[u8]) -> Result<(Envelope, Command)> {
    decode(bytes)
}

/// Encode a server reply
pub fn encode_reply(correlation_id: u16, response: &Response) -> Result<Bytes> {
    encode(correlation_id, response)
}

/// Decode a server reply
pub fn decode_reply(bytes: &[u8]) -> Result<(Envelope, Response)> {
    decode(bytes)
}
