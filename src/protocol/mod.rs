//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Message Format
//! ```text
//! ┌────────────────┬──────────────┬──────────┬──────────────────────┐
//! │ Timestamp (8)  │ Corr. Id (2) │ Kind (1) │       Payload        │
//! └────────────────┴──────────────┴──────────┴──────────────────────┘
//! ```
//!
//! ### Commands (request direction)
//! - 0: PUT    - Payload: key, value
//! - 1: GET    - Payload: key
//! - 2: DELETE - Payload: key
//!
//! ### Responses (reply direction)
//! - 0: KEY_ADDED         - Payload: key, value
//! - 1: KEY_VALUE         - Payload: key, value
//! - 2: KEY_DELETED       - Payload: key
//! - 3: KEY_NOT_EXIST     - Payload: key
//! - 4: KEY_ALREADY_EXIST - Payload: key
//!
//! Every key and value is a 2 byte length followed by that many bytes.

mod command;
mod response;
mod envelope;
mod codec;

pub use command::{Command, CommandKind};
pub use response::{Response, ResponseKind};
pub use envelope::{Envelope, Timestamp, ENVELOPE_SIZE};
pub use codec::{
    decode, decode_envelope, decode_payload, decode_reply, decode_request, encode, encode_at,
    encode_reply, encode_request, WireMessage, LEN_PREFIX_SIZE, MAX_FIELD_LEN,
};
