//! Command Dispatcher
//!
//! Maps each decoded request onto the Store and produces exactly one reply.
//!
//! ## Semantics
//! - PUT is insert-only: an existing key is never overwritten
//! - GET and DELETE on an absent key answer `KeyNotExist` without touching
//!   the Store
//! - A request that fails to decode produces no reply and no mutation

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::{decode_request, encode_reply, Command, Envelope, Response};
use crate::store::Store;

/// Server-side request handler
#[derive(Debug, Default)]
pub struct Dispatcher {
    store: Store,
}

impl Dispatcher {
    /// Create a dispatcher over an empty Store
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a command and build its reply
    pub fn dispatch(&mut self, command: Command) -> Response {
        let response = match command {
            Command::Put { key, value } => {
                if self.store.insert_if_absent(&key, &value) {
                    tracing::debug!(
                        "Added item '{}: {}'",
                        String::from_utf8_lossy(&key),
                        String::from_utf8_lossy(&value)
                    );
                    Response::KeyAdded { key, value }
                } else {
                    tracing::debug!(
                        "Refused to add existing item '{}'",
                        String::from_utf8_lossy(&key)
                    );
                    Response::KeyAlreadyExist { key }
                }
            }
            Command::Get { key } => match self.store.get(&key) {
                Some(value) => {
                    let value = value.to_vec();
                    tracing::debug!("Read value of '{}'", String::from_utf8_lossy(&key));
                    Response::KeyValue { key, value }
                }
                None => {
                    tracing::debug!("Read of unknown key '{}'", String::from_utf8_lossy(&key));
                    Response::KeyNotExist { key }
                }
            },
            Command::Delete { key } => match self.store.remove(&key) {
                Some(_) => {
                    tracing::debug!("Removed item '{}'", String::from_utf8_lossy(&key));
                    Response::KeyDeleted { key }
                }
                None => {
                    tracing::debug!("Removal of unknown key '{}'", String::from_utf8_lossy(&key));
                    Response::KeyNotExist { key }
                }
            },
        };

        if matches!(
            response,
            Response::KeyAdded { .. } | Response::KeyValue { .. } | Response::KeyDeleted { .. }
        ) {
            tracing::debug!("{}", self.store);
        }
        response
    }

    /// Decode a request frame, apply it, and encode the reply
    ///
    /// The reply echoes the request's correlation id. Decode errors are
    /// returned before the Store is touched.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Result<(Envelope, Bytes)> {
        let (envelope, command) = decode_request(frame)?;
        tracing::trace!(
            "Request {} kind={} sent at {}",
            envelope.correlation_id,
            envelope.kind,
            envelope.timestamp
        );

        let response = self.dispatch(command);
        let reply = encode_reply(envelope.correlation_id, &response)?;
        Ok((envelope, reply))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}
