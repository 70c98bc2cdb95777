//! Client
//!
//! Submits commands and receives replies through a Response Listener.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use rand::Rng;

use super::listener::{Reply, ResponseListener};
use crate::config::Config;
use crate::error::Result;
use crate::protocol::{encode_request, Command};
use crate::transport::{ClientSession, Context, Identity};

/// Random process-level identity, `client_<n>`
pub fn generate_identity() -> String {
    let n: u32 = rand::thread_rng().gen_range(1..=1_000_000);
    format!("client_{}", n)
}

/// Parse an interactive command line
///
/// Accepts `put <key> <value>`, `get <key>` and `delete <key>`, with
/// tokens separated by whitespace. Anything else yields `None`.
pub fn parse_command_line(line: &str) -> Option<Command> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["put", key, value] => Some(Command::put(*key, *value)),
        ["get", key] => Some(Command::get(*key)),
        ["delete", key] => Some(Command::delete(*key)),
        _ => None,
    }
}

/// Key-value client
///
/// Sending and receiving run concurrently: commands go out from the
/// caller's thread while the listener thread handles replies.
pub struct Client {
    session: Arc<ClientSession>,
    listener: ResponseListener,
    next_id: AtomicU16,
}

impl Client {
    /// Connect to `config.server_addr` and start the Response Listener
    pub fn connect<H>(ctx: &Context, config: &Config, handler: H) -> Result<Self>
    where
        H: FnMut(Reply) + Send + 'static,
    {
        config.validate()?;
        let identity = config.identity.clone().unwrap_or_else(generate_identity);
        let session = Arc::new(ClientSession::connect(ctx, identity, &config.server_addr)?);
        let listener =
            ResponseListener::spawn(Arc::clone(&session), config.poll_interval(), handler)?;

        Ok(Self {
            session,
            listener,
            next_id: AtomicU16::new(0),
        })
    }

    pub fn identity(&self) -> &Identity {
        self.session.identity()
    }

    /// Encode and send a command, returning its correlation id
    ///
    /// Delivery is not confirmed; the reply, if any, arrives at the handler.
    pub fn send(&self, command: &Command) -> Result<u16> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = encode_request(id, command)?;
        self.session.send(request);
        Ok(id)
    }

    pub fn put(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Result<u16> {
        self.send(&Command::put(key, value))
    }

    pub fn get(&self, key: impl Into<Vec<u8>>) -> Result<u16> {
        self.send(&Command::get(key))
    }

    pub fn delete(&self, key: impl Into<Vec<u8>>) -> Result<u16> {
        self.send(&Command::delete(key))
    }

    /// Stop the listener; further replies are not delivered
    pub fn stop(&mut self) {
        self.listener.stop();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        // Join the listener before the session goes away
        self.listener.stop();
    }
}
