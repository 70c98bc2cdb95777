//! Response Listener
//!
//! Background thread that polls the client session for replies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::Result;
use crate::protocol::{decode_reply, Envelope, Response};
use crate::transport::ClientSession;

/// A decoded reply handed to the caller
///
/// `envelope.correlation_id` echoes the id of the request it answers. The
/// listener does not match replies to pending requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub envelope: Envelope,
    pub response: Response,
}

/// Handle to the listener thread
///
/// Stopping is cooperative: the thread exits after its current iteration.
pub struct ResponseListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ResponseListener {
    /// Start polling `session`, passing every decoded reply to `handler`
    pub fn spawn<H>(session: Arc<ClientSession>, poll_interval: Duration, mut handler: H) -> Result<Self>
    where
        H: FnMut(Reply) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("relaykv-listener".to_string())
            .spawn(move || {
                while !thread_stop.load(Ordering::Acquire) {
                    let Some(frame) = session.try_receive() else {
                        thread::sleep(poll_interval);
                        continue;
                    };

                    match decode_reply(&frame) {
                        Ok((envelope, response)) => handler(Reply { envelope, response }),
                        Err(e) => tracing::debug!("Discarding malformed reply: {}", e),
                    }
                }
                tracing::debug!("Response listener stopped");
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the thread and wait for it to exit
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Response listener panicked");
            }
        }
    }
}

impl Drop for ResponseListener {
    fn drop(&mut self) {
        self.stop();
    }
}
