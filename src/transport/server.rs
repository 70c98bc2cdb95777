//! Server session
//!
//! One bound endpoint multiplexing many clients. Every inbound payload is
//! delivered together with the identity of the client that sent it, and
//! replies are routed back by that identity.

use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::RwLock;

use super::context::Shared;
use super::frame::{FrameReader, ReadOutcome};
use super::{prepare_stream, write_loop, Context, Identity, StopSignal, IO_TICK};
use crate::error::{RelayError, Result};

/// Outbound queues of the connected clients, keyed by identity
type PeerMap = Arc<RwLock<HashMap<Identity, Sender<Bytes>>>>;

/// Server side of the transport
pub struct ServerSession {
    local_addr: SocketAddr,
    peers: PeerMap,
    inbound: Receiver<(Identity, Bytes)>,
    stop: StopSignal,
}

impl ServerSession {
    /// Bind to `addr` and start accepting clients
    ///
    /// Fails with `Startup` when the address cannot be bound.
    pub fn bind(ctx: &Context, addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|source| RelayError::Startup {
            addr: addr.to_string(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let shared = ctx.shared();
        let stop = StopSignal::new(Arc::clone(&shared));
        let peers: PeerMap = Arc::new(RwLock::new(HashMap::new()));
        let (inbound_tx, inbound) = channel::unbounded();

        let acceptor = Acceptor {
            listener,
            shared: Arc::clone(&shared),
            stop: stop.clone(),
            peers: Arc::clone(&peers),
            inbound: inbound_tx,
        };
        shared.spawn(format!("relaykv-accept-{}", local_addr.port()), move || acceptor.run())?;

        tracing::info!("Server session bound to {}", local_addr);

        Ok(Self {
            local_addr,
            peers,
            inbound,
            stop,
        })
    }

    /// Address actually bound (useful when binding port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Queue `payload` for the client with `identity`
    ///
    /// Never blocks. Unknown or disconnected identities drop the message.
    pub fn send(&self, identity: &[u8], payload: Bytes) {
        match self.peers.read().get(identity) {
            Some(outbound) => {
                if outbound.send(payload).is_err() {
                    tracing::debug!(
                        "Connection for {} is closing, reply dropped",
                        String::from_utf8_lossy(identity)
                    );
                }
            }
            None => tracing::debug!(
                "No client with identity {}, reply dropped",
                String::from_utf8_lossy(identity)
            ),
        }
    }

    /// Next inbound `(identity, payload)`, if one is waiting
    pub fn try_receive(&self) -> Option<(Identity, Bytes)> {
        self.inbound.try_recv().ok()
    }

    /// Number of clients currently registered
    pub fn connected_clients(&self) -> usize {
        self.peers.read().len()
    }

    /// True if a client with `identity` is connected
    pub fn is_connected(&self, identity: &[u8]) -> bool {
        self.peers.read().contains_key(identity)
    }
}

impl Drop for ServerSession {
    fn drop(&mut self) {
        self.stop.raise();
    }
}

// =============================================================================
// Acceptor
// =============================================================================

struct Acceptor {
    listener: TcpListener,
    shared: Arc<Shared>,
    stop: StopSignal,
    peers: PeerMap,
    inbound: Sender<(Identity, Bytes)>,
}

impl Acceptor {
    fn run(self) {
        while !self.stop.is_set() {
            match self.listener.accept() {
                Ok((stream, peer_addr)) => {
                    tracing::debug!("Connection established from {}", peer_addr);
                    self.start_peer(stream, peer_addr);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => thread::sleep(IO_TICK),
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(IO_TICK);
                }
            }
        }
        tracing::debug!("Acceptor stopped");
    }

    fn start_peer(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let peer = Peer {
            stream,
            peer_addr,
            shared: Arc::clone(&self.shared),
            stop: self.stop.clone(),
            peers: Arc::clone(&self.peers),
            inbound: self.inbound.clone(),
        };

        if let Err(e) = self
            .shared
            .spawn(format!("relaykv-peer-{}", peer_addr), move || peer.run())
        {
            tracing::warn!("Cannot start reader for {}: {}", peer_addr, e);
        }
    }
}

// =============================================================================
// Peer Connection
// =============================================================================

struct Peer {
    stream: TcpStream,
    peer_addr: SocketAddr,
    shared: Arc<Shared>,
    stop: StopSignal,
    peers: PeerMap,
    inbound: Sender<(Identity, Bytes)>,
}

impl Peer {
    fn run(self) {
        if let Err(e) = prepare_stream(&self.stream) {
            tracing::warn!("Cannot configure connection from {}: {}", self.peer_addr, e);
            return;
        }
        let read_stream = match self.stream.try_clone() {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Cannot clone stream for {}: {}", self.peer_addr, e);
                return;
            }
        };
        let mut reader = FrameReader::new(read_stream, self.shared.max_frame_size());

        let Some(identity) = self.handshake(&mut reader) else {
            return;
        };
        let label = format!("{} ({})", String::from_utf8_lossy(&identity), self.peer_addr);

        if !self.register(&identity, &label) {
            let _ = self.stream.shutdown(std::net::Shutdown::Both);
            return;
        }

        self.read_loop(&mut reader, &identity, &label);

        self.peers.write().remove(&identity);
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        tracing::debug!("Client {} disconnected", label);
    }

    /// Wait for the identity frame
    fn handshake(&self, reader: &mut FrameReader<TcpStream>) -> Option<Identity> {
        while !self.stop.is_set() {
            match reader.poll_frame() {
                Ok(ReadOutcome::Frame(identity)) if identity.is_empty() => {
                    tracing::warn!("Rejecting {}: empty identity", self.peer_addr);
                    return None;
                }
                Ok(ReadOutcome::Frame(identity)) => return Some(identity),
                Ok(ReadOutcome::Idle) => continue,
                Ok(ReadOutcome::Closed) => {
                    tracing::debug!("{} closed before sending its identity", self.peer_addr);
                    return None;
                }
                Err(e) => {
                    tracing::warn!("Handshake with {} failed: {}", self.peer_addr, e);
                    return None;
                }
            }
        }
        None
    }

    /// Claim the identity and start the writer thread
    ///
    /// An identity already held by a live connection is refused. A previous
    /// connection keeps its entry until its reader sees the close, which can
    /// take up to one `IO_TICK`, so a client reconnecting with the same
    /// identity inside that window is refused too. Its `connect` still
    /// succeeds; the refusal is only visible in the server log.
    fn register(&self, identity: &Identity, label: &str) -> bool {
        let write_stream = match self.stream.try_clone() {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Cannot clone stream for {}: {}", label, e);
                return false;
            }
        };

        let (outbound_tx, outbound_rx) = channel::unbounded();
        {
            let mut peers = self.peers.write();
            if peers.contains_key(identity) {
                tracing::warn!("Refusing {}: identity already connected", label);
                return false;
            }
            peers.insert(identity.clone(), outbound_tx);
        }

        let stop = self.stop.clone();
        let peer = label.to_string();
        let spawned = self.shared.spawn(format!("relaykv-writer-{}", self.peer_addr), move || {
            write_loop(write_stream, outbound_rx, stop, peer)
        });
        if let Err(e) = spawned {
            tracing::warn!("Cannot start writer for {}: {}", label, e);
            self.peers.write().remove(identity);
            return false;
        }

        tracing::info!("Client {} registered", label);
        true
    }

    fn read_loop(&self, reader: &mut FrameReader<TcpStream>, identity: &Identity, label: &str) {
        while !self.stop.is_set() {
            match reader.poll_frame() {
                Ok(ReadOutcome::Frame(payload)) => {
                    if payload.is_empty() {
                        continue;
                    }
                    tracing::trace!("Received {} byte frame from {}", payload.len(), label);
                    if self.inbound.send((identity.clone(), payload)).is_err() {
                        // Session dropped
                        return;
                    }
                }
                Ok(ReadOutcome::Idle) => continue,
                Ok(ReadOutcome::Closed) => return,
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", label, e);
                    return;
                }
            }
        }
    }
}
