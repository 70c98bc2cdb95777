//! Tests for Server, Client and Response Listener
//!
//! These tests run a real server loop on a loopback port and verify:
//! - The put/get/delete scenario end to end
//! - Concurrent clients racing on the same key
//! - Malformed requests get no reply
//! - Listener shutdown
//! - Command line parsing and reply rendering

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver};
use relaykv::network::{
    generate_identity, parse_command_line, Client, Reply, ResponseListener, Server,
};
use relaykv::protocol::{decode_reply, encode_request, Command, Response};
use relaykv::transport::{ClientSession, Context};
use relaykv::Config;

// =============================================================================
// Helper Functions
// =============================================================================

const WAIT: Duration = Duration::from_secs(5);

struct RunningServer {
    addr: String,
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<Server>,
}

impl RunningServer {
    fn stop(self) -> Server {
        self.shutdown.store(true, Ordering::Release);
        self.handle.join().unwrap()
    }
}

fn test_config() -> Config {
    Config::builder()
        .listen_addr("127.0.0.1:0")
        .poll_interval_ms(2)
        .build()
}

fn start_server(ctx: &Context) -> RunningServer {
    let mut server = Server::bind(ctx, test_config()).unwrap();
    let addr = server.local_addr().to_string();
    let shutdown = server.shutdown_handle();
    let handle = thread::spawn(move || {
        server.run().unwrap();
        server
    });
    RunningServer {
        addr,
        shutdown,
        handle,
    }
}

fn connect_client(ctx: &Context, addr: &str, identity: &str) -> (Client, Receiver<Reply>) {
    let config = Config::builder()
        .server_addr(addr)
        .identity(identity)
        .poll_interval_ms(2)
        .build();
    let (tx, rx) = channel::unbounded();
    let client = Client::connect(ctx, &config, move |reply| {
        let _ = tx.send(reply);
    })
    .unwrap();
    (client, rx)
}

fn next_reply(replies: &Receiver<Reply>) -> Reply {
    replies.recv_timeout(WAIT).expect("no reply")
}

// =============================================================================
// End-to-End Tests
// =============================================================================

#[test]
fn test_scenario_end_to_end() {
    let ctx = Context::new();
    let server = start_server(&ctx);
    let (client, replies) = connect_client(&ctx, &server.addr, "client_scenario");

    let expected = [
        (client.put("a", "1").unwrap(), Response::KeyAdded { key: b"a".to_vec(), value: b"1".to_vec() }),
        (client.put("a", "2").unwrap(), Response::KeyAlreadyExist { key: b"a".to_vec() }),
        (client.get("a").unwrap(), Response::KeyValue { key: b"a".to_vec(), value: b"1".to_vec() }),
        (client.delete("a").unwrap(), Response::KeyDeleted { key: b"a".to_vec() }),
        (client.get("a").unwrap(), Response::KeyNotExist { key: b"a".to_vec() }),
    ];

    for (id, response) in expected {
        let reply = next_reply(&replies);
        assert_eq!(reply.envelope.correlation_id, id);
        assert_eq!(reply.response, response);
    }

    drop(client);
    let server = server.stop();
    assert!(server.store().is_empty());
}

#[test]
fn test_correlation_ids_increase_per_client() {
    let ctx = Context::new();
    let server = start_server(&ctx);
    let (client, replies) = connect_client(&ctx, &server.addr, "client_ids");

    let ids: Vec<u16> = (0..3).map(|i| client.get(format!("k{}", i)).unwrap()).collect();
    assert_eq!(ids, vec![0, 1, 2]);

    for id in ids {
        assert_eq!(next_reply(&replies).envelope.correlation_id, id);
    }
    server.stop();
}

#[test]
fn test_concurrent_put_same_key() {
    let ctx = Context::new();
    let server = start_server(&ctx);
    let (first, first_replies) = connect_client(&ctx, &server.addr, "client_1");
    let (second, second_replies) = connect_client(&ctx, &server.addr, "client_2");

    let t1 = thread::spawn(move || {
        first.put("x", "1").unwrap();
        first
    });
    let t2 = thread::spawn(move || {
        second.put("x", "2").unwrap();
        second
    });
    let _first = t1.join().unwrap();
    let _second = t2.join().unwrap();

    let a = next_reply(&first_replies).response;
    let b = next_reply(&second_replies).response;

    let (winner, loser_key) = match (&a, &b) {
        (Response::KeyAdded { value, .. }, Response::KeyAlreadyExist { key }) => (value.clone(), key.clone()),
        (Response::KeyAlreadyExist { key }, Response::KeyAdded { value, .. }) => (value.clone(), key.clone()),
        other => panic!("Expected one add and one refusal, got {:?}", other),
    };
    assert_eq!(loser_key, b"x");

    let server = server.stop();
    assert_eq!(server.store().get(b"x"), Some(winner.as_slice()));
    assert_eq!(server.store().len(), 1);
}

#[test]
fn test_many_clients_get_their_own_replies() {
    let ctx = Context::new();
    let server = start_server(&ctx);

    let clients: Vec<_> = (0..8)
        .map(|i| connect_client(&ctx, &server.addr, &format!("client_{}", i)))
        .collect();

    for (i, (client, _)) in clients.iter().enumerate() {
        client.put(format!("key{}", i), format!("value{}", i)).unwrap();
    }

    for (i, (_, replies)) in clients.iter().enumerate() {
        assert_eq!(
            next_reply(replies).response,
            Response::KeyAdded {
                key: format!("key{}", i).into_bytes(),
                value: format!("value{}", i).into_bytes(),
            }
        );
    }

    drop(clients);
    assert_eq!(server.stop().store().len(), 8);
}

#[test]
fn test_malformed_request_gets_no_reply() {
    let ctx = Context::new();
    let server = start_server(&ctx);
    let session = ClientSession::connect(&ctx, "raw_client", &server.addr).unwrap();

    // Truncated PUT, then an unknown kind, then a valid GET
    let put = encode_request(1, &Command::put("k", "v")).unwrap();
    session.send(put.slice(..put.len() - 1));
    let mut unknown = encode_request(2, &Command::get("k")).unwrap().to_vec();
    unknown[10] = 9;
    session.send(Bytes::from(unknown));
    session.send(encode_request(3, &Command::get("k")).unwrap());

    let deadline = std::time::Instant::now() + WAIT;
    let reply = loop {
        if let Some(frame) = session.try_receive() {
            break frame;
        }
        assert!(std::time::Instant::now() < deadline, "no reply");
        thread::sleep(Duration::from_millis(5));
    };
    let (envelope, response) = decode_reply(&reply).unwrap();
    assert_eq!(envelope.correlation_id, 3);
    assert_eq!(response, Response::KeyNotExist { key: b"k".to_vec() });

    thread::sleep(Duration::from_millis(100));
    assert!(session.try_receive().is_none());

    drop(session);
    assert!(server.stop().store().is_empty());
}

#[test]
fn test_poll_once_on_idle_server() {
    let ctx = Context::new();
    let mut server = Server::bind(&ctx, test_config()).unwrap();

    assert!(!server.poll_once());
    assert!(server.store().is_empty());
}

#[test]
fn test_server_bind_failure() {
    let ctx = Context::new();
    let first = Server::bind(&ctx, test_config()).unwrap();
    let config = Config::builder()
        .listen_addr(first.local_addr().to_string())
        .build();

    assert!(Server::bind(&ctx, config).is_err());
}

// =============================================================================
// Response Listener Tests
// =============================================================================

#[test]
fn test_listener_stops_promptly() {
    let ctx = Context::new();
    let server = start_server(&ctx);
    let session = Arc::new(ClientSession::connect(&ctx, "listener", &server.addr).unwrap());

    let mut listener =
        ResponseListener::spawn(Arc::clone(&session), Duration::from_millis(10), |_| {}).unwrap();
    assert!(listener.is_running());

    listener.stop();
    assert!(!listener.is_running());

    server.stop();
}

#[test]
fn test_listener_skips_malformed_replies() {
    let ctx = Context::new();
    let server_session = relaykv::transport::ServerSession::bind(&ctx, "127.0.0.1:0").unwrap();
    let addr = server_session.local_addr().to_string();
    let session = Arc::new(ClientSession::connect(&ctx, "picky", &addr).unwrap());

    let (tx, rx) = channel::unbounded();
    let _listener = ResponseListener::spawn(Arc::clone(&session), Duration::from_millis(2), move |reply| {
        let _ = tx.send(reply);
    })
    .unwrap();

    // Route needs the identity registered first
    session.send(encode_request(0, &Command::get("k")).unwrap());
    let (identity, _) = loop {
        if let Some(msg) = server_session.try_receive() {
            break msg;
        }
        thread::sleep(Duration::from_millis(5));
    };

    server_session.send(&identity, Bytes::from_static(b"garbage"));
    let good = relaykv::protocol::encode_reply(0, &Response::KeyNotExist { key: b"k".to_vec() }).unwrap();
    server_session.send(&identity, good);

    let reply = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(reply.response, Response::KeyNotExist { key: b"k".to_vec() });
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

// =============================================================================
// Client Helper Tests
// =============================================================================

#[test]
fn test_parse_command_line() {
    assert_eq!(parse_command_line("put a 1"), Some(Command::put("a", "1")));
    assert_eq!(parse_command_line("  get   a "), Some(Command::get("a")));
    assert_eq!(parse_command_line("delete a"), Some(Command::delete("a")));

    assert_eq!(parse_command_line(""), None);
    assert_eq!(parse_command_line("put a"), None);
    assert_eq!(parse_command_line("put a 1 2"), None);
    assert_eq!(parse_command_line("get"), None);
    assert_eq!(parse_command_line("get a b"), None);
    assert_eq!(parse_command_line("upsert a 1"), None);
}

#[test]
fn test_generate_identity() {
    let identity = generate_identity();
    let n: u32 = identity
        .strip_prefix("client_")
        .expect("prefix")
        .parse()
        .unwrap();

    assert!((1..=1_000_000).contains(&n));
}

#[test]
fn test_response_rendering() {
    let k = || b"k".to_vec();
    let v = || b"v".to_vec();

    assert_eq!(
        Response::KeyAdded { key: k(), value: v() }.to_string(),
        "The item 'k: v' was successfully added to the store."
    );
    assert_eq!(
        Response::KeyValue { key: k(), value: v() }.to_string(),
        "The value of the key 'k' is 'v'"
    );
    assert_eq!(
        Response::KeyDeleted { key: k() }.to_string(),
        "The item with key 'k' was successfully removed from the store."
    );
    assert_eq!(
        Response::KeyNotExist { key: k() }.to_string(),
        "The item with key 'k' does NOT exist in the store."
    );
    assert_eq!(
        Response::KeyAlreadyExist { key: k() }.to_string(),
        "An item with key 'k' already exists in the store."
    );
}
