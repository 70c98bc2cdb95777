//! Tests for Dispatcher
//!
//! These tests verify:
//! - Put/Get/Delete outcomes against the Store
//! - Insert-only Put
//! - Frame handling: reply encoding, correlation id echo
//! - Malformed frames never reach the Store

use relaykv::protocol::{decode_reply, encode_request, Command, CommandKind, Response};
use relaykv::Dispatcher;

// =============================================================================
// Helper Functions
// =============================================================================

fn key_added(key: &str, value: &str) -> Response {
    Response::KeyAdded {
        key: key.into(),
        value: value.into(),
    }
}

fn key_value(key: &str, value: &str) -> Response {
    Response::KeyValue {
        key: key.into(),
        value: value.into(),
    }
}

fn key_not_exist(key: &str) -> Response {
    Response::KeyNotExist { key: key.into() }
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_put_absent_key_adds() {
    let mut dispatcher = Dispatcher::new();

    let resp = dispatcher.dispatch(Command::put("hello", "world"));

    assert_eq!(resp, key_added("hello", "world"));
    assert_eq!(dispatcher.store().get(b"hello"), Some(&b"world"[..]));
}

#[test]
fn test_put_then_get() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.dispatch(Command::put("k", "v"));

    assert_eq!(dispatcher.dispatch(Command::get("k")), key_value("k", "v"));
}

#[test]
fn test_put_present_key_does_not_overwrite() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.dispatch(Command::put("k", "first"));

    let resp = dispatcher.dispatch(Command::put("k", "second"));

    assert_eq!(resp, Response::KeyAlreadyExist { key: b"k".to_vec() });
    assert_eq!(dispatcher.store().get(b"k"), Some(&b"first"[..]));
}

#[test]
fn test_get_absent_key() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.dispatch(Command::put("other", "1"));

    assert_eq!(dispatcher.dispatch(Command::get("missing")), key_not_exist("missing"));
    assert_eq!(dispatcher.store().len(), 1);
}

#[test]
fn test_delete_absent_key() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.dispatch(Command::put("other", "1"));

    assert_eq!(dispatcher.dispatch(Command::delete("missing")), key_not_exist("missing"));
    assert_eq!(dispatcher.store().len(), 1);
}

#[test]
fn test_delete_then_get() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.dispatch(Command::put("k", "v"));

    assert_eq!(
        dispatcher.dispatch(Command::delete("k")),
        Response::KeyDeleted { key: b"k".to_vec() }
    );
    assert_eq!(dispatcher.dispatch(Command::get("k")), key_not_exist("k"));
    assert!(dispatcher.store().is_empty());
}

#[test]
fn test_put_after_delete_adds_again() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.dispatch(Command::put("k", "1"));
    dispatcher.dispatch(Command::delete("k"));

    assert_eq!(dispatcher.dispatch(Command::put("k", "2")), key_added("k", "2"));
}

#[test]
fn test_scenario_sequence() {
    let mut dispatcher = Dispatcher::new();

    assert_eq!(dispatcher.dispatch(Command::put("a", "1")), key_added("a", "1"));
    assert_eq!(
        dispatcher.dispatch(Command::put("a", "2")),
        Response::KeyAlreadyExist { key: b"a".to_vec() }
    );
    assert_eq!(dispatcher.store().get(b"a"), Some(&b"1"[..]));
    assert_eq!(dispatcher.dispatch(Command::get("a")), key_value("a", "1"));
    assert_eq!(
        dispatcher.dispatch(Command::delete("a")),
        Response::KeyDeleted { key: b"a".to_vec() }
    );
    assert_eq!(dispatcher.dispatch(Command::get("a")), key_not_exist("a"));
}

// =============================================================================
// Frame Handling Tests
// =============================================================================

#[test]
fn test_handle_frame_echoes_correlation_id() {
    let mut dispatcher = Dispatcher::new();
    let request = encode_request(4242, &Command::put("x", "1")).unwrap();

    let (envelope, reply) = dispatcher.handle_frame(&request).unwrap();
    assert_eq!(envelope.correlation_id, 4242);
    assert_eq!(envelope.kind, CommandKind::Put as u8);

    let (reply_envelope, response) = decode_reply(&reply).unwrap();
    assert_eq!(reply_envelope.correlation_id, 4242);
    assert_eq!(response, key_added("x", "1"));
}

#[test]
fn test_truncated_frame_does_not_mutate() {
    let mut dispatcher = Dispatcher::new();
    let request = encode_request(1, &Command::put("key", "value")).unwrap();

    for cut in 0..request.len() {
        let err = dispatcher.handle_frame(&request[..cut]).unwrap_err();
        assert!(err.is_decode_failure());
    }
    assert!(dispatcher.store().is_empty());
}

#[test]
fn test_unknown_kind_does_not_mutate() {
    let mut dispatcher = Dispatcher::new();
    let mut request = encode_request(1, &Command::put("key", "value")).unwrap().to_vec();
    request[10] = 0x7F;

    assert!(dispatcher.handle_frame(&request).is_err());
    assert!(dispatcher.store().is_empty());
}

#[test]
fn test_oversized_length_prefix_does_not_mutate() {
    let mut dispatcher = Dispatcher::new();
    let mut request = encode_request(1, &Command::put("key", "value")).unwrap().to_vec();
    // Value length claims far more bytes than remain
    let value_len_at = 11 + 2 + 3;
    request[value_len_at..value_len_at + 2].copy_from_slice(&500u16.to_ne_bytes());

    assert!(dispatcher.handle_frame(&request).unwrap_err().is_decode_failure());
    assert!(dispatcher.store().is_empty());
}
