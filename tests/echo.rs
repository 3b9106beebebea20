//! End-to-end scenario 1: a registered client calls a method and gets back
//! exactly the payload the handler chose to send.

use gg_corebus::Method;
use gg_object::{Arena, Buffer, Object};
use gg_test_support::TestServer;

#[test]
fn echo_round_trips_the_request_payload() {
    let methods = vec![Method::call("echo", |_ctx, params, resp| resp.respond(&params))];
    let Some(server) = TestServer::try_start(methods) else {
        return; // no /dev/random in this sandbox; nothing to test
    };

    let client = server.connect_client(b"com.example.echo-test");

    let arena = Arena::new(4096);
    let entries = arena
        .alloc_slice_copy(&[(Buffer::from("message"), Object::Buf(Buffer::from("hello")))])
        .unwrap();

    let response_arena = Arena::new(4096);
    let response = client
        .call("echo", &Object::Map(entries), &response_arena)
        .expect("echo call should succeed");

    let map = response.as_map().expect("echo response should be a map");
    let value = gg_object::map_get(map, Buffer::from("message")).expect("message key present");
    assert_eq!(value.as_buf().unwrap().as_str().unwrap(), "hello");
}

#[test]
fn unknown_method_gets_a_non_fatal_error_response() {
    let methods = vec![Method::call("echo", |_ctx, params, resp| resp.respond(&params))];
    let Some(server) = TestServer::try_start(methods) else {
        return;
    };
    let client = server.connect_client(b"com.example.unknown-method-test");

    let response_arena = Arena::new(64);
    let result = client.call("does.not.exist", &Object::Map(&[]), &response_arena);
    match result {
        Err(gg_corebus::CoreBusError::Remote(kind, _)) => {
            assert_eq!(kind, gg_corebus::ErrorKind::MethodNotFound);
        }
        other => panic!("expected MethodNotFound remote error, got {other:?}"),
    }

    // The connection survives an unknown-method error: a subsequent valid
    // call on the same client still succeeds.
    let follow_up_arena = Arena::new(4096);
    let entries = follow_up_arena
        .alloc_slice_copy(&[(Buffer::from("message"), Object::Buf(Buffer::from("still here")))])
        .unwrap();
    let response_arena2 = Arena::new(4096);
    let response = client
        .call("echo", &Object::Map(entries), &response_arena2)
        .expect("connection should still be usable after an unrelated MethodNotFound error");
    let map = response.as_map().unwrap();
    let value = gg_object::map_get(map, Buffer::from("message")).unwrap();
    assert_eq!(value.as_buf().unwrap().as_str().unwrap(), "still here");
}
