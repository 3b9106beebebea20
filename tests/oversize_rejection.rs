//! End-to-end scenario 2: a frame exceeding the server's configured
//! `max_msg_len` tears the connection down instead of being partially read.

use gg_corebus::{CoreBusError, Method};
use gg_object::{Arena, Buffer, Object};
use gg_test_support::TestServer;

#[test]
fn oversize_request_tears_down_the_connection() {
    let methods = vec![Method::call("echo", |_ctx, params, resp| resp.respond(&params))];
    let Some(server) = TestServer::try_start_with_max_len(methods, 256) else {
        return;
    };

    let client = server.connect_client(b"com.example.oversize-test");

    let arena = Arena::new(8192);
    let big = arena.alloc_bytes(&vec![b'x'; 4096]).unwrap();
    let entries = arena
        .alloc_slice_copy(&[(Buffer::from("payload"), Object::Buf(Buffer::new(big)))])
        .unwrap();

    let response_arena = Arena::new(64);
    let result = client.call("echo", &Object::Map(entries), &response_arena);
    assert!(
        matches!(result, Err(CoreBusError::Io(_))),
        "oversize request should fail the call via connection teardown, got {result:?}"
    );
}
