//! End-to-end scenario 5: a call that upgrades to a stream delivers its
//! events in order and then closes cleanly.

use gg_corebus::Method;
use gg_object::{Arena, Buffer, Object};
use gg_test_support::TestServer;
use std::sync::mpsc;

fn stream_count_method() -> Method {
    Method::call("stream.count", |_ctx, params, resp| {
        let count = params
            .as_map()
            .and_then(|m| gg_object::map_get(m, Buffer::from("count")))
            .and_then(Object::as_i64)
            .unwrap_or(0)
            .max(0);
        let stream = resp.sub_accept();
        std::thread::spawn(move || {
            for i in 0..count {
                if stream.sub_response(&Object::I64(i)).is_err() {
                    return;
                }
            }
            let _ = stream.sub_close(None);
        });
        Ok(())
    })
}

#[test]
fn stream_delivers_events_in_order_then_closes() {
    let Some(server) = TestServer::try_start(vec![stream_count_method()]) else {
        return;
    };
    let client = server.connect_client(b"com.example.stream-test");

    let arena = Arena::new(64);
    let params = arena
        .alloc_slice_copy(&[(Buffer::from("count"), Object::I64(3))])
        .unwrap();

    let (events_tx, events_rx) = mpsc::channel();
    let (close_tx, close_rx) = mpsc::channel();
    let _sub = client
        .subscribe(
            "stream.count",
            &Object::Map(params),
            move |event| {
                let _ = events_tx.send(event.as_i64().expect("stream.count emits integers"));
            },
            move |result| {
                let _ = close_tx.send(result);
            },
        )
        .expect("subscribe should succeed");

    let received: Vec<i64> = (0..3).map(|_| events_rx.recv().unwrap()).collect();
    assert_eq!(received, vec![0, 1, 2]);
    assert!(close_rx.recv().unwrap().is_ok());
}

#[test]
fn closing_a_subscription_stops_local_delivery() {
    let Some(server) = TestServer::try_start(vec![stream_count_method()]) else {
        return;
    };
    let client = server.connect_client(b"com.example.stream-close-test");

    let arena = Arena::new(64);
    let params = arena
        .alloc_slice_copy(&[(Buffer::from("count"), Object::I64(1))])
        .unwrap();

    let (events_tx, events_rx) = mpsc::channel();
    let sub = client
        .subscribe(
            "stream.count",
            &Object::Map(params),
            move |event| {
                let _ = events_tx.send(event.as_i64().unwrap());
            },
            |_result| {},
        )
        .expect("subscribe should succeed");

    assert_eq!(events_rx.recv().unwrap(), 0);
    sub.close_sub();
}
