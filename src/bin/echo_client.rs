// echo-client: a component bootstrapping against the Core-Bus contract —
// reads its socket path and SVCUID from the environment, calls `echo`,
// then opens a `stream.count` subscription and prints each event.

use gg_corebus::Client;
use gg_object::{Arena, Buffer, Object};
use std::sync::mpsc;
use tracing::info;

const SOCKET_ENV_VAR: &str = "AWS_GG_NUCLEUS_DOMAIN_SOCKET_FILEPATH_FOR_COMPONENT";

fn socket_path() -> String {
    std::env::var(SOCKET_ENV_VAR).unwrap_or_else(|_| {
        ggcore::config::load_config()
            .map(|cfg| cfg.socket_path)
            .unwrap_or_else(|_| ggcore::config::DEFAULT_SOCKET_PATH.to_owned())
    })
}

fn main() {
    ggcore::logging::init();

    let socket_path = socket_path();
    info!(socket_path = %socket_path, "echo-client connecting");

    let client = match Client::connect(&socket_path) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("FATAL: failed to connect and authenticate: {e}");
            std::process::exit(1);
        }
    };

    let message = std::env::args().nth(1).unwrap_or_else(|| "hello".to_owned());
    let call_arena = Arena::new(4096);
    let entries = call_arena
        .alloc_slice_copy(&[(Buffer::from("message"), Object::Buf(Buffer::from(message.as_str())))])
        .expect("echo params fit comfortably in 4KiB");

    let response_arena = Arena::new(4096);
    match client.call("echo", &Object::Map(entries), &response_arena) {
        Ok(response) => println!("echo response: {response:?}"),
        Err(e) => {
            eprintln!("FATAL: echo call failed: {e}");
            std::process::exit(1);
        }
    }

    let stream_arena = Arena::new(64);
    let stream_params = stream_arena
        .alloc_slice_copy(&[(Buffer::from("count"), Object::I64(3))])
        .expect("stream params fit comfortably in 64B");

    let (tx, rx) = mpsc::channel();
    let sub = match client.subscribe(
        "stream.count",
        &Object::Map(stream_params),
        move |event| {
            let _ = tx.send(format!("{event:?}"));
        },
        |result| {
            if let Err(e) = result {
                eprintln!("stream closed with an error: {e}");
            }
        },
    ) {
        Ok(sub) => sub,
        Err(e) => {
            eprintln!("FATAL: stream.count subscribe failed: {e}");
            std::process::exit(1);
        }
    };

    for _ in 0..3 {
        if let Ok(event) = rx.recv() {
            println!("stream event: {event}");
        }
    }
    sub.close_sub();
}
