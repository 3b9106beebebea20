// echo-server: a minimal Core-Bus daemon exercising the full stack end to
// end — auth handshake, a call method, and a streaming method — against
// real connecting clients.

use gg_corebus::{Method, MethodTable, Server};
use gg_ipc_auth::{AllowAll, ProcessContext};
use gg_object::{Buffer, Object};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

fn methods() -> Vec<Method> {
    vec![
        Method::call("echo", |_ctx, params, resp| resp.respond(&params)),
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
        }),
    ]
}

fn main() {
    ggcore::logging::init();

    let cfg = match ggcore::config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("FATAL: failed to load config: {e}");
            std::process::exit(1);
        }
    };
    info!(
        socket_path = %cfg.socket_path,
        max_msg_len = cfg.max_msg_len,
        "echo-server starting"
    );

    let ctx = match ProcessContext::new(Box::new(AllowAll)) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    let server = match Server::bind_with_max_len(&cfg.socket_path, cfg.max_msg_len) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("FATAL: failed to bind socket '{}': {e}", cfg.socket_path);
            std::process::exit(1);
        }
    };

    let methods = Arc::new(MethodTable::new(methods()));
    let shutdown = AtomicBool::new(false);
    if let Err(e) = server.serve(methods, ctx, &shutdown) {
        eprintln!("FATAL: accept loop exited: {e}");
        std::process::exit(1);
    }
}
