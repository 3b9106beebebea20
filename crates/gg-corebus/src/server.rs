//! Public server surface: `listen`, and the `Server` type it's built on.
//!
//! `listen(socket_path, methods[])` never returns on success.
//! `Server::bind`/`Server::serve` are the same loop split into two steps
//! so test harnesses (`gg-test-support`) can run it on a background
//! thread and stop it with a shutdown flag — `listen` itself never needs
//! one, since a real daemon's socket only goes away with the process.

use crate::connection::handle_connection;
use crate::error::CoreBusError;
use crate::method::{Method, MethodTable};
use gg_ipc_auth::ProcessContext;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default maximum message length in bytes.
pub const DEFAULT_MAX_MSG_LEN: usize = 10_000;
/// The blocking send timeout that turns a stuck client into a torn-down
/// connection.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// A bound listening socket, not yet accepting connections. Created with
/// mode `0700` (owner-only) — the socket path is the daemon's public
/// identity, but only for processes that share its uid.
pub struct Server {
    listener: UnixListener,
    socket_path: PathBuf,
    max_msg_len: usize,
}

impl Server {
    pub fn bind(socket_path: impl AsRef<Path>) -> Result<Self, CoreBusError> {
        Self::bind_with_max_len(socket_path, DEFAULT_MAX_MSG_LEN)
    }

    pub fn bind_with_max_len(
        socket_path: impl AsRef<Path>,
        max_msg_len: usize,
    ) -> Result<Self, CoreBusError> {
        let socket_path = socket_path.as_ref().to_path_buf();
        // A stale socket file from a prior crash must not block bind; a
        // live socket would fail to bind regardless (AddrInUse), so this
        // is safe either way.
        if socket_path.exists() {
            let _ = fs::remove_file(&socket_path);
        }
        let listener = UnixListener::bind(&socket_path)?;
        fs::set_permissions(&socket_path, fs::Permissions::from_mode(0o700))?;
        listener.set_nonblocking(true)?;
        Ok(Server {
            listener,
            socket_path,
            max_msg_len,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept connections and dispatch until `shutdown` is set. Each
    /// accepted connection gets its own OS thread: an accept loop plus
    /// thread-per-connection, rather than a shared worker pool.
    pub fn serve(
        &self,
        methods: Arc<MethodTable>,
        ctx: Arc<ProcessContext>,
        shutdown: &AtomicBool,
    ) -> Result<(), CoreBusError> {
        loop {
            if shutdown.load(Ordering::Acquire) {
                return Ok(());
            }
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(false)?;
                    let methods = Arc::clone(&methods);
                    let ctx = Arc::clone(&ctx);
                    let max_msg_len = self.max_msg_len;
                    thread::spawn(move || {
                        if let Err(e) =
                            handle_connection(stream, &methods, &ctx, max_msg_len, SEND_TIMEOUT)
                        {
                            tracing::debug!(error = %e, "connection closed");
                        }
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.socket_path);
    }
}

/// Bind and serve forever. Returns only on a fatal accept-loop error —
/// the never-returns-on-success contract a real daemon's `main` expects.
pub fn listen(
    socket_path: impl AsRef<Path>,
    methods: Vec<Method>,
    ctx: Arc<ProcessContext>,
) -> Result<(), CoreBusError> {
    let server = Server::bind(socket_path)?;
    let methods = Arc::new(MethodTable::new(methods));
    let shutdown = AtomicBool::new(false);
    server.serve(methods, ctx, &shutdown)
}
