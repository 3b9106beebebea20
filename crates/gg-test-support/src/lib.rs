//! In-process test harness for `gg-corebus`: spins up a real `Server` on a
//! temp-directory socket in a background thread and tears it down on
//! `Drop`, mirroring how this workspace's other integration-test
//! harnesses wrap a real server rather than a mock. No async runtime
//! here, so the equivalent is a blocking accept loop on its own thread.

use gg_corebus::{Client, Method, MethodTable, Server};
use gg_ipc_auth::{AllowAll, ProcessContext};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tempfile::TempDir;

pub struct TestServer {
    _dir: TempDir,
    socket_path: PathBuf,
    ctx: Arc<ProcessContext>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server with the given methods. Returns `None` if the
    /// process context's entropy source is unavailable (some sandboxes
    /// have no `/dev/random`) — callers should skip the test in that case,
    /// the same convention `gg-ipc-auth`'s own unit tests use.
    pub fn try_start(methods: Vec<Method>) -> Option<Self> {
        let ctx = ProcessContext::new(Box::new(AllowAll)).ok()?;
        Some(Self::start_with_context(methods, Arc::new(ctx)))
    }

    /// Like `try_start`, but binds with a caller-chosen `max_msg_len`
    /// instead of the default — the oversize-rejection scenario needs a
    /// small bound it can exceed without sending megabytes of payload.
    pub fn try_start_with_max_len(methods: Vec<Method>, max_msg_len: usize) -> Option<Self> {
        let ctx = ProcessContext::new(Box::new(AllowAll)).ok()?;
        Some(Self::start_with_context_and_max_len(
            methods,
            Arc::new(ctx),
            max_msg_len,
        ))
    }

    pub fn start_with_context(methods: Vec<Method>, ctx: Arc<ProcessContext>) -> Self {
        Self::start_with_context_and_max_len(methods, ctx, gg_corebus::DEFAULT_MAX_MSG_LEN)
    }

    pub fn start_with_context_and_max_len(
        methods: Vec<Method>,
        ctx: Arc<ProcessContext>,
        max_msg_len: usize,
    ) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir for test socket");
        let socket_path = dir.path().join("core-bus.sock");
        let server = Server::bind_with_max_len(&socket_path, max_msg_len).expect("bind test socket");
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_for_thread = Arc::clone(&shutdown);
        let methods = Arc::new(MethodTable::new(methods));
        let ctx_for_thread = Arc::clone(&ctx);

        let thread = std::thread::spawn(move || {
            let _ = server.serve(methods, ctx_for_thread, &shutdown_for_thread);
        });

        TestServer {
            _dir: dir,
            socket_path,
            ctx,
            shutdown,
            thread: Some(thread),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Register a component name directly against the server's registry,
    /// bypassing whatever out-of-process mechanism would normally call
    /// `register` (spawning the component, in a real daemon).
    pub fn register_component(&self, name: &[u8]) -> (u16, [u8; 16]) {
        let (handle, svcuid) = self
            .ctx
            .register(name)
            .expect("component registration should succeed in tests");
        (handle, *svcuid.as_bytes())
    }

    /// Register a fresh component and return a connected, authenticated
    /// client for it — the common case for tests that only care about
    /// what happens after the handshake.
    pub fn connect_client(&self, component_name: &[u8]) -> Client {
        let (_, svcuid) = self.register_component(component_name);
        Client::connect_with_svcuid(self.socket_path(), svcuid)
            .expect("client should connect and authenticate")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
