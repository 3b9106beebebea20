//! Core-Bus: the length-prefixed, framed request/response/notification/
//! stream RPC over a Unix-domain socket that every other daemon in the
//! constellation is built on.
//!
//! No coroutines or async runtime anywhere in this crate — each
//! connection has exactly one reader thread and a mutex-guarded send
//! half. OS threads with blocking I/O, not an executor.

mod client;
mod connection;
mod error;
mod frame;
mod method;
mod response;
mod server;
mod transport;

pub use client::{Client, SubHandle};
pub use error::{CoreBusError, ErrorKind};
pub use frame::AUTH_METHOD;
pub use method::{HandlerContext, Method, MethodHandler, MethodTable};
pub use response::{ResponseHandle, StreamHandle};
pub use server::{listen, Server, DEFAULT_MAX_MSG_LEN, SEND_TIMEOUT};
