//! The server's method table: a `methods[]` array looked up by exact
//! name with a linear scan — the same "small table, first match wins"
//! philosophy as `gg_object::map_get`, since a real daemon registers at
//! most a few dozen methods.

use crate::error::CoreBusError;
use crate::response::ResponseHandle;
use gg_object::Object;

/// Per-call context a handler is given: the peer's credentials and its
/// authenticated component identity, read from the connection's bound
/// state rather than any per-message header — the handle is established
/// once at auth time and carried implicitly for every later request on
/// the same connection.
pub struct HandlerContext {
    pub peer_pid: u32,
    pub peer_uid: u32,
    pub component_handle: u16,
    pub component_name: Option<&'static [u8]>,
}

type CallFn = dyn for<'a> Fn(&HandlerContext, Object<'a>, ResponseHandle) -> Result<(), CoreBusError>
    + Send
    + Sync;
type NotificationFn =
    dyn for<'a> Fn(&HandlerContext, Object<'a>) -> Result<(), CoreBusError> + Send + Sync;

pub enum MethodHandler {
    Call(Box<CallFn>),
    Notification(Box<NotificationFn>),
}

pub struct Method {
    pub name: &'static str,
    pub handler: MethodHandler,
}

impl Method {
    /// A method whose handler must respond exactly once or open a stream.
    pub fn call(
        name: &'static str,
        f: impl for<'a> Fn(&HandlerContext, Object<'a>, ResponseHandle) -> Result<(), CoreBusError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Method {
            name,
            handler: MethodHandler::Call(Box::new(f)),
        }
    }

    /// A fire-and-forget method: any response the handler attempts to send
    /// is impossible by construction (no `ResponseHandle` is given), and
    /// the server never waits on or forwards one.
    pub fn notification(
        name: &'static str,
        f: impl for<'a> Fn(&HandlerContext, Object<'a>) -> Result<(), CoreBusError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Method {
            name,
            handler: MethodHandler::Notification(Box::new(f)),
        }
    }

    pub fn is_notification(&self) -> bool {
        matches!(self.handler, MethodHandler::Notification(_))
    }
}

pub struct MethodTable(Vec<Method>);

impl MethodTable {
    pub fn new(methods: Vec<Method>) -> Self {
        MethodTable(methods)
    }

    pub fn find(&self, name: &str) -> Option<&Method> {
        self.0.iter().find(|m| m.name == name)
    }
}
