// CDP client library for debugger test harnesses
//
// Implements the client side of a Chrome-DevTools-Protocol style endpoint:
// - WebSocket connection management
// - Command/reply correlation
// - In-order notification delivery
// - Typed Debugger, Runtime and Profiler commands

pub mod connection;
pub mod protocol;
pub mod commands;
pub mod events;
pub mod types;
pub mod debugger;
pub mod runtime;
pub mod profiler;
mod eventloop;

// The mock endpoint is only needed for tests and downstream integration suites.
#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use commands::Command;
pub use connection::{CdpConnection, ConnectionConfig, NotificationStream};
pub use events::{Event, Notification, Paused, ScriptParsed};
pub use protocol::{CdpError, CdpResult, CommandReply};
pub use types::{CallFrame, Location, PropertyDescriptor, RemoteObject};
