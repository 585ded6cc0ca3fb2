//! A single-threaded, readiness-driven IRC-compatible chat server.
//!
//! The connection-handling pipeline runs front-to-back through these
//! modules: [`message`] frames wire bytes into [`Message`] values,
//! [`dispatcher`] routes them to [`handlers`], which mutate the
//! process-wide [`server::Server`] and enqueue [`response`] numerics back
//! onto connections. [`event_loop`] is the only module that touches
//! sockets or the readiness multiplexer.

pub mod channel;
pub mod cli;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod event_loop;
pub mod handlers;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod registry;
pub mod response;
pub mod server;

pub use crate::connection::Connection;
pub use crate::error::{Result, ServerError};
pub use crate::message::Message;
pub use crate::prefix::Prefix;
pub use crate::server::{Handle, Server};
