//! The readiness-driven event loop: accept, read drain, write flush,
//! deferred close, shutdown.

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::SocketAddr;
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::dispatcher;
use crate::error::{Result, ServerError};
use crate::message::{self, Message};
use crate::server::{Handle, Server};

const LISTENER_TOKEN: Token = Token(usize::MAX);
const POLL_TIMEOUT: Duration = Duration::from_secs(1);
const READ_CHUNK: usize = 512;

/// Owns the readiness multiplexer, the raw sockets, and the protocol-level
/// [`Server`] state, and drives them all from a single thread.
pub struct EventLoop {
    poll: Poll,
    listener: TcpListener,
    streams: HashMap<Handle, TcpStream>,
    server: Server,
    stop: Arc<AtomicBool>,
}

impl EventLoop {
    /// Binds the listening socket (`SO_REUSEADDR`, non-blocking, backlog
    /// `SOMAXCONN`) and registers it with a fresh `Poll`.
    pub fn bind(port: u16, password: String, stop: Arc<AtomicBool>) -> Result<EventLoop> {
        let addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], port));
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).map_err(ServerError::Bind)?;
        socket.set_reuse_address(true).map_err(ServerError::Bind)?;
        socket.set_nonblocking(true).map_err(ServerError::Bind)?;
        socket.bind(&addr.into()).map_err(ServerError::Bind)?;
        socket.listen(i32::MAX).map_err(ServerError::Listen)?;

        let std_listener: std::net::TcpListener = socket.into();
        let mut listener = TcpListener::from_std(std_listener);

        let poll = Poll::new().map_err(ServerError::Poll)?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)
            .map_err(ServerError::Poll)?;

        Ok(EventLoop {
            poll,
            listener,
            streams: HashMap::new(),
            server: Server::new("ircserv", "0.1", password),
            stop,
        })
    }

    /// The address the listener actually bound to; useful for tests that
    /// bind to port 0 and need to learn which port the OS picked.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs until the shutdown flag is observed, then tears every
    /// connection down and returns.
    pub fn run(&mut self) {
        let mut events = Events::with_capacity(1024);
        loop {
            if self.stop.load(Ordering::SeqCst) {
                info!("shutdown flag observed, stopping event loop");
                break;
            }

            match self.poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!(error = %e, "poll failed, stopping event loop");
                    break;
                }
            }

            let tokens: Vec<Token> = events.iter().map(|e| e.token()).collect();
            let mut handled_listener = false;
            for token in tokens {
                if token == LISTENER_TOKEN {
                    if !handled_listener {
                        self.accept_all();
                        handled_listener = true;
                    }
                    continue;
                }
                let handle = token.0 as Handle;
                self.service(handle);
            }

            self.reconcile_all();
        }
        self.shutdown();
    }

    /// Reading is attempted before teardown even when hangup is
    /// co-asserted, so buffered commands are not lost.
    fn service(&mut self, handle: Handle) {
        if !self.server.connections.contains_key(&handle) {
            return;
        }
        self.drain_read(handle);
        if !self.server.connections.contains_key(&handle) {
            return;
        }
        self.flush_write(handle);
        if !self.server.connections.contains_key(&handle) {
            return;
        }
        self.reconcile_one(handle);
    }

    fn accept_all(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    let _ = stream.set_nodelay(true);
                    let fd = stream.as_raw_fd();
                    let handle = fd as Handle;
                    let token = Token(fd as usize);
                    if let Err(e) = self.poll.registry().register(&mut stream, token, Interest::READABLE) {
                        warn!(error = %e, "failed to register accepted connection");
                        continue;
                    }
                    debug!(%addr, handle, "accepted connection");
                    self.streams.insert(handle, stream);
                    self.server.connections.insert(handle, Connection::new(handle));
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    break;
                }
            }
        }
    }

    /// Drains all currently-available bytes into the connection's input
    /// buffer, enforcing the overlong-line guard after each read, then
    /// extracts and dispatches every complete line in arrival order.
    fn drain_read(&mut self, handle: Handle) {
        let mut peer_closed = false;
        loop {
            let mut buf = [0u8; READ_CHUNK];
            let Some(stream) = self.streams.get_mut(&handle) else {
                return;
            };
            match stream.read(&mut buf) {
                Ok(0) => {
                    peer_closed = true;
                    break;
                }
                Ok(n) => {
                    let Some(conn) = self.server.connections.get_mut(&handle) else {
                        return;
                    };
                    conn.input.extend_from_slice(&buf[..n]);
                    if message::unfinished_tail_len(&conn.input) > message::MAX_LINE_BODY {
                        warn!(handle, "overlong unfinished line, closing connection");
                        self.destroy_connection(handle);
                        return;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(handle, error = %e, "read error, closing connection");
                    self.destroy_connection(handle);
                    return;
                }
            }
        }

        loop {
            let Some(conn) = self.server.connections.get_mut(&handle) else {
                return;
            };
            let Some(line) = message::extract_line(&mut conn.input) else {
                break;
            };
            if line.is_empty() {
                continue;
            }
            let msg = Message::parse(&line);
            dispatcher::dispatch(&mut self.server, handle, msg);
            if self.destroy_if_closing(handle) || !self.server.connections.contains_key(&handle) {
                return;
            }
        }

        if peer_closed {
            self.destroy_connection(handle);
        }
    }

    /// Sends as much of the output buffer as the socket will currently
    /// accept. Realizes the deferred-close pattern once the buffer drains
    /// on a connection marked `closing`.
    fn flush_write(&mut self, handle: Handle) {
        loop {
            let is_empty = match self.server.connections.get(&handle) {
                Some(conn) => conn.output.is_empty(),
                None => return,
            };
            if is_empty {
                break;
            }

            let write_result = {
                let Some(stream) = self.streams.get_mut(&handle) else {
                    return;
                };
                let conn = self.server.connections.get(&handle).unwrap();
                stream.write(&conn.output)
            };

            match write_result {
                Ok(0) => break,
                Ok(n) => {
                    if let Some(conn) = self.server.connections.get_mut(&handle) {
                        conn.output.drain(..n);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(handle, error = %e, "write error, closing connection");
                    self.destroy_connection(handle);
                    return;
                }
            }
        }
        self.destroy_if_closing(handle);
    }

    /// If `handle` is marked `closing` and its output buffer has drained,
    /// destroys it now. Returns whether that happened.
    fn destroy_if_closing(&mut self, handle: Handle) -> bool {
        let should = self
            .server
            .connections
            .get(&handle)
            .map(|c| c.closing && c.output.is_empty())
            .unwrap_or(false);
        if should {
            self.destroy_connection(handle);
        }
        should
    }

    /// Sweeps every connection for a write-interest mismatch, not just the
    /// handle(s) that fired this tick. A broadcast (channel fan-out, QUIT
    /// notices, an INVITE notify) can queue bytes on a connection other
    /// than the one that was serviced, and that connection's token won't
    /// re-fire on its own to trigger `reconcile_one` for it.
    fn reconcile_all(&mut self) {
        let handles: Vec<Handle> = self
            .server
            .connections
            .iter()
            .filter(|(_, conn)| !conn.output.is_empty() != conn.write_interest)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in handles {
            self.reconcile_one(handle);
        }
    }

    /// Adjusts write-interest registration for `handle` to match whether
    /// it currently has queued output.
    fn reconcile_one(&mut self, handle: Handle) {
        let Some(conn) = self.server.connections.get(&handle) else {
            return;
        };
        let want_write = !conn.output.is_empty();
        if want_write == conn.write_interest {
            return;
        }
        let Some(stream) = self.streams.get_mut(&handle) else {
            return;
        };
        let interest = if want_write {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };
        if self
            .poll
            .registry()
            .reregister(stream, Token(handle as usize), interest)
            .is_ok()
        {
            if let Some(conn) = self.server.connections.get_mut(&handle) {
                conn.write_interest = want_write;
            }
        }
    }

    fn destroy_connection(&mut self, handle: Handle) {
        if let Some(mut stream) = self.streams.remove(&handle) {
            let _ = self.poll.registry().deregister(&mut stream);
        }
        self.server.disconnect(handle);
    }

    fn shutdown(&mut self) {
        let handles: Vec<Handle> = self.streams.keys().copied().collect();
        for handle in handles {
            self.destroy_connection(handle);
        }
        let _ = self.poll.registry().deregister(&mut self.listener);
        info!("event loop shut down, all connections closed");
    }
}
