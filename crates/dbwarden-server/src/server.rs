//! Single-threaded `mio` event loop serving the HTTP endpoints.

use std::collections::HashMap;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::{ServerError, ServerResult};
use crate::handler::{RequestHandler, error_response};

const LISTENER_TOKEN: Token = Token(0);

/// How long one poll waits before re-checking shutdown and idle connections.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Shutdown
// ============================================================================

/// Cloneable handle that stops a running [`Server`].
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Requests shutdown on SIGINT or SIGTERM.
    #[cfg(unix)]
    pub fn register_signals(&self) -> io::Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};

        signal_hook::flag::register(SIGINT, Arc::clone(&self.flag))?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&self.flag))?;
        Ok(())
    }

    /// Requests shutdown on Ctrl-C.
    #[cfg(windows)]
    pub fn register_signals(&self) -> io::Result<()> {
        let flag = Arc::clone(&self.flag);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

// ============================================================================
// Server
// ============================================================================

/// The dbwarden HTTP server.
pub struct Server {
    config: ServerConfig,
    handler: RequestHandler,
    poll: Poll,
    listener: TcpListener,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Binds the listener. Requests are not served until [`run`](Self::run).
    pub fn new(config: ServerConfig, handler: RequestHandler) -> ServerResult<Self> {
        let poll = Poll::new()?;
        let mut listener =
            TcpListener::bind(config.bind_addr).map_err(|source| ServerError::BindFailed {
                addr: config.bind_addr,
                source,
            })?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        Ok(Self {
            config,
            handler,
            poll,
            listener,
            connections: HashMap::new(),
            next_token: 1,
            shutdown: ShutdownHandle::default(),
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Serves requests until shutdown is requested.
    pub fn run(&mut self) -> ServerResult<()> {
        info!(
            addr = %self.local_addr()?,
            store = self.handler.updater().store().name(),
            "dbwarden listening"
        );

        while !self.shutdown.is_shutdown() {
            self.poll_once(Some(POLL_INTERVAL))?;
        }

        info!(open = self.connection_count(), "server shutting down");
        Ok(())
    }

    /// Runs one iteration of the event loop.
    pub fn poll_once(&mut self, timeout: Option<Duration>) -> ServerResult<()> {
        let mut events = Events::with_capacity(128);
        match self.poll.poll(&mut events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        for event in &events {
            match event.token() {
                LISTENER_TOKEN => self.accept()?,
                token => self.service(token, event.is_readable()),
            }
        }

        self.close_idle();
        Ok(())
    }

    fn accept(&mut self) -> ServerResult<()> {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    if self.connection_count() >= self.config.max_connections {
                        let error = ServerError::MaxConnectionsReached(self.config.max_connections);
                        warn!(%addr, %error, "refusing connection");
                        // Best effort: the socket is dropped either way
                        let _ = stream.write(&error_response(&error).to_bytes());
                        continue;
                    }

                    let token = Token(self.next_token);
                    self.next_token += 1;
                    self.poll
                        .registry()
                        .register(&mut stream, token, Interest::READABLE)?;
                    self.connections
                        .insert(token, Connection::new(stream, self.config.buffer_size));
                    debug!(%addr, ?token, "accepted connection");
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn service(&mut self, token: Token, readable: bool) {
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };

        let mut close = false;
        let mut peer_closed = false;

        if readable && !conn.closing {
            match conn.read() {
                Ok(open) => peer_closed = !open,
                Err(e) => {
                    debug!(?token, error = %e, "read failed");
                    close = true;
                }
            }
            conn.touch();

            if !close {
                match conn.try_parse_request(self.config.max_request_bytes) {
                    Ok(Some(request)) => {
                        let response = self.handler.handle(&request, Utc::now());
                        debug!(?token, status = response.status, "request served");
                        conn.queue_response(&response);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        debug!(?token, error = %e, "rejecting request");
                        conn.queue_response(&error_response(&e));
                    }
                }
            }
        }

        if !close && !conn.write_buf.is_empty() {
            if let Err(e) = conn.write() {
                debug!(?token, error = %e, "write failed");
                close = true;
            }
        }

        close = close || conn.is_done() || (peer_closed && conn.write_buf.is_empty());
        if !close {
            let interest = conn.interest();
            if let Err(e) = self
                .poll
                .registry()
                .reregister(&mut conn.stream, token, interest)
            {
                debug!(?token, error = %e, "reregister failed");
                close = true;
            }
        }

        if close {
            self.close(token);
        }
    }

    fn close_idle(&mut self) {
        let timeout = self.config.idle_timeout;
        let idle: Vec<Token> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.is_idle(timeout))
            .map(|(token, _)| *token)
            .collect();

        for token in idle {
            debug!(?token, "closing idle connection");
            self.close(token);
        }
    }

    fn close(&mut self, token: Token) {
        if let Some(mut conn) = self.connections.remove(&token) {
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
    }
}
