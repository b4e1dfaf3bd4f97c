//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Chat server implementation
//!
//! The ChatServer owns the session registry and controls the listener. The
//! listener can be started and stopped any number of times; stopping it
//! leaves existing sessions connected.

use crate::{
    BroadcastResult, ChatConnection, ConnectionWorker, DisplaySink, MessageRouter, RelayError,
    Result, ServerConfig, ServerHandler, ServerSnapshot, SessionRegistry,
};
use chatline_codec::format_notice;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Running accept loop
struct ListenerTask {
    local_addr: SocketAddr,
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

/// Chat relay server
///
/// # Example
///
/// ```no_run
/// use chatline_service::{ChatServer, ConsoleDisplay, ServerConfig};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = ChatServer::new(ServerConfig::default(), Arc::new(ConsoleDisplay::new()))?;
///     server.listen().await?;
///
///     // Runs until a session teardown fails
///     if let Some(fatal) = server.fatal().await {
///         eprintln!("{fatal}");
///     }
///     Ok(())
/// }
/// ```
pub struct ChatServer {
    /// Server configuration
    config: ServerConfig,
    /// Listen port, updated by `set_port` and by binding port 0
    port: AtomicU16,
    /// Live sessions
    registry: Arc<SessionRegistry>,
    /// Line handler run by every connection worker
    handler: Arc<dyn ServerHandler>,
    /// Operator-facing output
    display: Arc<dyn DisplaySink>,
    /// Accept loop, present while listening
    listener: Mutex<Option<ListenerTask>>,
    /// Listening flag (lock-free reads)
    listening: AtomicBool,
    /// Fatal error escalation
    fatal_tx: mpsc::UnboundedSender<RelayError>,
    fatal_rx: Mutex<mpsc::UnboundedReceiver<RelayError>>,
    /// Server start time
    started_at: Instant,
}

impl ChatServer {
    /// Create a new server with the given configuration
    ///
    /// The server does not listen until [`listen`](Self::listen) is called.
    pub fn new(config: ServerConfig, display: Arc<dyn DisplaySink>) -> Result<Self> {
        config.validate().map_err(RelayError::InvalidArgument)?;

        let registry = Arc::new(SessionRegistry::new(config.write_timeout));
        let handler: Arc<dyn ServerHandler> = Arc::new(MessageRouter::new(registry.clone()));
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();

        Ok(Self {
            port: AtomicU16::new(config.port),
            config,
            registry,
            handler,
            display,
            listener: Mutex::new(None),
            listening: AtomicBool::new(false),
            fatal_tx,
            fatal_rx: Mutex::new(fatal_rx),
            started_at: Instant::now(),
        })
    }

    /// Start accepting connections
    ///
    /// Returns the bound address. Fails with
    /// [`AlreadyListening`](RelayError::AlreadyListening) if the listener is
    /// already running, or [`Connection`](RelayError::Connection) if the port
    /// cannot be bound.
    pub async fn listen(&self) -> Result<SocketAddr> {
        let mut slot = self.listener.lock().await;
        if slot.is_some() {
            return Err(RelayError::AlreadyListening);
        }

        let address = format!("{}:{}", self.config.bind_host, self.port());
        let listener = TcpListener::bind(&address)
            .await
            .map_err(RelayError::Connection)?;
        let local_addr = listener.local_addr().map_err(RelayError::Connection)?;
        self.port.store(local_addr.port(), Ordering::SeqCst);

        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(
            AcceptLoop {
                listener,
                registry: self.registry.clone(),
                handler: self.handler.clone(),
                fatal_tx: self.fatal_tx.clone(),
                shutdown: shutdown.clone(),
                max_connections: self.config.max_connections,
                max_line_length: self.config.max_line_length,
            }
            .run(),
        );
        *slot = Some(ListenerTask {
            local_addr,
            shutdown,
            handle,
        });
        self.listening.store(true, Ordering::SeqCst);

        info!(local_addr = %local_addr, "Chat server listening");
        self.display.display(&format!(
            "Server listening for connections on port {}",
            local_addr.port()
        ));
        Ok(local_addr)
    }

    /// Stop accepting connections
    ///
    /// Existing sessions stay connected. Fails with
    /// [`NotListening`](RelayError::NotListening) if there is no listener.
    pub async fn stop_listening(&self) -> Result<()> {
        let task = self
            .listener
            .lock()
            .await
            .take()
            .ok_or(RelayError::NotListening)?;
        self.listening.store(false, Ordering::SeqCst);

        task.shutdown.notify_one();
        let abort = task.handle.abort_handle();
        if tokio::time::timeout(self.config.shutdown_timeout, task.handle)
            .await
            .is_err()
        {
            warn!(local_addr = %task.local_addr, "Accept loop did not stop in time, aborting");
            abort.abort();
        }

        info!(local_addr = %task.local_addr, "Chat server stopped listening");
        self.display
            .display("Server has stopped listening for connections.");
        Ok(())
    }

    /// Stop listening and drop every session
    ///
    /// The server itself keeps running and may listen again. Returns how
    /// many sessions were closed.
    pub async fn close(&self) -> Result<usize> {
        match self.stop_listening().await {
            Ok(()) | Err(RelayError::NotListening) => {}
            Err(e) => return Err(e),
        }
        self.registry.close_all().await
    }

    /// Check whether the server is accepting connections
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Get the listen port
    pub fn port(&self) -> u16 {
        self.port.load(Ordering::SeqCst)
    }

    /// Change the listen port
    ///
    /// Rejected with [`AlreadyListening`](RelayError::AlreadyListening) while
    /// the listener is running.
    pub async fn set_port(&self, port: u16) -> Result<()> {
        let slot = self.listener.lock().await;
        if slot.is_some() {
            return Err(RelayError::AlreadyListening);
        }
        self.port.store(port, Ordering::SeqCst);
        debug!(port, "Listen port changed");
        Ok(())
    }

    /// Get the bound address while listening
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.lock().await.as_ref().map(|t| t.local_addr)
    }

    /// Get the session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Broadcast operator text to every session as a server notice
    ///
    /// Text longer than the configured line length is refused so the notice
    /// stays within what clients accept.
    pub async fn broadcast_notice(&self, text: &str) -> Result<BroadcastResult> {
        let max = self.config.max_line_length;
        if text.len() > max {
            return Err(RelayError::LineTooLong {
                length: text.len(),
                max,
            });
        }
        Ok(self.registry.broadcast(&format_notice(text)).await)
    }

    /// Wait for an error that must terminate the process
    ///
    /// Resolves when a session teardown fails. The caller decides how to
    /// exit.
    pub async fn fatal(&self) -> Option<RelayError> {
        self.fatal_rx.lock().await.recv().await
    }

    /// Get a snapshot of the server state
    pub async fn snapshot(&self) -> ServerSnapshot {
        let sessions = self.registry.sessions().await;
        ServerSnapshot {
            active_sessions: sessions.len(),
            authenticated_sessions: sessions.iter().filter(|s| s.is_authenticated()).count(),
            listening: self.is_listening(),
            port: self.port(),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl std::fmt::Debug for ChatServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatServer")
            .field("port", &self.port())
            .field("listening", &self.is_listening())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

impl Drop for ChatServer {
    fn drop(&mut self) {
        if let Some(task) = self.listener.get_mut().take() {
            warn!(local_addr = %task.local_addr, "ChatServer dropped while still listening");
            task.handle.abort();
        }
    }
}

/// State moved into the accept loop task
struct AcceptLoop {
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
    handler: Arc<dyn ServerHandler>,
    fatal_tx: mpsc::UnboundedSender<RelayError>,
    shutdown: Arc<Notify>,
    max_connections: usize,
    max_line_length: usize,
}

impl AcceptLoop {
    async fn run(self) {
        loop {
            let accept_result = tokio::select! {
                result = self.listener.accept() => result,
                _ = self.shutdown.notified() => break,
            };

            match accept_result {
                Ok((socket, peer_addr)) => {
                    debug!(peer_addr = %peer_addr, "Accepted connection");

                    // Check connection limit
                    if self.registry.len().await >= self.max_connections {
                        warn!(
                            peer_addr = %peer_addr,
                            max_connections = self.max_connections,
                            "Connection limit reached, rejecting connection"
                        );
                        drop(socket);
                        continue;
                    }

                    let id = self.registry.next_connection_id();
                    match ChatConnection::wrap(socket, id, self.max_line_length) {
                        Ok((connection, reader)) => {
                            let worker = ConnectionWorker::new(
                                connection,
                                reader,
                                self.handler.clone(),
                                self.fatal_tx.clone(),
                            );
                            tokio::spawn(worker.run());
                        }
                        Err(e) => {
                            error!(peer_addr = %peer_addr, error = %e, "Failed to wrap connection");
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    // Back off on errors to avoid tight loop
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
        info!("Accept loop terminated");
    }
}
