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

//! Connection worker implementation
//!
//! The ConnectionWorker owns the read side of a single connection and drives
//! its lifecycle:
//! - Line processing loop
//! - Local close requests
//! - Escalation of fatal errors
//! - Resource cleanup

use crate::{ChatConnection, LineReader, RelayError, Result, ServerHandler, SessionFlow};
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Connection worker that manages a single connection's lifecycle
pub struct ConnectionWorker {
    /// The connection being managed
    connection: ChatConnection,
    /// Read side of the connection
    reader: LineReader,
    /// Line handler
    handler: Arc<dyn ServerHandler>,
    /// Where fatal errors are escalated
    fatal_tx: mpsc::UnboundedSender<RelayError>,
}

impl ConnectionWorker {
    /// Create a new connection worker
    pub fn new(
        connection: ChatConnection,
        reader: LineReader,
        handler: Arc<dyn ServerHandler>,
        fatal_tx: mpsc::UnboundedSender<RelayError>,
    ) -> Self {
        Self {
            connection,
            reader,
            handler,
            fatal_tx,
        }
    }

    /// Run the worker event loop
    ///
    /// Runs until the peer disconnects, the connection is closed locally, the
    /// handler ends the session or an error occurs.
    pub async fn run(mut self) {
        self.handler.on_connect(&self.connection).await;

        if let Err(e) = self.event_loop().await {
            if e.is_fatal() {
                error!(connection_id = %self.connection.id(), error = %e, "Fatal session error");
                // Receiver gone means the server is already shutting down
                let _ = self.fatal_tx.send(e);
            } else {
                self.handler.on_error(&self.connection, &e).await;
            }
        }

        self.cleanup().await;
    }

    /// Main line processing loop
    async fn event_loop(&mut self) -> Result<()> {
        loop {
            select! {
                _ = self.connection.closed() => {
                    debug!(connection_id = %self.connection.id(), "Connection closed locally");
                    return Ok(());
                }
                line = self.reader.next_line() => {
                    match line? {
                        Some(line) => {
                            let flow = self.handler.on_line(&self.connection, line).await?;
                            if flow == SessionFlow::Close {
                                return Ok(());
                            }
                        }
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    /// Cleanup resources
    async fn cleanup(&self) {
        if let Err(e) = self.connection.close().await {
            debug!(connection_id = %self.connection.id(), error = %e, "Error closing connection");
        }
        self.handler.on_disconnect(&self.connection).await;
    }
}
