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

//! Chat relay service
//!
//! The server side of Chatline: every accepted connection gets a worker that
//! feeds its lines to the [`MessageRouter`], which performs the login
//! handshake and broadcasts chat through the [`SessionRegistry`]. The
//! [`ServerConsole`] interprets operator commands against a [`ChatServer`].
//!
//! # Architecture
//!
//! ```text
//! ChatServer ── ServerConsole
//!     ↓
//! accept loop
//!     ↓
//! ConnectionWorker → ChatConnection
//!     ↓
//! MessageRouter → SessionRegistry
//! ```
//!
//! # Example
//!
//! ```no_run
//! use chatline_service::{ChatServer, ConsoleDisplay, Flow, ServerConfig, ServerConsole};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Arc::new(ChatServer::new(
//!         ServerConfig::default(),
//!         Arc::new(ConsoleDisplay::new()),
//!     )?);
//!     server.listen().await?;
//!
//!     let console = ServerConsole::new(server, Arc::new(ConsoleDisplay::with_prefix("SERVER MESSAGE>")));
//!     let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//!     if let Flow::Terminate(reason) = console.run(stdin).await {
//!         eprintln!("{reason}");
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod console;
mod display;
mod error;
mod handler;
mod registry;
mod router;
mod server;
mod types;
mod worker;

pub use config::{DEFAULT_PORT, ServerConfig};
pub use connection::{ChatConnection, LineReader};
pub use console::{CONSOLE_READ_FAILED, ServerConsole, UNKNOWN_COMMAND};
pub use display::{ConsoleDisplay, DisplaySink, RecordingDisplay};
pub use error::{RelayError, Result};
pub use handler::ServerHandler;
pub use registry::{BroadcastResult, Session, SessionRegistry};
pub use router::MessageRouter;
pub use server::ChatServer;
pub use types::{ConnectionId, Flow, ServerSnapshot, SessionFlow, SessionInfo};
pub use worker::ConnectionWorker;
