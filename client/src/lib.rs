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

//! # Chatline Client
//!
//! The client side of Chatline: a [`ChatClient`] session state machine that
//! logs in as soon as it connects, and a [`ClientConsole`] that turns typed
//! lines into local commands or chat.
//!
//! ```no_run
//! use chatline_client::{ChatClient, ClientConfig, ClientConsole};
//! use chatline_codec::Identity;
//! use chatline_service::{ConsoleDisplay, Flow};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let display = Arc::new(ConsoleDisplay::new());
//!     let config = ClientConfig::new(Identity::new("alice")?);
//!     let client = ChatClient::new(config, display.clone());
//!     client.connect().await?;
//!
//!     let console = ClientConsole::new(client, display);
//!     let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//!     if let Flow::Terminate(reason) = console.run(stdin).await {
//!         eprintln!("{reason}");
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod console;
mod error;

pub use client::{ChatClient, SERVER_SHUT_DOWN, SessionState};
pub use config::{ClientConfig, DEFAULT_HOST};
pub use console::{CONNECT_FAILED, CONNECTION_CLOSED, ClientConsole, SEND_FAILED};
pub use error::{ClientError, Result};
