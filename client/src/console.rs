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

//! Client console
//!
//! Interprets lines typed by the user: `#`-prefixed lines are local
//! commands, anything else is sent to the server.

use crate::{ChatClient, ClientError};
use chatline_codec::{ClientCommand, Input, parse_input};
use chatline_service::{CONSOLE_READ_FAILED, DisplaySink, Flow, UNKNOWN_COMMAND};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// Shown after a local log off
pub const CONNECTION_CLOSED: &str = "Connection closed.";

/// Reported when a line cannot be sent
pub const SEND_FAILED: &str = "Could not send message to server.  Terminating client.";

/// Reported when `#login` cannot reach the server
pub const CONNECT_FAILED: &str = "Could not connect to the server.  Terminating client.";

/// User console bound to a client
pub struct ClientConsole {
    client: ChatClient,
    display: Arc<dyn DisplaySink>,
}

impl ClientConsole {
    /// Create a console for a client
    pub fn new(client: ChatClient, display: Arc<dyn DisplaySink>) -> Self {
        Self { client, display }
    }

    /// Get the client
    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    /// Read and execute lines until one asks the process to exit
    ///
    /// End of input is unexpected and terminates.
    pub async fn run<R>(&self, input: R) -> Flow
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let flow = self.execute(&line).await;
                    if flow.is_exit() {
                        return flow;
                    }
                }
                Ok(None) => return Flow::Terminate(CONSOLE_READ_FAILED.to_string()),
                Err(e) => {
                    warn!(error = %e, "Console read failed");
                    return Flow::Terminate(CONSOLE_READ_FAILED.to_string());
                }
            }
        }
    }

    /// Execute one user line
    pub async fn execute(&self, line: &str) -> Flow {
        match parse_input::<ClientCommand>(line) {
            Ok(Input::Command(command)) => self.command(command).await,
            Ok(Input::Payload(text)) => match self.client.send_line(&text).await {
                Ok(()) => Flow::Continue,
                Err(e) if e.is_rejection() => {
                    self.display.display(&e.to_string());
                    Flow::Continue
                }
                Err(e) => {
                    warn!(error = %e, "Send failed");
                    self.client.disconnect().await;
                    Flow::Terminate(SEND_FAILED.to_string())
                }
            },
            Ok(Input::Unknown(_)) => {
                self.display.display(UNKNOWN_COMMAND);
                Flow::Continue
            }
            Err(e) => {
                self.display.display(&e.to_string());
                Flow::Continue
            }
        }
    }

    async fn command(&self, command: ClientCommand) -> Flow {
        debug!(?command, "Client command");
        match command {
            ClientCommand::Quit => {
                self.client.disconnect().await;
                Flow::Quit
            }
            ClientCommand::Logoff => {
                if self.client.disconnect().await {
                    self.display.display(CONNECTION_CLOSED);
                }
                Flow::Continue
            }
            ClientCommand::SetHost(host) => {
                if let Err(ClientError::AlreadyConnected) = self.client.set_host(host).await {
                    self.reject("sethost");
                }
                Flow::Continue
            }
            ClientCommand::SetPort(port) => {
                match self.client.set_port(port).await {
                    Err(ClientError::AlreadyConnected) => self.reject("setport"),
                    Err(e) => self.display.display(&e.to_string()),
                    Ok(()) => {}
                }
                Flow::Continue
            }
            ClientCommand::Login => match self.client.connect().await {
                Ok(()) => Flow::Continue,
                Err(ClientError::AlreadyConnected) => {
                    self.reject("login");
                    Flow::Continue
                }
                Err(e) if e.is_connection_error() => {
                    warn!(error = %e, "Connect failed");
                    Flow::Terminate(CONNECT_FAILED.to_string())
                }
                Err(e) => {
                    warn!(error = %e, "Login failed");
                    Flow::Terminate(SEND_FAILED.to_string())
                }
            },
            ClientCommand::GetHost => {
                let host = self.client.host().await;
                self.display.display(&format!("Current host name: {host}"));
                Flow::Continue
            }
            ClientCommand::GetPort => {
                let port = self.client.port().await;
                self.display.display(&format!("Current port number: {port}"));
                Flow::Continue
            }
        }
    }

    fn reject(&self, command: &str) {
        self.display.display(&format!(
            "The #{command} command cannot be run when the client is connected to the server."
        ));
    }
}
