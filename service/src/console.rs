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

//! Server operator console
//!
//! Interprets lines typed by the operator: `#`-prefixed lines are
//! administrative commands, anything else is shown locally and broadcast to
//! every session as a server notice.

use crate::{ChatServer, DisplaySink, Flow, RelayError};
use chatline_codec::{Input, ServerCommand, parse_input};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// Shown for a marker-prefixed line that matches no command
pub const UNKNOWN_COMMAND: &str = "This command does not exist.";

/// Reported when console input ends or fails
pub const CONSOLE_READ_FAILED: &str = "Unexpected error while reading from console!";

/// Operator console bound to a server
pub struct ServerConsole {
    server: Arc<ChatServer>,
    display: Arc<dyn DisplaySink>,
}

impl ServerConsole {
    /// Create a console for a server
    pub fn new(server: Arc<ChatServer>, display: Arc<dyn DisplaySink>) -> Self {
        Self { server, display }
    }

    /// Get the server
    pub fn server(&self) -> &Arc<ChatServer> {
        &self.server
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

    /// Execute one operator line
    pub async fn execute(&self, line: &str) -> Flow {
        match parse_input::<ServerCommand>(line) {
            Ok(Input::Command(command)) => self.command(command).await,
            Ok(Input::Payload(text)) => {
                match self.server.broadcast_notice(&text).await {
                    Ok(result) => {
                        self.display.display(&text);
                        if result.any_failed() {
                            debug!(failed = result.failed, "Notice not delivered everywhere");
                        }
                    }
                    Err(e) => self.display.display(&e.to_string()),
                }
                Flow::Continue
            }
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

    async fn command(&self, command: ServerCommand) -> Flow {
        debug!(?command, "Operator command");
        match command {
            ServerCommand::Quit => {
                if let Err(e) = self.server.close().await {
                    warn!(error = %e, "Failed to close sessions on quit");
                }
                self.display.display("Server is quitting.");
                Flow::Quit
            }
            ServerCommand::Stop => {
                if let Err(RelayError::NotListening) = self.server.stop_listening().await {
                    self.display.display(
                        "The #stop command cannot be run when the server is not listening to connections.",
                    );
                }
                Flow::Continue
            }
            ServerCommand::Close => match self.server.close().await {
                Ok(_) => Flow::Continue,
                Err(e) => {
                    warn!(error = %e, "Failed to close sessions");
                    Flow::Terminate(
                        "Could not close the connections successfully.  Terminating server."
                            .to_string(),
                    )
                }
            },
            ServerCommand::SetPort(port) => {
                if let Err(RelayError::AlreadyListening) = self.server.set_port(port).await {
                    self.display.display(
                        "The #setport command cannot be run when the server is listening to connections.",
                    );
                }
                Flow::Continue
            }
            ServerCommand::Start => match self.server.listen().await {
                Ok(_) => Flow::Continue,
                Err(RelayError::AlreadyListening) => {
                    self.display.display(
                        "The #start command cannot be run when the server is already listening to connections.",
                    );
                    Flow::Continue
                }
                Err(e) => {
                    warn!(error = %e, "Failed to start listening");
                    Flow::Terminate(
                        "Could not start to listen to connections successfully.  Terminating server."
                            .to_string(),
                    )
                }
            },
            ServerCommand::GetPort => {
                self.display
                    .display(&format!("Current port number: {}", self.server.port()));
                Flow::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RecordingDisplay, ServerConfig};

    fn console() -> (ServerConsole, Arc<RecordingDisplay>) {
        let display = Arc::new(RecordingDisplay::new());
        let config = ServerConfig::new(0).with_bind_host("127.0.0.1");
        let server = Arc::new(ChatServer::new(config, display.clone()).unwrap());
        (ServerConsole::new(server, display.clone()), display)
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let (console, display) = console();
        for line in ["#bogus", "#quit now", "#setport", "#setport 1 2"] {
            assert_eq!(console.execute(line).await, Flow::Continue);
            assert_eq!(display.last().as_deref(), Some(UNKNOWN_COMMAND), "{line}");
        }
    }

    #[tokio::test]
    async fn test_getport_and_setport() {
        let (console, display) = console();
        console.execute("#setport 6010").await;
        console.execute("#getport").await;
        assert_eq!(display.last().as_deref(), Some("Current port number: 6010"));

        console.execute("#setport abc").await;
        assert_eq!(
            display.last().as_deref(),
            Some("Error: abc is not a valid port number")
        );
        assert_eq!(console.server().port(), 6010);
    }

    #[tokio::test]
    async fn test_start_stop_rejections() {
        let (console, display) = console();

        assert_eq!(console.execute("#start").await, Flow::Continue);
        assert!(console.server().is_listening());
        console.execute("#start").await;
        assert_eq!(
            display.last().as_deref(),
            Some("The #start command cannot be run when the server is already listening to connections.")
        );
        console.execute("#setport 7000").await;
        assert_eq!(
            display.last().as_deref(),
            Some("The #setport command cannot be run when the server is listening to connections.")
        );

        console.execute("#stop").await;
        assert!(!console.server().is_listening());
        console.execute("#stop").await;
        assert_eq!(
            display.last().as_deref(),
            Some("The #stop command cannot be run when the server is not listening to connections.")
        );
    }

    #[tokio::test]
    async fn test_close_keeps_running_and_quit_exits() {
        let (console, display) = console();
        console.execute("#start").await;

        assert_eq!(console.execute("#close").await, Flow::Continue);
        assert!(!console.server().is_listening());

        assert_eq!(console.execute("#quit").await, Flow::Quit);
        assert_eq!(display.last().as_deref(), Some("Server is quitting."));
    }

    #[tokio::test]
    async fn test_payload_is_displayed() {
        let (console, display) = console();
        assert_eq!(console.execute("maintenance").await, Flow::Continue);
        assert_eq!(display.last().as_deref(), Some("maintenance"));
    }

    #[tokio::test]
    async fn test_oversized_payload_is_refused() {
        let (console, display) = console();
        let max = console.server().config().max_line_length;
        let text = "n".repeat(max + 1);

        assert_eq!(console.execute(&text).await, Flow::Continue);
        let err = RelayError::LineTooLong {
            length: max + 1,
            max,
        };
        assert_eq!(display.last(), Some(err.to_string()));
    }

    #[tokio::test]
    async fn test_run_until_quit_or_eof() {
        let (quitting, _display) = console();
        let flow = quitting.run(&b"#getport\n#quit\n#getport\n"[..]).await;
        assert_eq!(flow, Flow::Quit);

        let (exhausted, _display) = console();
        let flow = exhausted.run(&b"hello\n"[..]).await;
        assert_eq!(flow, Flow::Terminate(CONSOLE_READ_FAILED.to_string()));
    }
}
