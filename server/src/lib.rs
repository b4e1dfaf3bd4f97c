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

//! # Chatline Server
//!
//! Operator process for the chat relay: starts listening, runs the operator
//! console and decides how the process ends.

mod cli;

pub use cli::Cli;

use chatline_service::{ChatServer, DisplaySink, Flow, ServerConfig, ServerConsole};
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tracing::error;

/// Reported when a session teardown fails
pub const TEARDOWN_FAILED: &str = "Could not close the client successfully.  Terminating server.";

/// Run the server until the operator quits or a fatal error occurs
///
/// `display` receives server status lines, `console_display` everything the
/// operator console shows including the final notice. Returns
/// [`Flow::Quit`] or [`Flow::Terminate`].
pub async fn run<R>(
    config: ServerConfig,
    input: R,
    display: Arc<dyn DisplaySink>,
    console_display: Arc<dyn DisplaySink>,
) -> Flow
where
    R: AsyncBufRead + Unpin,
{
    let server = match ChatServer::new(config, display.clone()) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            let reason = format!("ERROR - {e}");
            console_display.display(&reason);
            return Flow::Terminate(reason);
        }
    };

    // The console stays usable and may #start later
    if let Err(e) = server.listen().await {
        error!(error = %e, "Could not listen for clients");
        display.display("ERROR - Could not listen for clients!");
    }

    let console = ServerConsole::new(server.clone(), console_display.clone());
    let flow = tokio::select! {
        flow = console.run(input) => flow,
        Some(fatal) = server.fatal() => {
            error!(error = %fatal, "Fatal session error");
            Flow::Terminate(TEARDOWN_FAILED.to_string())
        }
    };

    if let Flow::Terminate(reason) = &flow {
        console_display.display(reason);
        if let Err(e) = server.close().await {
            error!(error = %e, "Failed to close sessions");
        }
    }
    flow
}
