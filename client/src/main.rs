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

use chatline_client::{ChatClient, ClientConfig, ClientConsole, DEFAULT_HOST};
use chatline_codec::Identity;
use chatline_service::{ConsoleDisplay, DEFAULT_PORT, DisplaySink, Flow};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SUCCESS: i32 = 0;
const FAILURE: i32 = 1;

/// Line-oriented chat client
#[derive(Debug, Parser)]
#[command(name = "chatline-client", version, about)]
struct Cli {
    /// Identity to log in with
    login_id: String,

    /// Server host
    #[arg(default_value = DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() {
    let code = run().await;
    // Stdin is read on a blocking thread that would otherwise hold the
    // runtime open until the next line is typed
    std::process::exit(code);
}

async fn run() -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let display = Arc::new(ConsoleDisplay::new());

    let identity = match Identity::new(cli.login_id) {
        Ok(identity) => identity,
        Err(e) => {
            display.display(&format!("ERROR - Invalid login ID: {e}"));
            return FAILURE;
        }
    };
    let config = ClientConfig::new(identity)
        .with_host(cli.host)
        .with_port(cli.port);
    if let Err(e) = config.validate() {
        display.display(&format!("ERROR - {e}"));
        return FAILURE;
    }

    let client = ChatClient::new(config, display.clone());
    if let Err(e) = client.connect().await {
        tracing::error!(error = %e, "Initial connection failed");
        display.display("ERROR - Can't setup connection! Terminating client.");
        return FAILURE;
    }

    let console = ClientConsole::new(client.clone(), display.clone());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let flow = tokio::select! {
        flow = console.run(stdin) => flow,
        Some(reason) = client.terminated() => Flow::Terminate(reason),
    };

    match flow {
        Flow::Terminate(reason) => {
            display.display(&reason);
            client.disconnect().await;
            FAILURE
        }
        Flow::Quit | Flow::Continue => SUCCESS,
    }
}
