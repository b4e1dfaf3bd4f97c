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

use chatline_server::{Cli, run};
use chatline_codec::NOTICE_PREFIX;
use chatline_service::{ConsoleDisplay, Flow};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let flow = run(
        cli.config(),
        tokio::io::BufReader::new(tokio::io::stdin()),
        Arc::new(ConsoleDisplay::new()),
        Arc::new(ConsoleDisplay::with_prefix(NOTICE_PREFIX)),
    )
    .await;

    // Stdin is read on a blocking thread that would otherwise hold the
    // runtime open until the next line is typed
    std::process::exit(match flow {
        Flow::Terminate(_) => 1,
        Flow::Quit | Flow::Continue => 0,
    });
}
