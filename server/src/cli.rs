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

//! Command line arguments

use chatline_service::{DEFAULT_PORT, ServerConfig};
use clap::Parser;

/// Line-oriented chat server
#[derive(Debug, Clone, Parser)]
#[command(name = "chatline-server", version, about)]
pub struct Cli {
    /// Port to listen on; anything that is not a port number means 5555
    pub port: Option<String>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Maximum number of concurrent sessions
    #[arg(long, default_value_t = 1000)]
    pub max_connections: usize,
}

impl Cli {
    /// Get the listen port, falling back to the default
    pub fn port(&self) -> u16 {
        self.port
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT)
    }

    /// Build the server configuration
    pub fn config(&self) -> ServerConfig {
        ServerConfig::new(self.port())
            .with_bind_host(self.host.clone())
            .with_max_connections(self.max_connections)
    }
}
