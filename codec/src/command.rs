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

//! Console command grammar
//!
//! Lines typed at either console are classified into an administrative
//! command (leading [`MARKER`]) or ordinary payload. Each side has its own
//! command set; both share the same tokenization.

use crate::{CommandError, MARKER};

/// A classified console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input<C> {
    /// Recognized administrative command
    Command(C),
    /// Ordinary text to ship over the transport
    Payload(String),
    /// Marker-prefixed line that matches no known command
    Unknown(String),
}

/// A command set that can be parsed from console fields
pub trait ConsoleCommand: Sized {
    /// Build a command from its keyword (marker stripped) and arguments
    ///
    /// Returns `Ok(None)` when the keyword or argument count matches nothing.
    fn from_fields(keyword: &str, args: &[&str]) -> Result<Option<Self>, CommandError>;
}

/// Client console commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Close the connection and exit
    Quit,
    /// Close the connection, keep running
    Logoff,
    /// Change the target host
    SetHost(String),
    /// Change the target port
    SetPort(u16),
    /// Open the connection and log in
    Login,
    /// Show the target host
    GetHost,
    /// Show the target port
    GetPort,
}

impl ConsoleCommand for ClientCommand {
    fn from_fields(keyword: &str, args: &[&str]) -> Result<Option<Self>, CommandError> {
        let command = match (keyword, args) {
            ("quit", []) => Self::Quit,
            ("logoff", []) => Self::Logoff,
            ("sethost", [host]) if !host.is_empty() => Self::SetHost(host.to_string()),
            ("setport", [port]) if !port.is_empty() => Self::SetPort(parse_port(port)?),
            ("login", []) => Self::Login,
            ("gethost", []) => Self::GetHost,
            ("getport", []) => Self::GetPort,
            _ => return Ok(None),
        };
        Ok(Some(command))
    }
}

/// Server operator console commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    /// Close everything and exit
    Quit,
    /// Stop accepting new connections
    Stop,
    /// Stop listening and drop every session
    Close,
    /// Change the listen port
    SetPort(u16),
    /// Start listening
    Start,
    /// Show the listen port
    GetPort,
}

impl ConsoleCommand for ServerCommand {
    fn from_fields(keyword: &str, args: &[&str]) -> Result<Option<Self>, CommandError> {
        let command = match (keyword, args) {
            ("quit", []) => Self::Quit,
            ("stop", []) => Self::Stop,
            ("close", []) => Self::Close,
            ("setport", [port]) if !port.is_empty() => Self::SetPort(parse_port(port)?),
            ("start", []) => Self::Start,
            ("getport", []) => Self::GetPort,
            _ => return Ok(None),
        };
        Ok(Some(command))
    }
}

/// Classify a console line
pub fn parse_input<C: ConsoleCommand>(line: &str) -> Result<Input<C>, CommandError> {
    let Some(rest) = line.strip_prefix(MARKER) else {
        return Ok(Input::Payload(line.to_string()));
    };
    let mut fields = rest.split(' ');
    let keyword = fields.next().unwrap_or_default();
    let args: Vec<&str> = fields.collect();
    Ok(match C::from_fields(keyword, &args)? {
        Some(command) => Input::Command(command),
        None => Input::Unknown(line.to_string()),
    })
}

/// Parse a port argument (`1..=65535`)
pub fn parse_port(value: &str) -> Result<u16, CommandError> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(CommandError::InvalidPort(value.to_string())),
    }
}
