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

//! Core types for the chat relay service

use chatline_codec::Identity;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Unique identifier for a connection (monotonically increasing, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a new connection ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What a connection worker does after a line has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFlow {
    /// Keep reading from the connection
    Continue,
    /// The session has been torn down, stop reading
    Close,
}

/// What a console loop does after a line has been interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading console input
    Continue,
    /// Orderly exit requested by the operator
    Quit,
    /// Terminal failure; the final notice has already been displayed
    Terminate(String),
}

impl Flow {
    /// Check if the process should exit
    pub fn is_exit(&self) -> bool {
        !matches!(self, Flow::Continue)
    }
}

/// Session snapshot (for non-blocking queries)
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Peer address
    pub peer_addr: SocketAddr,
    /// Identity, once logged in
    pub identity: Option<Identity>,
    /// When the session was registered
    pub connected_at: Instant,
    /// Lines sent to this session
    pub messages_sent: u64,
    /// Lines received from this session
    pub messages_received: u64,
}

impl SessionInfo {
    /// Check if the session has logged in
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Get the session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Server snapshot for non-blocking debug information
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Number of registered sessions
    pub active_sessions: usize,
    /// Number of sessions that have logged in
    pub authenticated_sessions: usize,
    /// Whether new connections are being accepted
    pub listening: bool,
    /// Configured listen port
    pub port: u16,
    /// Server uptime
    pub uptime: Duration,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChatServer {{ sessions: {}, authenticated: {}, listening: {}, port: {}, uptime: {:?} }}",
            self.active_sessions, self.authenticated_sessions, self.listening, self.port, self.uptime
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id() {
        let id1 = ConnectionId::new(1);
        let id2 = ConnectionId::new(2);

        assert_eq!(id1.as_u64(), 1);
        assert_ne!(id1, id2);
        assert!(id1 < id2);
        assert_eq!(id2.to_string(), "conn-2");
    }

    #[test]
    fn test_flow_exit() {
        assert!(!Flow::Continue.is_exit());
        assert!(Flow::Quit.is_exit());
        assert!(Flow::Terminate("gone".into()).is_exit());
    }
}
