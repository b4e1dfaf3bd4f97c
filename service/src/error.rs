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

//! Error types for the chat relay service

use crate::types::ConnectionId;
use chatline_codec::{CodecError, Identity, ProtocolViolation};
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Chat relay error types
#[derive(Debug, Error)]
pub enum RelayError {
    /// The listener could not be bound or a connection could not be accepted
    #[error("Connection error: {0}")]
    Connection(#[source] std::io::Error),

    /// A session broke the login grammar
    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// A session sent a second login line
    #[error("Connection {0} is already logged in as {1}")]
    AlreadyLoggedIn(ConnectionId, Identity),

    /// Send, receive or close failed on an established connection
    #[error("Transport failure: {0}")]
    Transport(#[from] CodecError),

    /// A command argument failed validation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A line is longer than peers are configured to accept
    #[error("Line of {length} bytes exceeds the {max} byte limit")]
    LineTooLong {
        /// Length of the rejected line in bytes
        length: usize,
        /// Configured limit in bytes
        max: usize,
    },

    /// Connection with the given ID was not found
    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// The server is already accepting connections
    #[error("Server is already listening")]
    AlreadyListening,

    /// The server is not accepting connections
    #[error("Server is not listening")]
    NotListening,

    /// Closing a connection during session teardown failed
    #[error("Could not close connection {id}: {source}")]
    TeardownFailed {
        /// Connection being torn down
        id: ConnectionId,
        /// Underlying close failure
        #[source]
        source: Box<RelayError>,
    },
}

impl RelayError {
    /// Check if the error must terminate the whole server process
    ///
    /// A failure while tearing down a misbehaving session is escalated
    /// instead of being contained at the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RelayError::TeardownFailed { .. })
    }

    /// Check if the error is a protocol error attributable to a session
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            RelayError::Protocol(_) | RelayError::AlreadyLoggedIn(..)
        )
    }

    /// Check if the error is a rejected local request that changed nothing
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RelayError::InvalidArgument(_)
                | RelayError::LineTooLong { .. }
                | RelayError::AlreadyListening
                | RelayError::NotListening
        )
    }

    /// Check if the error is recoverable
    ///
    /// Recoverable errors end at most the affected connection.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RelayError::Timeout | RelayError::ConnectionClosed | RelayError::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_fatal() {
        let err = RelayError::TeardownFailed {
            id: ConnectionId::new(3),
            source: Box::new(RelayError::ConnectionClosed),
        };
        assert!(err.is_fatal());
        assert!(!RelayError::ConnectionClosed.is_fatal());
        assert!(!RelayError::Protocol(ProtocolViolation::MissingIdentity).is_fatal());
    }

    #[test]
    fn test_error_classification() {
        assert!(RelayError::Protocol(ProtocolViolation::MissingIdentity).is_protocol_error());
        assert!(RelayError::AlreadyListening.is_rejection());
        assert!(RelayError::NotListening.is_rejection());
        assert!(RelayError::InvalidArgument("port".into()).is_rejection());
        assert!(RelayError::LineTooLong { length: 10, max: 5 }.is_rejection());
        assert!(RelayError::Timeout.is_recoverable());
        assert!(!RelayError::AlreadyListening.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = RelayError::TeardownFailed {
            id: ConnectionId::new(42),
            source: Box::new(RelayError::Timeout),
        };
        assert_eq!(
            err.to_string(),
            "Could not close connection conn-42: Operation timed out"
        );

        let err = RelayError::AlreadyLoggedIn(
            ConnectionId::new(7),
            Identity::new("alice").unwrap(),
        );
        assert_eq!(err.to_string(), "Connection conn-7 is already logged in as alice");
    }
}
