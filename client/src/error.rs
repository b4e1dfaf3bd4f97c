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

//! Client error types

use chatline_codec::CodecError;
use thiserror::Error;

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection could not be opened
    #[error("Connection error: {0}")]
    Connection(#[source] std::io::Error),

    /// Connecting took longer than the configured timeout
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// Sending or receiving on an open connection failed
    #[error("Transport error: {0}")]
    Transport(#[from] CodecError),

    /// A local request carried a bad argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A line is longer than the server accepts
    #[error("Message of {length} bytes exceeds the {max} byte limit")]
    LineTooLong {
        /// Length of the rejected line in bytes
        length: usize,
        /// Configured limit in bytes
        max: usize,
    },

    /// The operation requires the client to be disconnected
    #[error("Already connected")]
    AlreadyConnected,

    /// The operation requires an open connection
    #[error("Not connected")]
    NotConnected,
}

impl ClientError {
    /// Check if the error is a failure to open the connection
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_) | ClientError::ConnectionTimeout
        )
    }

    /// Check if the error is a rejected local request that changed nothing
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidArgument(_)
                | ClientError::LineTooLong { .. }
                | ClientError::AlreadyConnected
        )
    }
}
