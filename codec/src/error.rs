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

//! Error types for the wire grammar and line codec

use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised while framing lines on a byte stream
#[derive(Debug, Error)]
pub enum CodecError {
    /// I/O error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An inbound line exceeded the configured maximum length
    #[error("Line exceeds maximum length of {0} bytes")]
    LineTooLong(usize),
}

/// Violations of the login handshake grammar
///
/// Any of these received on an unauthenticated session is fatal for that
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// The line does not start with the login keyword
    #[error("Expected a login line, received: {0:?}")]
    NotLogin(String),

    /// The login keyword was sent without an identity
    #[error("Login line is missing the identity")]
    MissingIdentity,

    /// The login keyword was followed by more than one argument
    #[error("Login line has {0} arguments, expected exactly one")]
    TooManyArguments(usize),

    /// The identity token is not acceptable
    #[error("Invalid identity: {0}")]
    InvalidIdentity(#[from] IdentityError),
}

/// Reasons an identity token is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Empty token
    #[error("identity is empty")]
    Empty,

    /// Token longer than [`crate::MAX_IDENTITY_LEN`] characters
    #[error("identity is longer than {0} characters")]
    TooLong(usize),

    /// Token contains whitespace or a control character
    #[error("identity contains forbidden character {0:?}")]
    ForbiddenCharacter(char),
}

/// Errors from parsing a locally entered console command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A command argument failed validation
    #[error("Error: {0} is not a valid port number")]
    InvalidPort(String),
}
