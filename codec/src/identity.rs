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

//! Login identity token

use crate::IdentityError;
use std::fmt;
use std::str::FromStr;

/// Maximum identity length in characters
pub const MAX_IDENTITY_LEN: usize = 64;

/// Opaque, client-chosen token that tags a session's chat lines
///
/// Identities are compared byte-for-byte. A valid identity is non-empty, at
/// most [`MAX_IDENTITY_LEN`] characters long and contains neither whitespace
/// nor control characters, so it always survives the space-separated login
/// grammar unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Validate and wrap a token
    pub fn new(token: impl Into<String>) -> Result<Self, IdentityError> {
        let token = token.into();
        if token.is_empty() {
            return Err(IdentityError::Empty);
        }
        if token.chars().count() > MAX_IDENTITY_LEN {
            return Err(IdentityError::TooLong(MAX_IDENTITY_LEN));
        }
        if let Some(ch) = token
            .chars()
            .find(|ch| ch.is_whitespace() || ch.is_control())
        {
            return Err(IdentityError::ForbiddenCharacter(ch));
        }
        Ok(Self(token))
    }

    /// Borrow the token text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the token text
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
