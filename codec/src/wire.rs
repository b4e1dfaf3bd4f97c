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

//! Wire grammar shared by client and server
//!
//! Every message is a single line of text:
//!
//! ```text
//! #login <identity>                               client -> server, first line
//! <identity> - <payload>                          server -> all, chat
//! SERVER MESSAGE> <text>                          server -> all, notice
//! Error: Already logged in.  Terminating Client.  server -> one, before close
//! ```

use crate::{Identity, MAX_IDENTITY_LEN, ProtocolViolation};

/// Reserved leading character of administrative commands
pub const MARKER: char = '#';

/// Login keyword (without the marker)
pub const LOGIN_KEYWORD: &str = "login";

/// Login keyword as it appears on the wire
pub const LOGIN_COMMAND: &str = "#login";

/// Prefix of server-originated notices
pub const NOTICE_PREFIX: &str = "SERVER MESSAGE>";

/// Separator between the sender tag and the payload of a chat line
pub const CHAT_SEPARATOR: &str = " - ";

/// Sent to a client that logs in twice, right before its connection is closed
pub const ALREADY_LOGGED_IN: &str = "Error: Already logged in.  Terminating Client.";

/// Most bytes the server adds around a payload when relaying it
///
/// A chat tag is at most [`MAX_IDENTITY_LEN`] characters of up to four UTF-8
/// bytes each, plus the separator. A notice adds the prefix and a space.
pub const MAX_RELAY_OVERHEAD: usize = {
    let chat = MAX_IDENTITY_LEN * 4 + CHAT_SEPARATOR.len();
    let notice = NOTICE_PREFIX.len() + 1;
    if chat > notice { chat } else { notice }
};

/// Longest line a client may receive when payloads are capped at `max_payload`
pub const fn relayed_line_limit(max_payload: usize) -> usize {
    max_payload.saturating_add(MAX_RELAY_OVERHEAD)
}

/// Check whether a line is a login attempt
///
/// Only the first space-separated field is inspected, so this also matches
/// malformed login lines such as `#login` or `#login a b`.
pub fn is_login_line(line: &str) -> bool {
    line.split(' ').next() == Some(LOGIN_COMMAND)
}

/// Parse a login line into the identity it carries
///
/// The line is split on single spaces and must have exactly two fields, the
/// first being `#login`.
pub fn parse_login(line: &str) -> Result<Identity, ProtocolViolation> {
    let mut fields = line.split(' ');
    if fields.next() != Some(LOGIN_COMMAND) {
        return Err(ProtocolViolation::NotLogin(line.to_string()));
    }
    let args: Vec<&str> = fields.collect();
    match args.as_slice() {
        [] => Err(ProtocolViolation::MissingIdentity),
        [token] => Ok(Identity::new(*token)?),
        more => Err(ProtocolViolation::TooManyArguments(more.len())),
    }
}

/// Format the login line for an identity
pub fn format_login(identity: &Identity) -> String {
    format!("{LOGIN_COMMAND} {identity}")
}

/// Tag a payload with the sender's identity
pub fn format_chat(sender: &Identity, payload: &str) -> String {
    format!("{sender}{CHAT_SEPARATOR}{payload}")
}

/// Prefix operator text as a server notice
pub fn format_notice(text: &str) -> String {
    format!("{NOTICE_PREFIX} {text}")
}

/// Classification of a line received by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerLine<'a> {
    /// Server notice, display only
    Notice(&'a str),
    /// Duplicate-login rejection
    Rejection,
    /// Chat line relayed from a session
    Chat {
        /// Sender identity tag
        sender: &'a str,
        /// Message text
        payload: &'a str,
    },
    /// Anything else
    Other(&'a str),
}

impl<'a> ServerLine<'a> {
    /// Classify a line received from the server
    pub fn parse(line: &'a str) -> Self {
        if let Some(text) = line.strip_prefix(NOTICE_PREFIX) {
            return Self::Notice(text.strip_prefix(' ').unwrap_or(text));
        }
        if line == ALREADY_LOGGED_IN {
            return Self::Rejection;
        }
        match line.split_once(CHAT_SEPARATOR) {
            Some((sender, payload)) if !sender.is_empty() && !sender.contains(' ') => {
                Self::Chat { sender, payload }
            }
            _ => Self::Other(line),
        }
    }

    /// Check whether this line is display-only
    pub fn is_notice(&self) -> bool {
        matches!(self, Self::Notice(_) | Self::Rejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdentityError;

    #[test]
    fn test_relayed_line_fits_limit() {
        let widest = Identity::new("\u{1F600}".repeat(MAX_IDENTITY_LEN)).unwrap();
        let payload = "x".repeat(100);
        assert!(format_chat(&widest, &payload).len() <= relayed_line_limit(100));
        assert!(format_notice(&payload).len() <= relayed_line_limit(100));
        assert_eq!(relayed_line_limit(usize::MAX), usize::MAX);
    }

    #[test]
    fn test_parse_login() {
        let id = parse_login("#login alice").unwrap();
        assert_eq!(id.as_str(), "alice");
    }

    #[test]
    fn test_parse_login_missing_identity() {
        assert_eq!(parse_login("#login"), Err(ProtocolViolation::MissingIdentity));
    }

    #[test]
    fn test_parse_login_too_many_arguments() {
        assert_eq!(
            parse_login("#login alice bob"),
            Err(ProtocolViolation::TooManyArguments(2))
        );
        // A doubled space produces an empty field and counts as an extra argument.
        assert_eq!(
            parse_login("#login  alice"),
            Err(ProtocolViolation::TooManyArguments(2))
        );
    }

    #[test]
    fn test_parse_login_empty_identity() {
        assert_eq!(
            parse_login("#login "),
            Err(ProtocolViolation::InvalidIdentity(IdentityError::Empty))
        );
    }

    #[test]
    fn test_parse_login_not_login() {
        assert!(matches!(
            parse_login("hello"),
            Err(ProtocolViolation::NotLogin(_))
        ));
        assert!(matches!(
            parse_login("#loginalice"),
            Err(ProtocolViolation::NotLogin(_))
        ));
    }

    #[test]
    fn test_is_login_line() {
        assert!(is_login_line("#login alice"));
        assert!(is_login_line("#login"));
        assert!(is_login_line("#login a b"));
        assert!(!is_login_line("#logout"));
        assert!(!is_login_line("login alice"));
    }

    #[test]
    fn test_format_lines() {
        let alice = Identity::new("alice").unwrap();
        assert_eq!(format_login(&alice), "#login alice");
        assert_eq!(format_chat(&alice, "hello"), "alice - hello");
        assert_eq!(format_notice("maintenance"), "SERVER MESSAGE> maintenance");
    }

    #[test]
    fn test_server_line_classification() {
        assert_eq!(
            ServerLine::parse("SERVER MESSAGE> maintenance"),
            ServerLine::Notice("maintenance")
        );
        assert_eq!(ServerLine::parse(ALREADY_LOGGED_IN), ServerLine::Rejection);
        assert_eq!(
            ServerLine::parse("alice - hello - world"),
            ServerLine::Chat {
                sender: "alice",
                payload: "hello - world"
            }
        );
        assert_eq!(ServerLine::parse("plain"), ServerLine::Other("plain"));
    }

    #[test]
    fn test_notice_containing_chat_separator_stays_notice() {
        let line = format_notice("bob - not a chat line");
        let parsed = ServerLine::parse(&line);
        assert!(parsed.is_notice());
        assert_eq!(parsed, ServerLine::Notice("bob - not a chat line"));
    }
}
