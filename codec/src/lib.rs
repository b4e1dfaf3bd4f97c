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

//! # Chatline Codec
//!
//! Wire grammar and framing for the Chatline chat protocol.
//!
//! - [`parse_login`], [`format_chat`], [`ServerLine`]: login, chat, notice and rejection lines
//! - [`Identity`]: the opaque login token that tags chat lines
//! - [`parse_input`]: console command grammar for the client and the server
//! - [`ChatLineCodec`]: newline framing for `tokio_util::codec::Framed`
//!
//! ```
//! use chatline_codec::{format_chat, parse_login, ServerLine};
//!
//! let alice = parse_login("#login alice").unwrap();
//! let line = format_chat(&alice, "hello");
//! assert_eq!(line, "alice - hello");
//! assert!(matches!(ServerLine::parse(&line), ServerLine::Chat { sender: "alice", .. }));
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod codec;
mod command;
mod error;
mod identity;
mod wire;

pub use codec::{ChatLineCodec, DEFAULT_MAX_LINE_LENGTH};
pub use command::{ClientCommand, ConsoleCommand, Input, ServerCommand, parse_input, parse_port};
pub use error::{CodecError, CommandError, IdentityError, ProtocolViolation, Result};
pub use identity::{Identity, MAX_IDENTITY_LEN};
pub use wire::{
    ALREADY_LOGGED_IN, CHAT_SEPARATOR, LOGIN_COMMAND, LOGIN_KEYWORD, MARKER, MAX_RELAY_OVERHEAD,
    NOTICE_PREFIX, ServerLine, format_chat, format_login, format_notice, is_login_line,
    parse_login, relayed_line_limit,
};
