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

//! Handler trait for the chat server

use crate::{ChatConnection, RelayError, Result, SessionFlow};
use async_trait::async_trait;

/// Server event handler trait
///
/// The connection worker drives one handler per server. Only
/// [`on_line`](Self::on_line) is required.
///
/// # Example
///
/// ```no_run
/// use chatline_service::{ChatConnection, Result, ServerHandler, SessionFlow};
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[async_trait]
/// impl ServerHandler for Echo {
///     async fn on_line(&self, conn: &ChatConnection, line: String) -> Result<SessionFlow> {
///         conn.send_line(&line).await?;
///         Ok(SessionFlow::Continue)
///     }
/// }
/// ```
#[async_trait]
pub trait ServerHandler: Send + Sync + 'static {
    /// Called when a new connection is established, before any line is read
    async fn on_connect(&self, _conn: &ChatConnection) {}

    /// Called for every inbound line
    ///
    /// Returning [`SessionFlow::Close`] ends the session. An error ends the
    /// session too; a [fatal](RelayError::is_fatal) one is escalated to the
    /// server.
    async fn on_line(&self, conn: &ChatConnection, line: String) -> Result<SessionFlow>;

    /// Called when reading from a connection fails
    ///
    /// The connection will be closed after this method returns.
    async fn on_error(&self, _conn: &ChatConnection, _error: &RelayError) {}

    /// Called once when the connection is gone, whoever closed it
    async fn on_disconnect(&self, _conn: &ChatConnection) {}
}
