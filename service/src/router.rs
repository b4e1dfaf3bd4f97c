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

//! Message router
//!
//! Classifies every inbound line: the first line of a session must be a
//! valid login, after which lines are broadcast tagged with the sender's
//! identity. A second login is answered with the rejection notice and the
//! session is torn down.

use crate::{
    BroadcastResult, ChatConnection, RelayError, Result, ServerHandler, Session, SessionFlow,
    SessionRegistry,
};
use async_trait::async_trait;
use chatline_codec::{
    ALREADY_LOGGED_IN, Identity, ProtocolViolation, format_chat, is_login_line, parse_login,
};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Server-side line router
#[derive(Debug, Clone)]
pub struct MessageRouter {
    registry: Arc<SessionRegistry>,
}

impl MessageRouter {
    /// Create a router over a registry
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Get the registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Route one inbound line from a connection
    pub async fn route(&self, conn: &ChatConnection, line: String) -> Result<SessionFlow> {
        let id = conn.id();
        match self.registry.identity(id).await {
            None => {
                debug!(connection_id = %id, line = %line, "Message received from unauthenticated session");
                match parse_login(&line) {
                    Ok(identity) => self.login(conn, identity).await,
                    Err(violation) => self.reject_violation(conn, violation).await,
                }
            }
            Some(identity) => {
                debug!(connection_id = %id, identity = %identity, line = %line, "Message received");
                if is_login_line(&line) {
                    self.reject_duplicate(conn, &identity).await
                } else {
                    self.relay(&identity, &line).await;
                    Ok(SessionFlow::Continue)
                }
            }
        }
    }

    async fn login(&self, conn: &ChatConnection, identity: Identity) -> Result<SessionFlow> {
        match self.registry.attach_identity(conn.id(), identity.clone()).await {
            Ok(()) => {
                info!(connection_id = %conn.id(), identity = %identity, "{identity} has logged on.");
                Ok(SessionFlow::Continue)
            }
            Err(RelayError::AlreadyLoggedIn(_, existing)) => {
                self.reject_duplicate(conn, &existing).await
            }
            // Removed while the line was in flight
            Err(RelayError::ConnectionNotFound(_)) => Ok(SessionFlow::Close),
            Err(e) => Err(e),
        }
    }

    async fn relay(&self, sender: &Identity, payload: &str) -> BroadcastResult {
        self.registry.broadcast(&format_chat(sender, payload)).await
    }

    async fn reject_violation(
        &self,
        conn: &ChatConnection,
        violation: ProtocolViolation,
    ) -> Result<SessionFlow> {
        counter!("chatline.protocol_violations").increment(1);
        warn!(
            connection_id = %conn.id(),
            violation = %violation,
            "Error with the login id, terminating client"
        );
        self.teardown(conn).await?;
        Ok(SessionFlow::Close)
    }

    async fn reject_duplicate(
        &self,
        conn: &ChatConnection,
        identity: &Identity,
    ) -> Result<SessionFlow> {
        counter!("chatline.protocol_violations").increment(1);
        warn!(connection_id = %conn.id(), identity = %identity, "Duplicate login, terminating client");
        if let Err(e) = conn.send_line(ALREADY_LOGGED_IN).await {
            debug!(connection_id = %conn.id(), error = %e, "Could not deliver rejection");
        }
        self.teardown(conn).await?;
        Ok(SessionFlow::Close)
    }

    /// Remove a session from the registry and close its connection
    ///
    /// A close failure is fatal for the whole server.
    async fn teardown(&self, conn: &ChatConnection) -> Result<()> {
        if let Some(session) = self.registry.remove(conn.id()).await {
            log_departure(conn, &session);
        }
        conn.close()
            .await
            .map_err(|source| RelayError::TeardownFailed {
                id: conn.id(),
                source: Box::new(source),
            })
    }
}

#[async_trait]
impl ServerHandler for MessageRouter {
    async fn on_connect(&self, conn: &ChatConnection) {
        self.registry.register(conn.clone()).await;
        info!(
            connection_id = %conn.id(),
            peer_addr = %conn.peer_addr(),
            "A new client has connected to the server."
        );
    }

    async fn on_line(&self, conn: &ChatConnection, line: String) -> Result<SessionFlow> {
        self.route(conn, line).await
    }

    async fn on_error(&self, conn: &ChatConnection, error: &RelayError) {
        warn!(connection_id = %conn.id(), error = %error, "Connection error");
    }

    async fn on_disconnect(&self, conn: &ChatConnection) {
        match self.registry.remove(conn.id()).await {
            Some(session) => log_departure(conn, &session),
            // Already removed and logged by a teardown or close_all
            None => debug!(connection_id = %conn.id(), "Session already removed"),
        }
    }
}

fn log_departure(conn: &ChatConnection, session: &Session) {
    info!(
        connection_id = %conn.id(),
        "{} has disconnected from server.",
        session.label()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LineReader;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, Lines, ReadHalf};
    use tracing_test::traced_test;

    struct Peer {
        conn: ChatConnection,
        lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
        _reader: LineReader,
    }

    impl Peer {
        async fn next(&mut self) -> Option<String> {
            tokio::time::timeout(Duration::from_secs(1), self.lines.next_line())
                .await
                .ok()?
                .ok()?
        }
    }

    async fn connect(router: &MessageRouter) -> Peer {
        let (local, remote) = tokio::io::duplex(4096);
        let (r, w) = tokio::io::split(local);
        let (conn, reader) = ChatConnection::from_parts(
            router.registry().next_connection_id(),
            "127.0.0.1:6000".parse().unwrap(),
            r,
            w,
            4096,
        );
        router.on_connect(&conn).await;
        let (remote_r, _) = tokio::io::split(remote);
        Peer {
            conn,
            lines: BufReader::new(remote_r).lines(),
            _reader: reader,
        }
    }

    fn router() -> MessageRouter {
        MessageRouter::new(Arc::new(SessionRegistry::new(Duration::from_secs(1))))
    }

    async fn say(router: &MessageRouter, peer: &Peer, line: &str) -> Result<SessionFlow> {
        router.route(&peer.conn, line.to_string()).await
    }

    #[tokio::test]
    #[traced_test]
    async fn test_login_then_chat_is_broadcast_to_all() {
        let router = router();
        let mut alice = connect(&router).await;
        let mut bob = connect(&router).await;

        assert_eq!(say(&router, &alice, "#login alice").await.unwrap(), SessionFlow::Continue);
        assert_eq!(say(&router, &bob, "#login bob").await.unwrap(), SessionFlow::Continue);
        assert!(logs_contain("alice has logged on."));

        say(&router, &alice, "hi").await.unwrap();
        assert_eq!(alice.next().await.as_deref(), Some("alice - hi"));
        assert_eq!(bob.next().await.as_deref(), Some("alice - hi"));
    }

    #[tokio::test]
    async fn test_hash_text_after_login_is_chat() {
        let router = router();
        let mut alice = connect(&router).await;
        say(&router, &alice, "#login alice").await.unwrap();

        say(&router, &alice, "#quit").await.unwrap();
        assert_eq!(alice.next().await.as_deref(), Some("alice - #quit"));
    }

    #[tokio::test]
    async fn test_duplicate_login_rejected_and_torn_down() {
        let router = router();
        let mut alice = connect(&router).await;
        let mut bob = connect(&router).await;
        say(&router, &alice, "#login alice").await.unwrap();
        say(&router, &bob, "#login bob").await.unwrap();

        let flow = say(&router, &alice, "#login mallory").await.unwrap();
        assert_eq!(flow, SessionFlow::Close);
        assert_eq!(alice.next().await.as_deref(), Some(ALREADY_LOGGED_IN));
        assert_eq!(alice.next().await, None);
        assert!(alice.conn.is_closed());
        assert!(!router.registry().contains(alice.conn.id()).await);

        // Other sessions are untouched
        say(&router, &bob, "still here").await.unwrap();
        assert_eq!(bob.next().await.as_deref(), Some("bob - still here"));
        assert_eq!(router.registry().len().await, 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_duplicate_login_logs_identity_on_departure() {
        let router = router();
        let alice = connect(&router).await;
        say(&router, &alice, "#login alice").await.unwrap();

        say(&router, &alice, "#login alice").await.unwrap();
        router.on_disconnect(&alice.conn).await;
        assert!(logs_contain("alice has disconnected from server."));
        assert!(!logs_contain(&format!("{} has disconnected", alice.conn.id())));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_close_all_logs_identity_on_departure() {
        let router = router();
        let bob = connect(&router).await;
        say(&router, &bob, "#login bob").await.unwrap();

        assert_eq!(router.registry().close_all().await.unwrap(), 1);
        router.on_disconnect(&bob.conn).await;
        assert!(logs_contain("bob has disconnected from server."));
        assert!(!logs_contain(&format!("{} has disconnected", bob.conn.id())));
    }

    #[tokio::test]
    async fn test_malformed_login_after_login_is_duplicate() {
        let router = router();
        let mut alice = connect(&router).await;
        say(&router, &alice, "#login alice").await.unwrap();

        assert_eq!(say(&router, &alice, "#login").await.unwrap(), SessionFlow::Close);
        assert_eq!(alice.next().await.as_deref(), Some(ALREADY_LOGGED_IN));
    }

    #[tokio::test]
    async fn test_malformed_login_tears_down_silently() {
        for bad in ["#login", "#login a b", "hello", "#login bad\tid"] {
            let router = router();
            let mut eve = connect(&router).await;
            let mut watcher = connect(&router).await;
            say(&router, &watcher, "#login watcher").await.unwrap();

            assert_eq!(say(&router, &eve, bad).await.unwrap(), SessionFlow::Close, "{bad}");
            assert_eq!(eve.next().await, None, "{bad}");
            assert!(!router.registry().contains(eve.conn.id()).await);

            say(&router, &watcher, "ping").await.unwrap();
            assert_eq!(watcher.next().await.as_deref(), Some("watcher - ping"));
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_disconnect_removes_session() {
        let router = router();
        let alice = connect(&router).await;
        say(&router, &alice, "#login alice").await.unwrap();

        router.on_disconnect(&alice.conn).await;
        assert!(router.registry().is_empty().await);
        assert!(logs_contain("alice has disconnected from server."));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unauthenticated_disconnect_uses_connection_id() {
        let router = router();
        let anon = connect(&router).await;

        router.on_disconnect(&anon.conn).await;
        assert!(logs_contain(&format!("{} has disconnected from server.", anon.conn.id())));
    }
}
