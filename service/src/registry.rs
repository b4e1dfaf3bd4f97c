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

//! Session registry
//!
//! The registry is the only owner of live session state. Every access goes
//! through its narrow interface and a single lock, so a broadcast never
//! observes a session that is half attached or half removed.

use crate::{ChatConnection, ConnectionId, RelayError, Result, SessionInfo};
use chatline_codec::Identity;
use metrics::counter;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Result of a broadcast operation
#[derive(Debug, Clone, Default)]
pub struct BroadcastResult {
    /// Total number of sessions attempted
    pub total: usize,
    /// Number of successful sends
    pub succeeded: usize,
    /// Number of failed sends
    pub failed: usize,
    /// Errors that occurred (ConnectionId and error message)
    pub errors: Vec<(ConnectionId, String)>,
}

impl BroadcastResult {
    /// Check if all sends succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Check if any send failed
    pub fn any_failed(&self) -> bool {
        self.failed > 0
    }
}

/// A live connection plus its identity, once attached
#[derive(Debug, Clone)]
pub struct Session {
    connection: ChatConnection,
    identity: Option<Identity>,
}

impl Session {
    /// Get the session's connection
    pub fn connection(&self) -> &ChatConnection {
        &self.connection
    }

    /// Get the attached identity
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Name used for this session in logs: its identity once logged in
    pub fn label(&self) -> String {
        match &self.identity {
            Some(identity) => identity.to_string(),
            None => self.connection.id().to_string(),
        }
    }

    /// Snapshot this session
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.connection.id(),
            peer_addr: self.connection.peer_addr(),
            identity: self.identity.clone(),
            connected_at: self.connection.created_at(),
            messages_sent: self.connection.messages_sent(),
            messages_received: self.connection.messages_received(),
        }
    }
}

/// Table of live sessions
pub struct SessionRegistry {
    sessions: Mutex<BTreeMap<ConnectionId, Session>>,
    next_id: AtomicU64,
    write_timeout: Duration,
}

impl SessionRegistry {
    /// Create an empty registry
    ///
    /// `write_timeout` bounds how long a broadcast waits on one recipient.
    pub fn new(write_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            write_timeout,
        }
    }

    /// Allocate a connection ID, never reused
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a new, unauthenticated session
    #[instrument(skip(self, connection), fields(connection_id = %connection.id()))]
    pub async fn register(&self, connection: ChatConnection) {
        let id = connection.id();
        self.sessions.lock().await.insert(
            id,
            Session {
                connection,
                identity: None,
            },
        );
        debug!("Session registered");
    }

    /// Attach an identity to a registered session
    ///
    /// An identity is immutable once set. Identities are not checked for
    /// uniqueness across sessions.
    #[instrument(skip(self), fields(connection_id = %id, identity = %identity))]
    pub async fn attach_identity(&self, id: ConnectionId, identity: Identity) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(RelayError::ConnectionNotFound(id))?;

        if let Some(existing) = &session.identity {
            return Err(RelayError::AlreadyLoggedIn(id, existing.clone()));
        }
        session.identity = Some(identity);
        info!("Identity attached");
        Ok(())
    }

    /// Get the identity attached to a session, if any
    pub async fn identity(&self, id: ConnectionId) -> Option<Identity> {
        self.sessions
            .lock()
            .await
            .get(&id)
            .and_then(|s| s.identity.clone())
    }

    /// Check if a session is registered
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.sessions.lock().await.contains_key(&id)
    }

    /// Remove a session
    ///
    /// Removing an absent session is a no-op and returns `None`.
    #[instrument(skip(self), fields(connection_id = %id))]
    pub async fn remove(&self, id: ConnectionId) -> Option<Session> {
        let removed = self.sessions.lock().await.remove(&id);
        if removed.is_some() {
            debug!("Session removed");
        }
        removed
    }

    /// Get the number of registered sessions
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Check if the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Snapshot every registered session
    pub async fn sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .lock()
            .await
            .values()
            .map(Session::info)
            .collect()
    }

    /// Send one line to every registered session
    ///
    /// The registry lock is held for the whole fan-out, serializing
    /// broadcasts with each other and with attach and remove. A failing or
    /// stalled recipient is recorded in the result and never stops delivery
    /// to the others.
    #[instrument(skip(self, line))]
    pub async fn broadcast(&self, line: &str) -> BroadcastResult {
        let sessions = self.sessions.lock().await;
        let mut result = BroadcastResult {
            total: sessions.len(),
            ..Default::default()
        };
        counter!("chatline.broadcasts").increment(1);

        let sends = sessions.values().map(|session| {
            let connection = &session.connection;
            async move {
                let sent = tokio::time::timeout(self.write_timeout, connection.send_line(line))
                    .await
                    .unwrap_or(Err(RelayError::Timeout));
                (connection.id(), sent)
            }
        });
        let results = futures_util::future::join_all(sends).await;

        for (id, res) in results {
            match res {
                Ok(()) => result.succeeded += 1,
                Err(e) => {
                    warn!(connection_id = %id, error = %e, "Broadcast delivery failed");
                    result.failed += 1;
                    result.errors.push((id, e.to_string()));
                }
            }
        }

        debug!(
            total = result.total,
            succeeded = result.succeeded,
            failed = result.failed,
            "Broadcast complete"
        );
        result
    }

    /// Remove and close every session
    ///
    /// Every session is closed even when some fail; the first failure is
    /// returned. On success returns how many sessions were closed.
    #[instrument(skip(self))]
    pub async fn close_all(&self) -> Result<usize> {
        let drained = std::mem::take(&mut *self.sessions.lock().await);
        let count = drained.len();
        let mut first_error = None;

        for (id, session) in drained {
            info!(connection_id = %id, "{} has disconnected from server.", session.label());
            if let Err(e) = session.connection.close().await {
                warn!(connection_id = %id, error = %e, "Failed to close session");
                first_error.get_or_insert(RelayError::TeardownFailed {
                    id,
                    source: Box::new(e),
                });
            }
        }

        info!(count, "Closed all sessions");
        match first_error {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LineReader;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, Lines, ReadHalf};

    struct Peer {
        lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
        _reader: LineReader,
    }

    fn attach(registry: &SessionRegistry) -> (ChatConnection, Peer) {
        let (local, remote) = tokio::io::duplex(4096);
        let (r, w) = tokio::io::split(local);
        let (conn, reader) = ChatConnection::from_parts(
            registry.next_connection_id(),
            "127.0.0.1:5000".parse().unwrap(),
            r,
            w,
            4096,
        );
        let (remote_r, _remote_w) = tokio::io::split(remote);
        (
            conn,
            Peer {
                lines: BufReader::new(remote_r).lines(),
                _reader: reader,
            },
        )
    }

    fn id(token: &str) -> Identity {
        Identity::new(token).unwrap()
    }

    #[tokio::test]
    async fn test_connection_ids_are_unique() {
        let registry = SessionRegistry::new(Duration::from_secs(1));
        let a = registry.next_connection_id();
        let b = registry.next_connection_id();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_attach_identity_once() {
        let registry = SessionRegistry::new(Duration::from_secs(1));
        let (conn, _peer) = attach(&registry);
        registry.register(conn.clone()).await;

        registry.attach_identity(conn.id(), id("alice")).await.unwrap();
        assert_eq!(registry.identity(conn.id()).await, Some(id("alice")));

        let err = registry
            .attach_identity(conn.id(), id("mallory"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::AlreadyLoggedIn(_, ref existing) if *existing == id("alice")));
        assert_eq!(registry.identity(conn.id()).await, Some(id("alice")));
    }

    #[tokio::test]
    async fn test_attach_identity_unknown_session() {
        let registry = SessionRegistry::new(Duration::from_secs(1));
        let missing = ConnectionId::new(99);
        assert!(matches!(
            registry.attach_identity(missing, id("alice")).await,
            Err(RelayError::ConnectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = SessionRegistry::new(Duration::from_secs(1));
        let (conn, _peer) = attach(&registry);
        registry.register(conn.clone()).await;

        assert!(registry.remove(conn.id()).await.is_some());
        assert!(registry.remove(conn.id()).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_session() {
        let registry = SessionRegistry::new(Duration::from_secs(1));
        let (a, mut peer_a) = attach(&registry);
        let (b, mut peer_b) = attach(&registry);
        registry.register(a).await;
        registry.register(b).await;

        let result = registry.broadcast("alice - hi").await;
        assert_eq!(result.total, 2);
        assert!(result.all_succeeded());

        for peer in [&mut peer_a, &mut peer_b] {
            assert_eq!(peer.lines.next_line().await.unwrap().unwrap(), "alice - hi");
        }
    }

    #[tokio::test]
    async fn test_broadcast_isolates_failed_recipient() {
        let registry = SessionRegistry::new(Duration::from_secs(1));
        let (a, mut peer_a) = attach(&registry);
        let (b, _peer_b) = attach(&registry);
        registry.register(a).await;
        registry.register(b.clone()).await;
        b.close().await.unwrap();

        let result = registry.broadcast("bob - hello").await;
        assert_eq!(result.total, 2);
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].0, b.id());
        assert_eq!(peer_a.lines.next_line().await.unwrap().unwrap(), "bob - hello");
    }

    #[tokio::test]
    async fn test_label_prefers_identity() {
        let registry = SessionRegistry::new(Duration::from_secs(1));
        let (conn, _peer) = attach(&registry);
        registry.register(conn.clone()).await;
        registry.attach_identity(conn.id(), id("carol")).await.unwrap();

        let session = registry.remove(conn.id()).await.unwrap();
        assert_eq!(session.label(), "carol");
    }

    #[tokio::test]
    async fn test_close_all_empties_registry() {
        let registry = SessionRegistry::new(Duration::from_secs(1));
        let (a, mut peer_a) = attach(&registry);
        registry.register(a.clone()).await;

        assert_eq!(registry.close_all().await.unwrap(), 1);
        assert!(registry.is_empty().await);
        assert!(a.is_closed());
        assert_eq!(peer_a.lines.next_line().await.unwrap(), None);
    }
}
