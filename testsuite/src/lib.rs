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

//! Shared fixtures for end-to-end tests

use chatline_client::{ChatClient, ClientConfig, ClientConsole};
use chatline_codec::Identity;
use chatline_service::{ChatServer, RecordingDisplay, ServerConfig, ServerConsole};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// How long any single expectation may take
pub const PATIENCE: Duration = Duration::from_secs(2);

/// A listening server with its operator console
pub struct ServerFixture {
    pub server: Arc<ChatServer>,
    pub console: ServerConsole,
    pub display: Arc<RecordingDisplay>,
    pub addr: SocketAddr,
}

impl ServerFixture {
    /// Start a server on an ephemeral loopback port
    pub async fn start() -> Self {
        let display = Arc::new(RecordingDisplay::new());
        let config = ServerConfig::new(0).with_bind_host("127.0.0.1");
        let server = Arc::new(
            ChatServer::new(config, display.clone()).expect("valid server configuration"),
        );
        let addr = server.listen().await.expect("bind loopback listener");
        let console = ServerConsole::new(server.clone(), display.clone());
        Self {
            server,
            console,
            display,
            addr,
        }
    }

    /// Wait until `count` sessions have logged in
    pub async fn wait_for_logins(&self, count: usize) {
        let server = self.server.clone();
        eventually(move || {
            let server = server.clone();
            async move { server.snapshot().await.authenticated_sessions == count }
        })
        .await;
    }
}

/// A real client with its console
pub struct ClientFixture {
    pub client: ChatClient,
    pub console: ClientConsole,
    pub display: Arc<RecordingDisplay>,
}

impl ClientFixture {
    /// Create a disconnected client aimed at `addr`
    pub fn new(identity: &str, addr: SocketAddr) -> Self {
        let display = Arc::new(RecordingDisplay::new());
        let config = ClientConfig::new(Identity::new(identity).expect("valid identity"))
            .with_host(addr.ip().to_string())
            .with_port(addr.port());
        let client = ChatClient::new(config, display.clone());
        let console = ClientConsole::new(client.clone(), display.clone());
        Self {
            client,
            console,
            display,
        }
    }

    /// Create a client and log in
    pub async fn login(identity: &str, addr: SocketAddr) -> Self {
        let fixture = Self::new(identity, addr);
        fixture.client.connect().await.expect("connect to server");
        fixture
    }

    /// Wait until `line` has been displayed
    pub async fn expect_line(&self, line: &str) {
        assert!(
            self.display.wait_for(line, PATIENCE).await,
            "{} never displayed {line:?}; saw {:?}",
            self.client.identity(),
            self.display.lines()
        );
    }
}

/// A raw line-level connection for protocol tests
pub struct RawClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl RawClient {
    /// Connect without logging in
    pub async fn connect(addr: SocketAddr) -> Self {
        let (read, writer) = TcpStream::connect(addr)
            .await
            .expect("connect to server")
            .into_split();
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    /// Send one line
    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write line");
    }

    /// Receive the next line, `None` once the server closed the connection
    pub async fn recv(&mut self) -> Option<String> {
        tokio::time::timeout(PATIENCE, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap_or(None)
    }

    /// Check that nothing arrives for a short while
    pub async fn expect_silence(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(200), self.lines.next_line()).await;
        assert!(next.is_err(), "unexpected line: {next:?}");
    }
}

/// Poll `check` until it holds
pub async fn eventually<F, Fut>(check: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(PATIENCE, async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
