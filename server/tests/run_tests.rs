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

//! Operator process tests

use chatline_server::run;
use chatline_service::{CONSOLE_READ_FAILED, Flow, RecordingDisplay, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

fn config() -> ServerConfig {
    ServerConfig::new(0).with_bind_host("127.0.0.1")
}

/// Pull the bound port out of the listening notice
fn listening_port(display: &RecordingDisplay) -> Option<u16> {
    display.lines().iter().find_map(|line| {
        line.strip_prefix("Server listening for connections on port ")
            .and_then(|port| port.parse().ok())
    })
}

#[tokio::test]
async fn quit_ends_with_quit_flow() {
    let display = Arc::new(RecordingDisplay::new());
    let console = Arc::new(RecordingDisplay::new());

    let flow = run(
        config(),
        &b"#quit\n"[..],
        display.clone(),
        console.clone(),
    )
    .await;

    assert_eq!(flow, Flow::Quit);
    assert!(listening_port(&display).is_some());
    assert!(console.contains("Server is quitting."));
}

#[tokio::test]
async fn end_of_console_input_terminates() {
    let display = Arc::new(RecordingDisplay::new());
    let console = Arc::new(RecordingDisplay::new());

    let flow = run(config(), &b"#getport\n"[..], display, console.clone()).await;

    assert_eq!(flow, Flow::Terminate(CONSOLE_READ_FAILED.to_string()));
    assert_eq!(console.last().as_deref(), Some(CONSOLE_READ_FAILED));
}

#[tokio::test]
async fn invalid_config_terminates() {
    let display = Arc::new(RecordingDisplay::new());
    let console = Arc::new(RecordingDisplay::new());

    let flow = run(
        config().with_max_connections(0),
        &b""[..],
        display,
        console.clone(),
    )
    .await;

    assert!(matches!(flow, Flow::Terminate(_)));
    assert_eq!(console.lines().len(), 1);
}

#[tokio::test]
async fn operator_text_reaches_connected_clients() {
    let display = Arc::new(RecordingDisplay::new());
    let console = Arc::new(RecordingDisplay::new());
    let (mut operator, input) = tokio::io::duplex(1024);

    let server = tokio::spawn(run(
        config(),
        BufReader::new(input),
        display.clone(),
        console.clone(),
    ));

    let port = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(port) = listening_port(&display) {
                return port;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let (read, mut write) = stream.into_split();
    write.write_all(b"#login carol\n").await.unwrap();
    // Give the login a moment to be routed before the notice goes out
    tokio::time::sleep(Duration::from_millis(100)).await;

    operator.write_all(b"maintenance\n").await.unwrap();
    let mut lines = BufReader::new(read).lines();
    let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(line.as_deref(), Some("SERVER MESSAGE> maintenance"));
    assert!(console.contains("maintenance"));

    operator.write_all(b"#quit\n").await.unwrap();
    let flow = tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(flow, Flow::Quit);

    // Quitting closed the session
    let eof = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .unwrap();
    assert!(matches!(eof, Ok(None) | Err(_)));
}
