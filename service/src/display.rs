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

//! Display sinks for operator-facing output
//!
//! Both consoles write their user-facing lines through [`DisplaySink`]. The
//! console-backed sink prints to stdout; the recording sink keeps lines in
//! memory for tests.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Line-display capability
pub trait DisplaySink: Send + Sync + 'static {
    /// Show one line to the user
    fn display(&self, line: &str);
}

/// Prints lines to standard output, optionally with a fixed prefix
#[derive(Debug, Clone, Default)]
pub struct ConsoleDisplay {
    prefix: Option<String>,
}

impl ConsoleDisplay {
    /// Create a sink that prints lines unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that prints every line after `prefix` and a space
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Render a line as it will be printed
    pub fn render(&self, line: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix} {line}"),
            None => line.to_string(),
        }
    }
}

impl DisplaySink for ConsoleDisplay {
    fn display(&self, line: &str) {
        println!("{}", self.render(line));
    }
}

/// Records displayed lines in memory
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    lines: Mutex<Vec<String>>,
}

impl RecordingDisplay {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of every line displayed so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Check whether a line equal to `line` was displayed
    pub fn contains(&self, line: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|l| l == line)
    }

    /// Get the most recently displayed line
    pub fn last(&self) -> Option<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Forget all recorded lines
    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Wait until `line` has been displayed
    ///
    /// Returns `false` if it did not show up within `timeout`.
    pub async fn wait_for(&self, line: &str, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            while !self.contains(line) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }
}

impl DisplaySink for RecordingDisplay {
    fn display(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_console_render() {
        assert_eq!(ConsoleDisplay::new().render("hello"), "hello");
        assert_eq!(
            ConsoleDisplay::with_prefix("SERVER MESSAGE>").render("hello"),
            "SERVER MESSAGE> hello"
        );
    }

    #[test]
    fn test_recording_display() {
        let display = RecordingDisplay::new();
        display.display("one");
        display.display("two");

        assert_eq!(display.lines(), vec!["one", "two"]);
        assert!(display.contains("one"));
        assert!(!display.contains("three"));
        assert_eq!(display.last().as_deref(), Some("two"));

        display.clear();
        assert!(display.lines().is_empty());
    }

    #[tokio::test]
    async fn test_recording_wait_for() {
        let display = Arc::new(RecordingDisplay::new());
        let writer = display.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.display("late");
        });

        assert!(display.wait_for("late", Duration::from_secs(2)).await);
        assert!(!display.wait_for("never", Duration::from_millis(50)).await);
    }
}
