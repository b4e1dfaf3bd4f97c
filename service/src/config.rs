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

//! Server configuration

use chatline_codec::DEFAULT_MAX_LINE_LENGTH;
use std::time::Duration;

/// Default listen port
pub const DEFAULT_PORT: u16 = 5555;

/// Server configuration
///
/// Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use chatline_service::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new(6000)
///     .with_max_connections(50)
///     .with_write_timeout(Duration::from_secs(2));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host or address to bind the listener to
    pub bind_host: String,

    /// Port to listen on (0 picks an ephemeral port)
    pub port: u16,

    /// Maximum number of concurrent sessions
    pub max_connections: usize,

    /// Maximum length of an inbound line in bytes
    pub max_line_length: usize,

    /// Timeout for sending one line to one session
    ///
    /// A recipient that cannot take a broadcast line within this duration is
    /// skipped for that broadcast.
    pub write_timeout: Duration,

    /// Timeout for the accept loop to wind down on stop
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_connections: 1000,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            write_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration listening on the given port
    ///
    /// All other settings will use their default values.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Set the bind host
    pub fn with_bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = host.into();
        self
    }

    /// Set the maximum number of concurrent sessions
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the maximum inbound line length
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Set the per-recipient write timeout
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the accept loop shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Get the listener address for the current port
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.bind_host.is_empty() {
            return Err("bind_host must not be empty".to_string());
        }

        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }

        if self.max_line_length == 0 {
            return Err("max_line_length must be greater than 0".to_string());
        }

        if self.write_timeout.is_zero() {
            return Err("write_timeout must be greater than 0".to_string());
        }

        if self.shutdown_timeout.is_zero() {
            return Err("shutdown_timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5555);
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.max_line_length, 4096);
        assert_eq!(config.bind_address(), "0.0.0.0:5555");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServerConfig::new(6000)
            .with_bind_host("127.0.0.1")
            .with_max_connections(5)
            .with_max_line_length(128)
            .with_write_timeout(Duration::from_secs(1));

        assert_eq!(config.bind_address(), "127.0.0.1:6000");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.max_line_length, 128);
        assert_eq!(config.write_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.max_connections = 0;
        assert!(config.validate().is_err());

        config.max_connections = 10;
        config.write_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.write_timeout = Duration::from_secs(1);
        config.bind_host.clear();
        assert!(config.validate().is_err());
    }
}
