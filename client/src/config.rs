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

//! Client configuration

use chatline_codec::{DEFAULT_MAX_LINE_LENGTH, Identity};
use chatline_service::DEFAULT_PORT;
use std::time::Duration;

/// Default server host
pub const DEFAULT_HOST: &str = "localhost";

/// Chat client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or IP address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Identity sent in the login line
    pub identity: Identity,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Maximum inbound line length
    pub max_line_length: usize,
}

impl ClientConfig {
    /// Create a configuration for an identity with default host and port
    pub fn new(identity: Identity) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            identity,
            connect_timeout: Duration::from_secs(10),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Set the server host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the maximum inbound line length
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Get the server address as a string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("host must not be empty".to_string());
        }
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }
        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be greater than 0".to_string());
        }
        if self.max_line_length == 0 {
            return Err("max_line_length must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("alice").unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::new(alice());
        assert_eq!(config.address(), "localhost:5555");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ClientConfig::new(alice())
            .with_host("chat.example.org")
            .with_port(6000)
            .with_max_line_length(256);
        assert_eq!(config.address(), "chat.example.org:6000");
        assert_eq!(config.max_line_length, 256);
        assert_eq!(config.identity.as_str(), "alice");
    }

    #[test]
    fn test_validation() {
        assert!(ClientConfig::new(alice()).with_host("").validate().is_err());
        assert!(ClientConfig::new(alice()).with_port(0).validate().is_err());
        assert!(
            ClientConfig::new(alice())
                .with_connect_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
