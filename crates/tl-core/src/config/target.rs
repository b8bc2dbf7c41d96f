//! Target device configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_millis;
use crate::error::ConfigError;

/// How the server's host key is checked during the SSH handshake
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyPolicy {
    /// Accept any host key.
    ///
    /// The target is a fixed device on a local network, so the key is not
    /// pinned. Switching to `Fingerprint` changes the security contract.
    #[default]
    AcceptAny,
    /// Require the server key's SHA-256 fingerprint to match
    Fingerprint(String),
}

/// Connection settings for the device whose log is followed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Device host name or IP address
    pub host: String,

    /// SSH port
    pub port: u16,

    /// Username for SSH authentication
    pub username: String,

    /// Password for SSH authentication (may be empty)
    pub password: String,

    /// Remote file to follow with `tail -f`
    pub remote_path: String,

    /// Timeout for the handshake and for opening the exec channel
    #[serde(with = "duration_millis")]
    pub connect_timeout: Duration,

    /// Attempts per connect or reconnect cycle before giving up
    pub max_retry_attempts: u32,

    /// Fixed wait between consecutive attempts
    #[serde(with = "duration_millis")]
    pub retry_interval: Duration,

    /// Host key verification policy
    pub host_key: HostKeyPolicy,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "192.168.43.1".to_string(),
            port: 22,
            username: "root".to_string(),
            password: String::new(),
            remote_path: "/tmp/ttyLog".to_string(),
            connect_timeout: Duration::from_millis(2000),
            max_retry_attempts: 10,
            retry_interval: Duration::from_millis(2000),
            host_key: HostKeyPolicy::AcceptAny,
        }
    }
}

impl TargetConfig {
    /// `host:port` for display and logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The remote command issued on every successful connection
    ///
    /// The path is quoted for a POSIX shell unless it is made only of
    /// characters the shell treats literally.
    pub fn follow_command(&self) -> String {
        format!("tail -f {}", shell_quote(&self.remote_path))
    }

    /// Check the values the streamer relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("target.host must not be empty".into()));
        }
        if self.remote_path.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "target.remote_path must not be empty".into(),
            ));
        }
        if self.max_retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "target.max_retry_attempts must be at least 1".into(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "target.connect_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn shell_quote(value: &str) -> String {
    let literal = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+,:@%=".contains(c));
    if literal {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_adapter() {
        let config = TargetConfig::default();
        assert_eq!(config.address(), "192.168.43.1:22");
        assert_eq!(config.follow_command(), "tail -f /tmp/ttyLog");
        assert_eq!(config.max_retry_attempts, 10);
        assert_eq!(config.retry_interval, Duration::from_millis(2000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_follow_command_quotes_unsafe_paths() {
        let mut config = TargetConfig::default();

        config.remote_path = "/var/log/tty log".to_string();
        assert_eq!(config.follow_command(), "tail -f '/var/log/tty log'");

        config.remote_path = "/tmp/x; rm -rf /".to_string();
        assert_eq!(config.follow_command(), "tail -f '/tmp/x; rm -rf /'");

        config.remote_path = "/tmp/it's".to_string();
        assert_eq!(config.follow_command(), r"tail -f '/tmp/it'\''s'");

        config.remote_path = "/tmp/$(id)".to_string();
        assert_eq!(config.follow_command(), "tail -f '/tmp/$(id)'");
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = TargetConfig {
            max_retry_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_empty_host_rejected() {
        let config = TargetConfig {
            host: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_host_key_policy_toml() {
        let config: TargetConfig =
            toml::from_str("host_key = { fingerprint = \"SHA256:abc\" }").unwrap();
        assert_eq!(
            config.host_key,
            HostKeyPolicy::Fingerprint("SHA256:abc".to_string())
        );

        let config: TargetConfig = toml::from_str("host_key = \"accept_any\"").unwrap();
        assert_eq!(config.host_key, HostKeyPolicy::AcceptAny);
    }
}
