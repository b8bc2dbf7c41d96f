//! SSH transport
//!
//! Opens a password-authenticated SSH session to the device and runs
//! `tail -f <remote_path>` on an exec channel.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use russh::client::{self, Config, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use tokio::time::timeout;

use tl_core::config::{HostKeyPolicy, TargetConfig};

use super::{ByteSource, ConnectError, RemoteSession, TeardownError, Transport};

/// Upper bound for each teardown step; an unresponsive peer is abandoned
const TEARDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Opens [`SshSession`]s with russh
#[derive(Clone)]
pub struct SshTransport {
    config: Arc<Config>,
}

impl SshTransport {
    /// Create a transport with russh's default client settings
    pub fn new() -> Self {
        Self {
            config: Arc::new(Config::default()),
        }
    }
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn open(&self, config: &TargetConfig) -> Result<Box<dyn RemoteSession>, ConnectError> {
        let session = SshSession::open(Arc::clone(&self.config), config).await?;
        Ok(Box::new(session))
    }
}

/// A live SSH session with its exec channel
pub struct SshSession {
    /// SSH session handle
    handle: Handle<ClientHandler>,
    /// Channel running the follow command
    channel: Channel<Msg>,
    /// `host:port`, for logging
    address: String,
}

impl SshSession {
    /// Connect, authenticate and start the follow command.
    ///
    /// The handshake with authentication and the channel setup are each
    /// bounded by `config.connect_timeout`.
    pub async fn open(ssh_config: Arc<Config>, config: &TargetConfig) -> Result<Self, ConnectError> {
        let address = config.address();
        tracing::debug!(
            "Establishing SSH connection to {}@{}",
            config.username,
            address
        );

        let handle = timeout(config.connect_timeout, async {
            let handler = ClientHandler::new(config.host_key.clone());
            let mut handle = client::connect(ssh_config, (config.host.as_str(), config.port), handler)
                .await
                .map_err(|e| match e {
                    ConnectError::Ssh(source) => ConnectError::Handshake {
                        address: address.clone(),
                        source,
                    },
                    other => other,
                })?;
            authenticate(&mut handle, config).await?;
            Ok::<_, ConnectError>(handle)
        })
        .await
        .map_err(|_| ConnectError::Timeout {
            stage: "SSH handshake",
            after: config.connect_timeout,
        })??;

        tracing::debug!("Session connected, opening exec channel");

        let command = config.follow_command();
        let channel = timeout(config.connect_timeout, open_exec_channel(&handle, &command))
            .await
            .map_err(|_| ConnectError::Timeout {
                stage: "Opening exec channel",
                after: config.connect_timeout,
            })??;

        tracing::debug!("Channel running '{}', ready to read", command);

        Ok(Self {
            handle,
            channel,
            address,
        })
    }

    async fn close_channel(&self) -> Result<(), TeardownError> {
        timeout(TEARDOWN_TIMEOUT, self.channel.close())
            .await
            .map_err(|_| TeardownError::Timeout {
                stage: "channel close",
            })?
            .map_err(|source| TeardownError::Ssh {
                stage: "channel close",
                source,
            })
    }

    async fn disconnect(&self) -> Result<(), TeardownError> {
        timeout(
            TEARDOWN_TIMEOUT,
            self.handle
                .disconnect(Disconnect::ByApplication, "closing", "en"),
        )
        .await
        .map_err(|_| TeardownError::Timeout {
            stage: "session disconnect",
        })?
        .map_err(|source| TeardownError::Ssh {
            stage: "session disconnect",
            source,
        })
    }
}

/// Password authentication, with a `none` fallback for empty credentials
async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    config: &TargetConfig,
) -> Result<(), ConnectError> {
    tracing::debug!("Authenticating as user '{}'", config.username);

    let mut authenticated = handle
        .authenticate_password(config.username.as_str(), config.password.as_str())
        .await?;

    // Devices with an empty root password often only offer `none`
    if !authenticated && config.password.is_empty() {
        tracing::debug!("Password method rejected, trying 'none' authentication");
        authenticated = handle.authenticate_none(config.username.as_str()).await?;
    }

    if !authenticated {
        return Err(ConnectError::AuthRejected {
            username: config.username.clone(),
        });
    }

    Ok(())
}

async fn open_exec_channel(
    handle: &Handle<ClientHandler>,
    command: &str,
) -> Result<Channel<Msg>, ConnectError> {
    let channel_error = |source: russh::Error| ConnectError::Channel {
        command: command.to_string(),
        source,
    };

    let channel = handle.channel_open_session().await.map_err(channel_error)?;
    tracing::debug!("Executing command: {}", command);
    channel.exec(true, command).await.map_err(channel_error)?;
    Ok(channel)
}

#[async_trait]
impl ByteSource for SshSession {
    async fn read_chunk(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    return Ok(Some(Bytes::copy_from_slice(&data)));
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    tracing::trace!("Discarding {} bytes of stream {} output", data.len(), ext);
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    tracing::debug!("Remote command exited with status {}", exit_status);
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) => return Ok(None),
                Some(_) => {}
                None => {
                    if self.handle.is_closed() {
                        return Err(io::Error::new(
                            io::ErrorKind::ConnectionAborted,
                            format!("SSH session to {} closed", self.address),
                        ));
                    }
                    return Ok(None);
                }
            }
        }
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn close(self: Box<Self>) {
        tracing::debug!("Cleaning up session and channel for {}", self.address);

        // The channel is usually already closed by the peer after EOF
        if let Err(e) = self.close_channel().await {
            tracing::debug!("Channel teardown error (ignored): {}", e);
        }
        if let Err(e) = self.disconnect().await {
            tracing::warn!("Session teardown error (ignored): {}", e);
        }
    }
}

/// SSH client handler applying the host key policy
struct ClientHandler {
    policy: HostKeyPolicy,
}

impl ClientHandler {
    fn new(policy: HostKeyPolicy) -> Self {
        Self { policy }
    }
}

/// Compare fingerprints, tolerating an `SHA256:` prefix on either side
fn fingerprint_matches(expected: &str, actual: &str) -> bool {
    let strip = |s: &str| s.trim().trim_start_matches("SHA256:").to_string();
    strip(expected) == strip(actual)
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = ConnectError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint();
        tracing::debug!("Server host key: SHA256:{}", fingerprint);

        match &self.policy {
            HostKeyPolicy::AcceptAny => Ok(true),
            HostKeyPolicy::Fingerprint(expected) => {
                if fingerprint_matches(expected, &fingerprint) {
                    tracing::debug!("Host key verified against configured fingerprint");
                    Ok(true)
                } else {
                    Err(ConnectError::HostKeyMismatch {
                        expected: expected.clone(),
                        actual: format!("SHA256:{}", fingerprint),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_prefix_is_optional() {
        assert!(fingerprint_matches("SHA256:abcDEF", "abcDEF"));
        assert!(fingerprint_matches("abcDEF", "SHA256:abcDEF"));
        assert!(fingerprint_matches(" abcDEF ", "abcDEF"));
        assert!(!fingerprint_matches("SHA256:abcDEF", "abcDEX"));
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_within_timeout() {
        let config = TargetConfig {
            // TEST-NET-1, never routable
            host: "192.0.2.1".to_string(),
            connect_timeout: Duration::from_millis(200),
            ..Default::default()
        };

        let started = std::time::Instant::now();
        let result = SshTransport::new().open(&config).await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
