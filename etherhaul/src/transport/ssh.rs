//! Interactive SSH shell on top of russh.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, trace, warn};
use regex::bytes::Regex;
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg, Disconnect};
use secrecy::ExposeSecret;

use super::Transport;
use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::channel::PatternBuffer;
use crate::error::{ConnectionError, Error, Result};

/// One authenticated SSH connection carrying one PTY shell.
///
/// EH radios drop the user straight into their CLI on the shell channel;
/// exec requests are not supported by the firmware.
pub struct SshTransport {
    handle: Handle<HostKeyPolicy>,
    shell: Channel<Msg>,
    received: PatternBuffer,
}

impl SshTransport {
    /// Connect, verify the host key, authenticate and start the shell.
    pub async fn connect(config: &SshConfig) -> Result<Self> {
        let client_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        let policy = HostKeyPolicy::new(config);
        let rejection = policy.rejection.clone();

        debug!("connecting to {}", config.socket_addr());
        let connecting = client::connect(client_config, (config.host.as_str(), config.port), policy);

        let mut handle = match tokio::time::timeout(config.timeout, connecting).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                // russh only reports UnknownKey; the policy knows why
                let detail = rejection.lock().ok().and_then(|mut r| r.take());
                return Err(detail.unwrap_or(ConnectionError::Ssh(e)).into());
            }
            Err(_) => {
                return Err(ConnectionError::ConnectionFailed {
                    host: config.host.clone(),
                    port: config.port,
                    source: io::Error::new(io::ErrorKind::TimedOut, "SSH handshake timed out"),
                }
                .into());
            }
        };

        authenticate(&mut handle, config).await?;
        let shell = open_shell(&handle, config).await?;
        info!("shell open on {}", config.socket_addr());

        Ok(Self {
            handle,
            shell,
            received: PatternBuffer::new(config.search_depth),
        })
    }
}

async fn authenticate(handle: &mut Handle<HostKeyPolicy>, config: &SshConfig) -> Result<()> {
    let user = config.username.as_str();

    let outcome = match &config.auth {
        AuthMethod::None => handle.authenticate_none(user).await,
        AuthMethod::Password(password) => {
            handle
                .authenticate_password(user, password.expose_secret())
                .await
        }
        AuthMethod::PrivateKey { path, passphrase } => {
            let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                .map_err(|e| ConnectionError::Key(format!("{}: {}", path.display(), e)))?;
            let hash_alg = handle
                .best_supported_rsa_hash()
                .await
                .map_err(ConnectionError::Ssh)?
                .flatten();

            handle
                .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
                .await
        }
    };

    if !outcome.map_err(ConnectionError::Ssh)?.success() {
        return Err(ConnectionError::AuthenticationFailed {
            user: user.to_string(),
        }
        .into());
    }

    Ok(())
}

async fn open_shell(handle: &Handle<HostKeyPolicy>, config: &SshConfig) -> Result<Channel<Msg>> {
    let shell = handle
        .channel_open_session()
        .await
        .map_err(ConnectionError::Ssh)?;

    shell
        .request_pty(
            true,
            "vt100",
            config.terminal_width,
            config.terminal_height,
            0,
            0,
            &[],
        )
        .await
        .map_err(ConnectionError::Ssh)?;

    shell
        .request_shell(true)
        .await
        .map_err(|_| ConnectionError::ShellRequestFailed)?;

    Ok(shell)
}

impl Transport for SshTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        trace!("ssh write {} bytes", data.len());
        self.shell.data(data).await.map_err(ConnectionError::Ssh)?;
        Ok(())
    }

    async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(data) = self.received.take_through(pattern) {
                return Ok(data);
            }

            let message = tokio::time::timeout_at(deadline, self.shell.wait())
                .await
                .map_err(|_| Error::Timeout(timeout))?;

            match message {
                Some(ChannelMsg::Data { data }) | Some(ChannelMsg::ExtendedData { data, .. }) => {
                    trace!("ssh read {} bytes", data.len());
                    self.received.extend(&data);
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    debug!("shell exited with status {}", exit_status);
                }
                Some(ChannelMsg::Eof | ChannelMsg::Close) | None => {
                    return Err(ConnectionError::Disconnected.into());
                }
                Some(_) => {}
            }
        }
    }

    async fn close(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(ConnectionError::Ssh)?;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.handle.is_closed()
    }
}

/// Host key check according to [`HostKeyVerification`].
struct HostKeyPolicy {
    host: String,
    port: u16,
    mode: HostKeyVerification,
    known_hosts: Option<PathBuf>,
    /// Why the key was refused, for `connect` to report.
    rejection: Arc<Mutex<Option<ConnectionError>>>,
}

impl HostKeyPolicy {
    fn new(config: &SshConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            mode: config.host_key_verification.clone(),
            known_hosts: config.known_hosts_path.clone(),
            rejection: Arc::new(Mutex::new(None)),
        }
    }

    /// `Ok(false)` when the host has no recorded key.
    fn is_known(&self, key: &PublicKey) -> std::result::Result<bool, ConnectionError> {
        let checked = match &self.known_hosts {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, key, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, key),
        };

        checked.map_err(|e| match e {
            russh::keys::Error::KeyChanged { line } => ConnectionError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            },
            other => ConnectionError::KnownHosts(other.to_string()),
        })
    }

    fn remember(&self, key: &PublicKey) {
        let learned = match &self.known_hosts {
            Some(path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, key, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, key),
        };

        match learned {
            Ok(()) => info!("learned host key for {}:{}", self.host, self.port),
            Err(e) => warn!("could not record host key for {}: {}", self.host, e),
        }
    }

    fn refuse(&self, error: ConnectionError) -> bool {
        warn!("refusing host key: {}", error);
        if let Ok(mut slot) = self.rejection.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for HostKeyPolicy {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        if matches!(self.mode, HostKeyVerification::Disabled) {
            return Ok(true);
        }

        let accepted = match self.is_known(server_public_key) {
            Ok(true) => true,
            Ok(false) if matches!(self.mode, HostKeyVerification::AcceptNew) => {
                self.remember(server_public_key);
                true
            }
            Ok(false) => self.refuse(ConnectionError::HostKeyUnknown {
                host: self.host.clone(),
                port: self.port,
            }),
            Err(e) => self.refuse(e),
        };

        Ok(accepted)
    }
}
