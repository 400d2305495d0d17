//! Builder for opening sessions.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::session::{Session, SessionOptions};
use crate::error::{Result, SessionError};
use crate::platform::PlatformDefinition;
use crate::platform::vendors::etherhaul;
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig, SshTransport, Transport};

/// Builder for constructing device sessions.
///
/// # Example
///
/// ```rust,no_run
/// use etherhaul::driver::SessionBuilder;
///
/// # async fn example() -> Result<(), etherhaul::Error> {
/// let mut session = SessionBuilder::new("192.168.0.1")
///     .username("admin")
///     .password("admin")
///     .connect()
///     .await?;
///
/// let result = session.send_command("show system").await?;
/// println!("{}", result.result);
///
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    platform: Option<PlatformDefinition>,
    timeout: Duration,
    command_timeout: Duration,
    enable_secret: Option<SecretString>,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    terminal_width: u32,
    terminal_height: u32,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            platform: None,
            timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(30),
            enable_secret: None,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        };
        self
    }

    /// Use a custom platform definition instead of the EtherHaul default.
    pub fn platform(mut self, platform: PlatformDefinition) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Set the connection and first-prompt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the per-command read timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the secret sent when entering privileged mode.
    pub fn enable_secret(mut self, secret: impl Into<String>) -> Self {
        self.enable_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Connect over SSH and open the session.
    pub async fn connect(self) -> Result<Session<SshTransport>> {
        let username = self.username.clone().ok_or_else(|| SessionError::InvalidConfig {
            message: "username is required".to_string(),
        })?;

        let mut ssh_config = SshConfig::new(self.host.clone(), username);
        ssh_config.port = self.port;
        ssh_config.timeout = self.timeout;
        ssh_config.terminal_width = self.terminal_width;
        ssh_config.terminal_height = self.terminal_height;
        ssh_config.host_key_verification = self.host_key_verification.clone();
        ssh_config.known_hosts_path = self.known_hosts_path.clone();

        let (auth, builder) = self.take_auth();
        ssh_config.auth = auth;

        let transport = SshTransport::connect(&ssh_config).await?;
        builder.open_with(transport).await
    }

    /// Open the session over an already-connected transport.
    pub async fn open_with<T: Transport>(self, transport: T) -> Result<Session<T>> {
        let platform = match self.platform {
            Some(platform) => platform,
            None => etherhaul::platform()?,
        };

        let options = SessionOptions {
            open_timeout: self.timeout,
            command_timeout: self.command_timeout,
            enable_secret: self.enable_secret,
        };

        Session::open(transport, platform, options).await
    }

    fn take_auth(mut self) -> (AuthMethod, Self) {
        let auth = std::mem::replace(&mut self.auth, AuthMethod::None);
        (auth, self)
    }
}
