//! Connection settings for [`SshTransport`](super::SshTransport).

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::channel::DEFAULT_SEARCH_DEPTH;

/// What to do with the radio's host key, after OpenSSH's
/// `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Only hosts already in known_hosts are accepted.
    Strict,

    /// Unknown hosts are recorded on first contact; changed keys are refused.
    #[default]
    AcceptNew,

    /// Any key is accepted. Radios that are factory reset regenerate their
    /// key, so this is common on a staging bench.
    Disabled,
}

/// Credentials for the login.
#[derive(Debug)]
pub enum AuthMethod {
    /// `none` authentication; EH firmware rejects it, but lab simulators
    /// accept it.
    None,

    Password(SecretString),

    PrivateKey {
        path: PathBuf,
        passphrase: Option<SecretString>,
    },
}

/// Where and how to reach one radio.
#[derive(Debug)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: AuthMethod,

    /// Limit on TCP connect plus SSH handshake.
    pub timeout: Duration,

    /// PTY size. A wide terminal keeps the radio from wrapping long
    /// `show` lines.
    pub terminal_width: u32,
    pub terminal_height: u32,

    /// Bytes searched from the end of received output for a prompt.
    pub search_depth: usize,

    pub host_key_verification: HostKeyVerification,

    /// known_hosts file; `~/.ssh/known_hosts` when unset.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            auth: AuthMethod::None,
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            search_depth: DEFAULT_SEARCH_DEPTH,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// `host:port`, for logging.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
