//! Transport boundary and the SSH implementation.
//!
//! The session layer only needs a byte stream it can write lines to and
//! read from until a pattern shows up. [`Transport`] is that contract;
//! [`SshTransport`] provides it over an interactive SSH shell.

pub mod config;
mod ssh;

use std::future::Future;
use std::time::Duration;

use regex::bytes::Regex;

use crate::error::Result;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::SshTransport;

/// An already-authenticated interactive byte stream.
///
/// Implementations must not interpret the data; prompt recognition,
/// echo stripping and error classification belong to the session.
pub trait Transport: Send {
    /// Write raw bytes to the shell.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Read until `pattern` matches the tail of the received data.
    ///
    /// Returns everything received up to and including the match. Fails with
    /// [`Error::Timeout`](crate::Error::Timeout) when nothing matches in time
    /// and with [`ConnectionError::Disconnected`](crate::error::ConnectionError::Disconnected)
    /// when the peer goes away.
    fn read_until(
        &mut self,
        pattern: &Regex,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Close the stream.
    fn close(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;

    /// Whether the underlying connection still looks alive.
    fn is_alive(&self) -> bool {
        true
    }
}
