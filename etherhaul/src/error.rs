//! Error types for etherhaul.

use std::io;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::parse::Shape;

/// Everything an operation against a radio can fail with.
#[derive(Error, Debug)]
pub enum Error {
    /// The session could not be opened or was lost.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// No prompt or recognized terminal marker within the allotted time.
    ///
    /// The session must be treated as unusable afterwards.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The session is not in a state to run the request.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The device explicitly rejected a command whose success was required.
    #[error("Device rejected '{command}': {message}")]
    DeviceCommand { command: String, message: String },

    /// Output did not have the shape of the requested fact.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Caller-supplied input violated a constraint; nothing was sent.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The platform definition is unusable.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl Error {
    /// Whether the session that produced this error can still be used.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Timeout(_))
    }
}

/// Reaching, authenticating to or staying connected to the radio.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// TCP connect or SSH handshake did not complete.
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// The private key could not be loaded.
    #[error("SSH key error: {0}")]
    Key(String),

    /// known_hosts records a different key for this radio.
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    #[error("Failed to open shell channel")]
    ShellRequestFailed,

    /// Logged in, but the CLI never printed a prompt.
    #[error("No prompt received within {0:?} after login")]
    NoPrompt(Duration),

    /// The radio closed the connection.
    #[error("Connection disconnected")]
    Disconnected,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Session lifecycle and level navigation.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Closed, or never opened.
    #[error("Session not connected")]
    NotConnected,

    /// A previous command never completed; the session must be reopened
    #[error("Session unusable after an incomplete command - reopen it")]
    Unusable,

    /// After navigating, the prompt was not the target level's.
    #[error("Failed to acquire phase '{target}'")]
    PhaseAcquisitionFailed { target: String },

    #[error("Platform has no privilege level for phase '{phase}'")]
    NoLevelForPhase { phase: String },

    #[error("Unknown privilege level from prompt: '{prompt}'")]
    UnknownPrivilege { prompt: String },

    #[error("No path from privilege '{from}' to '{to}'")]
    NoPrivilegePath { from: String, to: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// A platform definition that cannot drive a session.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Output could not be interpreted as the expected shape.
///
/// The raw text is retained so callers can diagnose what the device printed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("expected {shape} output: {reason}")]
pub struct ParseError {
    /// The output shape that was expected.
    pub shape: Shape,
    /// Why the text was rejected.
    pub reason: String,
    /// The text that was rejected.
    pub raw: String,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(shape: Shape, reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            shape,
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}

/// Desired-state or argument validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Slot numbers start at 1
    #[error("item {index}: invalid slot {slot} (must be a positive integer)")]
    InvalidSlot { index: usize, slot: u32 },

    /// Prefix length outside 0..=32
    #[error("item {index}: invalid prefix length {prefix_len} (must be 0-32)")]
    InvalidPrefixLen { index: usize, prefix_len: u8 },

    /// VLAN outside 0..=4094
    #[error("item {index}: invalid VLAN id {vlan} (must be 0-4094)")]
    InvalidVlan { index: usize, vlan: u16 },

    /// Rollback timeout outside 0..=86400
    #[error("rollback timeout {0} out of range (must be 0-86400 seconds)")]
    RollbackTimeout(u64),

    /// Rollback requested present without a timeout
    #[error("rollback timeout is required when state is present")]
    MissingRollbackTimeout,

    /// Unknown fact subset name
    #[error("unknown fact subset '{0}'")]
    UnknownSubset(String),
}

/// Result alias over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
