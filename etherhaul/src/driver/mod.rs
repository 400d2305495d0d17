//! Session lifecycle and command execution.
//!
//! The driver layer provides the main API for sending commands and
//! moving between CLI phases on a device. [`Session`] is the concrete
//! driver; the reconciliation, rollback and fact modules only depend on
//! the [`Driver`] trait, so they can be exercised against a scripted device.

mod builder;
mod executor;
mod privilege;
mod response;
mod session;

pub use builder::SessionBuilder;
pub use executor::execute_commands;
pub use privilege::{PrivilegeManager, Transition};
pub use response::CommandResult;
pub use session::{Session, SessionOptions, SessionState};

use std::future::Future;

use crate::error::Result;
use crate::platform::{Phase, PlatformDefinition};

/// Trait for device drivers.
pub trait Driver: Send {
    /// Send a command and wait for the prompt.
    ///
    /// A device-reported error is not an `Err`: it comes back as a
    /// [`CommandResult`] whose `failure_message` is set. `Err` means the
    /// command's outcome is unknown (timeout, lost transport, closed session).
    fn send_command(&mut self, command: &str)
    -> impl Future<Output = Result<CommandResult>> + Send;

    /// Move the CLI to the given phase.
    fn acquire_phase(&mut self, phase: Phase) -> impl Future<Output = Result<()>> + Send;

    /// Log out and close the connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Get the current phase.
    fn current_phase(&self) -> Option<Phase>;

    /// The platform definition this driver speaks.
    fn platform(&self) -> &PlatformDefinition;

    /// Check if the driver is ready for commands.
    fn is_open(&self) -> bool;

    /// Check if the underlying connection is still alive.
    ///
    /// Returns `false` once the driver is not open, or when the transport
    /// reports the peer went away. Use this before reusing a session after
    /// an idle period.
    fn is_alive(&self) -> bool;
}
