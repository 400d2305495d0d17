//! # EtherHaul
//!
//! Async CLI automation for Siklu EtherHaul radios.
//!
//! The crate opens an interactive SSH session to a device, runs `show` and
//! `set` commands, parses the human-oriented output into typed facts and
//! converges IP and route slots onto a desired state.
//!
//! ## Features
//!
//! - Async SSH sessions via russh, with a [`Transport`] trait for other streams
//! - Tail-searched prompt matching, ANSI stripping and pager handling
//! - Privilege navigation between exec, privileged and configuration phases
//! - Pure parsers for system, software, IP, route, inventory, RF,
//!   configuration and rollback output
//! - Idempotent reconciliation with per-item verification
//! - Rollback timer control as an explicit state machine
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::net::Ipv4Addr;
//!
//! use etherhaul::{ConfigItem, SessionBuilder, apply_config, gather_facts, FactSubset};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), etherhaul::Error> {
//!     let mut session = SessionBuilder::new("192.168.0.1")
//!         .username("admin")
//!         .password("admin")
//!         .connect()
//!         .await?;
//!
//!     let facts = gather_facts(&mut session, &[FactSubset::System]).await?;
//!     println!("{:?}", facts.system);
//!
//!     let outcome = apply_config(
//!         &mut session,
//!         &[ConfigItem::Ip {
//!             slot: 3,
//!             address: Ipv4Addr::new(192, 168, 1, 100),
//!             prefix_len: 24,
//!             vlan: 0,
//!         }],
//!     )
//!     .await?;
//!     println!("changed: {}", outcome.changed);
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod facts;
pub mod parse;
pub mod platform;
pub mod reconcile;
pub mod rollback;
pub mod transport;

// Re-export main types for convenience
pub use driver::{
    CommandResult, Driver, Session, SessionBuilder, SessionOptions, SessionState, execute_commands,
};
pub use error::{Error, ParseError, Result, ValidationError};
pub use facts::{DeviceInfo, FactSubset, FactsBundle, device_info, gather_facts, save_config};
pub use platform::{Phase, PlatformDefinition, PrivilegeLevel};
pub use reconcile::{
    ApplyOutcome, ConfigItem, ItemOutcome, ShowQuery, ShowReport, ShowTable, VerificationError,
    apply_config, show_tables,
};
pub use rollback::{
    RollbackController, RollbackOutcome, RollbackRequest, RollbackState, set_rollback,
};
pub use transport::{AuthMethod, SshConfig, SshTransport, Transport};
