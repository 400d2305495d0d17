//! Platform definitions.
//!
//! A platform describes a device family's CLI: prompt patterns per privilege
//! level, the error signatures that mark a rejected command, pagination
//! handling and logout. Everything is data, so firmware differences are
//! handled by adjusting a definition rather than code.

mod definition;
mod privilege_level;
pub mod vendors;

pub use definition::{Pager, PlatformDefinition};
pub use privilege_level::{Phase, PrivilegeLevel};
