//! Built-in platform definitions.

pub mod etherhaul;
