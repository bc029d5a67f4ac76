//! Capability traits the controller depends on
//!
//! - [`NetlinkOps`]: the kernel link/address management interface

pub mod netlink;

pub use netlink::NetlinkOps;
