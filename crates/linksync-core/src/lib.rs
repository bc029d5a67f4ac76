// # linksync-core
//
// Core library for the per-node link address reconciliation controller.
//
// ## Architecture Overview
//
// This library keeps a set of IP addresses assigned to Linux network
// interfaces in sync with what callers ask for:
// - **NetlinkOps**: Trait abstracting the kernel link/address interface
// - **Controller**: Reconciles desired addresses against live kernel state
// - **AddressStore**: In-memory record of addresses the controller owns
// - **Label scheme**: Ownership tag that separates controller-managed
//   addresses from addresses placed by other actors on the same link
//
// ## Design Principles
//
// 1. **Kernel truth first**: Live kernel state is consulted before every
//    mutation; the store is a cache of belief, never the authority
// 2. **Idempotency**: Repeating an operation never issues a redundant
//    kernel call and always converges to the same store state
// 3. **Ownership isolation**: Addresses without this controller's label
//    are never touched
// 4. **Injected transport**: No direct syscalls; the kernel interface is
//    a capability supplied at construction, substitutable in tests

pub mod config;
pub mod controller;
pub mod error;
pub mod label;
pub mod store;
pub mod traits;
pub mod types;

// Re-export core types for convenience
pub use config::ControllerConfig;
pub use controller::{Controller, ControllerEvent};
pub use error::{Error, Result};
pub use label::assigned_address_label;
pub use store::AddressStore;
pub use traits::NetlinkOps;
pub use types::{FamilyFilter, IpFamily, LinkAddress, LinkInfo};
