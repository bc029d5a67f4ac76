// # Netlink Operations Trait
//
// Defines the kernel link/address management capability the controller
// consumes. The controller never calls the operating system directly;
// this seam is what lets contract tests substitute a recording mock
// for the real rtnetlink transport.
//
// ## Implementations
//
// - rtnetlink-based (Linux): `linksync-netlink` crate
// - Recording mock: `linksync-core/tests/common`
//
// ## Usage
//
// ```rust,ignore
// use linksync_core::{FamilyFilter, NetlinkOps};
//
// async fn dump(ops: &dyn NetlinkOps) -> linksync_core::Result<()> {
//     for link in ops.link_list().await? {
//         for addr in ops.addr_list(&link, FamilyFilter::All).await? {
//             println!("{}: {}", link.name, addr);
//         }
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{FamilyFilter, LinkAddress, LinkInfo};

/// Kernel link/address management capability
///
/// Each operation can fail independently; implementations must surface
/// failures rather than retry, and must not cache link objects (link
/// indices can be reused after interface deletion/recreation).
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait NetlinkOps: Send + Sync {
    /// Enumerate all links known to the kernel
    async fn link_list(&self) -> Result<Vec<LinkInfo>>;

    /// Resolve a link by its kernel index
    ///
    /// Fails with [`crate::Error::LinkResolution`] when no such link
    /// exists.
    async fn link_by_index(&self, index: u32) -> Result<LinkInfo>;

    /// List the addresses currently assigned to a link, restricted to
    /// the given family filter
    async fn addr_list(&self, link: &LinkInfo, filter: FamilyFilter) -> Result<Vec<LinkAddress>>;

    /// Assign an address (label included) to a link
    async fn addr_add(&self, link: &LinkInfo, addr: &LinkAddress) -> Result<()>;

    /// Remove an address (label included) from a link
    async fn addr_del(&self, link: &LinkInfo, addr: &LinkAddress) -> Result<()>;
}
