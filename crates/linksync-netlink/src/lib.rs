// # rtnetlink capability
//
// Linux implementation of the `NetlinkOps` capability over rtnetlink.
//
// One persistent netlink connection per instance; the connection
// future is spawned onto the tokio runtime and kept alive for the
// lifetime of the handle.
//
// ## Label caveat
//
// The kernel only supports address labels for IPv4 (IFA_LABEL); v6
// listings come back unlabeled. A controller managing v6 addresses on
// a real kernel may therefore re-issue an add for an address that is
// already applied — the duplicate is absorbed below by treating the
// kernel's "File exists" rejection as success.
//
// ## Platform Support
//
// This crate only does real work on Linux; elsewhere construction
// fails with a configuration error, mirroring the capability being
// absent.

use async_trait::async_trait;

use linksync_core::{Error, FamilyFilter, LinkAddress, LinkInfo, NetlinkOps, Result};

#[cfg(target_os = "linux")]
use futures::TryStreamExt;

#[cfg(target_os = "linux")]
use linksync_core::IpFamily;

#[cfg(target_os = "linux")]
use netlink_packet_route::AddressFamily;

#[cfg(target_os = "linux")]
use netlink_packet_route::address::{AddressAttribute, AddressMessage};

#[cfg(target_os = "linux")]
use netlink_packet_route::link::LinkAttribute;

#[cfg(target_os = "linux")]
use std::net::IpAddr;

#[cfg(target_os = "linux")]
use tracing::debug;

/// rtnetlink-backed kernel capability
///
/// Wraps one persistent rtnetlink handle for all link/address
/// operations.
pub struct RtnetlinkOps {
    #[cfg(target_os = "linux")]
    handle: rtnetlink::Handle,
    // Keep the connection task alive
    #[cfg(target_os = "linux")]
    _conn_task: tokio::task::JoinHandle<()>,
}

#[cfg(target_os = "linux")]
impl RtnetlinkOps {
    /// Open a persistent netlink connection
    ///
    /// Must be called from within a tokio runtime; the connection
    /// future is spawned onto it.
    pub fn new() -> Result<Self> {
        let (conn, handle, _) = rtnetlink::new_connection()
            .map_err(|e| Error::kernel("connect", "netlink", e.to_string()))?;
        let conn_task = tokio::spawn(conn);
        Ok(Self {
            handle,
            _conn_task: conn_task,
        })
    }

    fn family_of(header_family: AddressFamily) -> Option<IpFamily> {
        match header_family {
            AddressFamily::Inet => Some(IpFamily::V4),
            AddressFamily::Inet6 => Some(IpFamily::V6),
            _ => None,
        }
    }
}

#[cfg(target_os = "linux")]
#[async_trait]
impl NetlinkOps for RtnetlinkOps {
    async fn link_list(&self) -> Result<Vec<LinkInfo>> {
        let mut links = Vec::new();
        let mut response = self.handle.link().get().execute();
        loop {
            let msg = match response.try_next().await {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(e) => return Err(Error::kernel("link_list", "all", e.to_string())),
            };
            let name = msg.attributes.iter().find_map(|attr| match attr {
                LinkAttribute::IfName(name) => Some(name.clone()),
                _ => None,
            });
            // Nameless links are of no use to the controller
            if let Some(name) = name {
                links.push(LinkInfo::new(name, msg.header.index));
            }
        }
        Ok(links)
    }

    async fn link_by_index(&self, index: u32) -> Result<LinkInfo> {
        let mut response = self.handle.link().get().match_index(index).execute();
        match response.try_next().await {
            Ok(Some(msg)) => {
                let name = msg
                    .attributes
                    .iter()
                    .find_map(|attr| match attr {
                        LinkAttribute::IfName(name) => Some(name.clone()),
                        _ => None,
                    })
                    .ok_or_else(|| Error::link_resolution(index, "link has no name"))?;
                Ok(LinkInfo::new(name, msg.header.index))
            }
            Ok(None) => Err(Error::link_resolution(index, "no such link")),
            Err(e) => {
                // rtnetlink surfaces "not found" as an error on some kernels
                if e.to_string().contains("No such device") {
                    Err(Error::link_resolution(index, e.to_string()))
                } else {
                    Err(Error::kernel("link_by_index", index.to_string(), e.to_string()))
                }
            }
        }
    }

    async fn addr_list(&self, link: &LinkInfo, filter: FamilyFilter) -> Result<Vec<LinkAddress>> {
        let mut addrs = Vec::new();
        let mut response = self
            .handle
            .address()
            .get()
            .set_link_index_filter(link.index)
            .execute();
        loop {
            let msg = match response.try_next().await {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(e) => return Err(Error::kernel("addr_list", &link.name, e.to_string())),
            };

            let Some(family) = Self::family_of(msg.header.family) else {
                continue;
            };
            if !filter.matches(family) {
                continue;
            }

            let mut local: Option<IpAddr> = None;
            let mut address: Option<IpAddr> = None;
            let mut label: Option<String> = None;
            for attr in &msg.attributes {
                match attr {
                    AddressAttribute::Local(ip) => local = Some(*ip),
                    AddressAttribute::Address(ip) => address = Some(*ip),
                    AddressAttribute::Label(l) => label = Some(l.clone()),
                    _ => {}
                }
            }
            // IFA_LOCAL carries the interface address for IPv4;
            // IFA_ADDRESS is the peer (identical outside point-to-point)
            let Some(ip) = local.or(address) else {
                continue;
            };

            let mut addr = LinkAddress::new(ip, msg.header.prefix_len, link.index);
            addr.label = label;
            addrs.push(addr);
        }
        Ok(addrs)
    }

    async fn addr_add(&self, link: &LinkInfo, addr: &LinkAddress) -> Result<()> {
        let mut req = self
            .handle
            .address()
            .add(link.index, addr.ip, addr.prefix_len);
        if let (Some(label), IpAddr::V4(_)) = (&addr.label, addr.ip) {
            req.message_mut()
                .attributes
                .push(AddressAttribute::Label(label.clone()));
        }
        match req.execute().await {
            Ok(()) => Ok(()),
            // Already assigned: fine, the end state is what we wanted
            Err(e) if e.to_string().contains("File exists") => {
                debug!("address {} already present on {}", addr, link.name);
                Ok(())
            }
            Err(e) => Err(Error::kernel("addr_add", &link.name, e.to_string())),
        }
    }

    async fn addr_del(&self, link: &LinkInfo, addr: &LinkAddress) -> Result<()> {
        let mut message = AddressMessage::default();
        message.header.index = link.index;
        message.header.prefix_len = addr.prefix_len;
        message.header.family = match addr.family() {
            IpFamily::V4 => AddressFamily::Inet,
            IpFamily::V6 => AddressFamily::Inet6,
        };
        message.attributes.push(AddressAttribute::Address(addr.ip));
        if let IpAddr::V4(_) = addr.ip {
            message.attributes.push(AddressAttribute::Local(addr.ip));
            if let Some(label) = &addr.label {
                message
                    .attributes
                    .push(AddressAttribute::Label(label.clone()));
            }
        }

        match self.handle.address().del(message).execute().await {
            Ok(()) => Ok(()),
            // Already gone: fine, the end state is what we wanted
            Err(e) if e.to_string().contains("No such") => {
                debug!("address {} already absent from {}", addr, link.name);
                Ok(())
            }
            Err(e) => Err(Error::kernel("addr_del", &link.name, e.to_string())),
        }
    }
}

#[cfg(not(target_os = "linux"))]
impl RtnetlinkOps {
    pub fn new() -> Result<Self> {
        Err(Error::config("linksync-netlink is only supported on Linux"))
    }

    fn unsupported<T>() -> Result<T> {
        Err(Error::config("linksync-netlink is only supported on Linux"))
    }
}

// Unreachable in practice (construction fails off-Linux); exists so the
// capability type is usable as a trait object on every platform.
#[cfg(not(target_os = "linux"))]
#[async_trait]
impl NetlinkOps for RtnetlinkOps {
    async fn link_list(&self) -> Result<Vec<LinkInfo>> {
        Self::unsupported()
    }

    async fn link_by_index(&self, _index: u32) -> Result<LinkInfo> {
        Self::unsupported()
    }

    async fn addr_list(&self, _link: &LinkInfo, _filter: FamilyFilter) -> Result<Vec<LinkAddress>> {
        Self::unsupported()
    }

    async fn addr_add(&self, _link: &LinkInfo, _addr: &LinkAddress) -> Result<()> {
        Self::unsupported()
    }

    async fn addr_del(&self, _link: &LinkInfo, _addr: &LinkAddress) -> Result<()> {
        Self::unsupported()
    }
}
