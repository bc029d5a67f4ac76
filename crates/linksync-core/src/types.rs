//! Data model for links and link-bound addresses
//!
//! Links are owned by the kernel; the controller only holds transient
//! references resolved on demand (indices can be reused after an
//! interface is deleted and recreated, so caching a [`LinkInfo`] across
//! operations is never correct).

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    V4,
    V6,
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "IPv4"),
            IpFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Family filter for kernel address listings
///
/// Derived from the controller's enabled-family flags so that a
/// v4-only controller never inspects or affects v6 addresses, and
/// vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyFilter {
    V4,
    V6,
    All,
}

impl FamilyFilter {
    /// Whether an address of the given family passes this filter
    pub fn matches(&self, family: IpFamily) -> bool {
        match self {
            FamilyFilter::V4 => family == IpFamily::V4,
            FamilyFilter::V6 => family == IpFamily::V6,
            FamilyFilter::All => true,
        }
    }
}

/// One kernel network interface, resolved on demand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    /// Stable human identifier
    pub name: String,
    /// Kernel-assigned index, stable for the interface's lifetime
    pub index: u32,
}

impl LinkInfo {
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

/// One IP address/prefix bound (or to be bound) to a link
///
/// Two addresses are equal when IP, prefix length, link index, and
/// label all match. The label participates in equality on purpose:
/// an identical IP placed by another actor without our label must not
/// satisfy the controller's idempotence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAddress {
    /// The address itself
    pub ip: IpAddr,
    /// CIDR prefix length
    pub prefix_len: u8,
    /// Index of the link this address targets
    pub link_index: u32,
    /// Ownership tag; `None` for addresses we do not manage
    pub label: Option<String>,
}

impl LinkAddress {
    /// Create an unlabeled address bound to a link index
    pub fn new(ip: IpAddr, prefix_len: u8, link_index: u32) -> Self {
        Self {
            ip,
            prefix_len,
            link_index,
            label: None,
        }
    }

    /// Parse a CIDR string such as `"10.10.10.4/24"` into an address
    /// targeting the given link index
    pub fn parse(cidr: &str, link_index: u32) -> Result<Self> {
        let (ip_part, prefix_part) = cidr
            .split_once('/')
            .ok_or_else(|| Error::invalid_input(format!("missing prefix length in {cidr:?}")))?;

        let ip: IpAddr = ip_part
            .parse()
            .map_err(|e| Error::invalid_input(format!("bad IP in {cidr:?}: {e}")))?;
        let prefix_len: u8 = prefix_part
            .parse()
            .map_err(|e| Error::invalid_input(format!("bad prefix length in {cidr:?}: {e}")))?;

        let max_prefix = match ip {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max_prefix {
            return Err(Error::invalid_input(format!(
                "prefix length {prefix_len} out of range for {ip}"
            )));
        }

        Ok(Self::new(ip, prefix_len, link_index))
    }

    /// The address family, derived from the IP
    pub fn family(&self) -> IpFamily {
        match self.ip {
            IpAddr::V4(_) => IpFamily::V4,
            IpAddr::V6(_) => IpFamily::V6,
        }
    }

    /// Return a copy carrying the given ownership label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_len)
    }
}
