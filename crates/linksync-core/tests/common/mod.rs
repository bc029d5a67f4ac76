//! Test doubles and common utilities for controller contract tests
//!
//! Provides a recording mock of the `NetlinkOps` capability with
//! canned links/addresses, call counters, and injectable failures.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use linksync_core::error::{Error, Result};
use linksync_core::{FamilyFilter, LinkAddress, LinkInfo, NetlinkOps, assigned_address_label};

/// A mock NetlinkOps that records calls and serves canned state
///
/// `addr_add`/`addr_del` mutate the mock's live address map, so a
/// controller driving it observes the same convergence it would get
/// from a real kernel.
pub struct MockNetlink {
    links: Mutex<Vec<LinkInfo>>,
    addrs: Mutex<HashMap<u32, Vec<LinkAddress>>>,

    link_list_calls: AtomicUsize,
    addr_list_calls: AtomicUsize,
    addr_add_calls: Mutex<Vec<(LinkInfo, LinkAddress)>>,
    addr_del_calls: Mutex<Vec<(LinkInfo, LinkAddress)>>,

    fail_addr_list: AtomicBool,
    fail_addr_add: AtomicBool,
    fail_addr_del: AtomicBool,
}

impl MockNetlink {
    pub fn new() -> Self {
        Self {
            links: Mutex::new(Vec::new()),
            addrs: Mutex::new(HashMap::new()),
            link_list_calls: AtomicUsize::new(0),
            addr_list_calls: AtomicUsize::new(0),
            addr_add_calls: Mutex::new(Vec::new()),
            addr_del_calls: Mutex::new(Vec::new()),
            fail_addr_list: AtomicBool::new(false),
            fail_addr_add: AtomicBool::new(false),
            fail_addr_del: AtomicBool::new(false),
        }
    }

    /// Add a canned link
    pub fn with_link(self, name: &str, index: u32) -> Self {
        self.links.lock().unwrap().push(LinkInfo::new(name, index));
        self
    }

    /// Seed the live address set of a link
    pub fn set_live_addrs(&self, index: u32, addrs: Vec<LinkAddress>) {
        self.addrs.lock().unwrap().insert(index, addrs);
    }

    /// Live addresses currently held for a link
    pub fn live_addrs(&self, index: u32) -> Vec<LinkAddress> {
        self.addrs
            .lock()
            .unwrap()
            .get(&index)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_addr_list(&self, fail: bool) {
        self.fail_addr_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_addr_add(&self, fail: bool) {
        self.fail_addr_add.store(fail, Ordering::SeqCst);
    }

    pub fn fail_addr_del(&self, fail: bool) {
        self.fail_addr_del.store(fail, Ordering::SeqCst);
    }

    /// Number of times addr_add was invoked
    pub fn addr_add_count(&self) -> usize {
        self.addr_add_calls.lock().unwrap().len()
    }

    /// Number of times addr_del was invoked
    pub fn addr_del_count(&self) -> usize {
        self.addr_del_calls.lock().unwrap().len()
    }

    /// Recorded (link, address) arguments of every addr_add call
    pub fn addr_add_calls(&self) -> Vec<(LinkInfo, LinkAddress)> {
        self.addr_add_calls.lock().unwrap().clone()
    }

    /// Recorded (link, address) arguments of every addr_del call
    pub fn addr_del_calls(&self) -> Vec<(LinkInfo, LinkAddress)> {
        self.addr_del_calls.lock().unwrap().clone()
    }

    pub fn link_list_count(&self) -> usize {
        self.link_list_calls.load(Ordering::SeqCst)
    }

    pub fn addr_list_count(&self) -> usize {
        self.addr_list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetlinkOps for MockNetlink {
    async fn link_list(&self) -> Result<Vec<LinkInfo>> {
        self.link_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.links.lock().unwrap().clone())
    }

    async fn link_by_index(&self, index: u32) -> Result<LinkInfo> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.index == index)
            .cloned()
            .ok_or_else(|| Error::link_resolution(index, "no such link"))
    }

    async fn addr_list(&self, link: &LinkInfo, filter: FamilyFilter) -> Result<Vec<LinkAddress>> {
        self.addr_list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_addr_list.load(Ordering::SeqCst) {
            return Err(Error::kernel("addr_list", &link.name, "injected failure"));
        }
        Ok(self
            .live_addrs(link.index)
            .into_iter()
            .filter(|a| filter.matches(a.family()))
            .collect())
    }

    async fn addr_add(&self, link: &LinkInfo, addr: &LinkAddress) -> Result<()> {
        if self.fail_addr_add.load(Ordering::SeqCst) {
            return Err(Error::kernel("addr_add", &link.name, "injected failure"));
        }
        self.addr_add_calls
            .lock()
            .unwrap()
            .push((link.clone(), addr.clone()));
        let mut addrs = self.addrs.lock().unwrap();
        let entry = addrs.entry(link.index).or_default();
        if !entry.contains(addr) {
            entry.push(addr.clone());
        }
        Ok(())
    }

    async fn addr_del(&self, link: &LinkInfo, addr: &LinkAddress) -> Result<()> {
        if self.fail_addr_del.load(Ordering::SeqCst) {
            return Err(Error::kernel("addr_del", &link.name, "injected failure"));
        }
        self.addr_del_calls
            .lock()
            .unwrap()
            .push((link.clone(), addr.clone()));
        if let Some(entry) = self.addrs.lock().unwrap().get_mut(&link.index) {
            entry.retain(|a| a != addr);
        }
        Ok(())
    }
}

/// Build a controller named "test" over the given mock
pub fn new_controller(
    ipv4_enabled: bool,
    ipv6_enabled: bool,
    netlink: std::sync::Arc<MockNetlink>,
) -> (
    linksync_core::Controller,
    tokio::sync::mpsc::Receiver<linksync_core::ControllerEvent>,
) {
    let config = linksync_core::ControllerConfig::new("test", ipv4_enabled, ipv6_enabled);
    linksync_core::Controller::new(config, netlink).expect("controller construction succeeds")
}

/// An unlabeled address bound to a link index
pub fn addr(cidr: &str, link_index: u32) -> LinkAddress {
    LinkAddress::parse(cidr, link_index).expect("valid CIDR")
}

/// An address carrying the controller's ownership label for a link
pub fn labeled_addr(cidr: &str, link_name: &str, link_index: u32) -> LinkAddress {
    addr(cidr, link_index).with_label(assigned_address_label(link_name))
}
