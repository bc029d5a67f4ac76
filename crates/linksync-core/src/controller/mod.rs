//! Reconciliation controller
//!
//! The Controller is responsible for:
//! - Gating operations on the enabled address families
//! - Consulting live kernel state before every mutation
//! - Issuing the minimal netlink mutation needed to converge
//! - Recording confirmed state transitions in the managed-address store
//!
//! ## Architecture
//!
//! ```text
//! caller ── add_address / del_address ──┐
//!                                       ▼
//!                               ┌──────────────┐
//!                               │  Controller  │
//!                               └──────────────┘
//!                                       │
//!                 ┌─────────────────────┼─────────────────────┐
//!                 ▼                     ▼                     ▼
//!         ┌──────────────┐     ┌──────────────┐       ┌─────────────┐
//!         │ NetlinkOps   │     │ AddressStore │       │   Events    │
//!         │ (kernel)     │     │ (belief)     │       │  (notify)   │
//!         └──────────────┘     └──────────────┘       └─────────────┘
//! ```
//!
//! ## Operation Flow
//!
//! 1. Family gate (fail fast, nothing touched)
//! 2. Resolve the target link by index
//! 3. List live kernel addresses, restricted to enabled families
//! 4. Compare against the label-stamped expected address
//! 5. Mutate the kernel only if needed
//! 6. Record the outcome in the store
//!
//! The store lock is held across steps 3-6; the idempotence guarantee
//! depends on no interleaving between the check and the mutation for
//! the same link.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::label::assigned_address_label;
use crate::store::AddressStore;
use crate::traits::NetlinkOps;
use crate::types::{FamilyFilter, IpFamily, LinkAddress, LinkInfo};

/// Events emitted by the Controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Controller loop started
    Started {
        name: String,
    },

    /// Store re-derived from a fresh kernel listing
    SyncCompleted {
        links: usize,
        addresses: usize,
    },

    /// Address assigned to a link via the kernel
    AddressApplied {
        link: String,
        address: LinkAddress,
    },

    /// Desired address was already live; no kernel call issued
    ApplySkipped {
        link: String,
        address: LinkAddress,
    },

    /// Address removed from a link via the kernel
    AddressRemoved {
        link: String,
        address: LinkAddress,
    },

    /// A reconcile pass failed to reapply a drifted address
    ReconcileFailed {
        link: String,
        address: LinkAddress,
        error: String,
    },

    /// Controller loop stopped
    Stopped {
        reason: String,
    },
}

/// Which end state an operation drives the kernel toward
enum Ensure {
    Present,
    Absent,
}

/// Per-node address reconciliation controller
///
/// Keeps controller-owned addresses on links converged with what
/// callers ask for, without disturbing addresses placed by other
/// actors and without issuing redundant kernel calls.
///
/// ## Lifecycle
///
/// 1. Create with [`Controller::new()`]
/// 2. Either drive it directly via [`add_address`](Controller::add_address) /
///    [`del_address`](Controller::del_address), or start the periodic
///    loop with [`run`](Controller::run) (which performs an initial
///    [`sync`](Controller::sync) and then repairs drift on a timer)
///
/// ## Threading
///
/// All operations serialize on an internal store mutex; concurrent
/// callers are safe against a single instance. At most one controller
/// may manage a given link's owned-address namespace at a time.
pub struct Controller {
    /// Controller name, for logging context only
    name: String,

    /// Whether IPv4 addresses are managed
    ipv4_enabled: bool,

    /// Whether IPv6 addresses are managed
    ipv6_enabled: bool,

    /// Interval between periodic reconcile passes
    reconcile_interval: Duration,

    /// Kernel link/address capability
    netlink: Arc<dyn NetlinkOps>,

    /// Record of addresses we believe we have applied
    store: Mutex<AddressStore>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ControllerEvent>,
}

impl Controller {
    /// Create a new controller
    ///
    /// # Returns
    ///
    /// A tuple of (controller, event_receiver) where event_receiver
    /// yields [`ControllerEvent`]s. Dropping the receiver is harmless;
    /// events are purely observational.
    pub fn new(
        config: ControllerConfig,
        netlink: Arc<dyn NetlinkOps>,
    ) -> Result<(Self, mpsc::Receiver<ControllerEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let controller = Self {
            name: config.name,
            ipv4_enabled: config.ipv4_enabled,
            ipv6_enabled: config.ipv6_enabled,
            reconcile_interval: Duration::from_secs(config.reconcile_interval_secs),
            netlink,
            store: Mutex::new(AddressStore::new()),
            event_tx: tx,
        };

        Ok((controller, rx))
    }

    /// Controller name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ensure an address is assigned to its target link
    ///
    /// Repeated calls with an identical address are safe: at most one
    /// kernel mutation occurs across any number of repetitions, and
    /// the store ends up identical regardless of the repeat count.
    pub async fn add_address(&self, addr: LinkAddress) -> Result<()> {
        self.ensure(addr, Ensure::Present).await
    }

    /// Ensure an address is absent from its target link
    ///
    /// Deleting an address that is not currently applied succeeds as a
    /// kernel no-op while still normalizing the store to absence.
    pub async fn del_address(&self, addr: LinkAddress) -> Result<()> {
        self.ensure(addr, Ensure::Absent).await
    }

    /// Shared drive-toward-end-state routine behind both operations
    ///
    /// The two operations are mirror images; keeping the drift
    /// detection in one place keeps their semantics symmetric.
    async fn ensure(&self, addr: LinkAddress, want: Ensure) -> Result<()> {
        let family = addr.family();
        if !self.family_enabled(family) {
            return Err(Error::family_disabled(family));
        }

        let link = self.netlink.link_by_index(addr.link_index).await?;

        // Lock before listing: the check and the mutation must not
        // interleave with another operation on the same store.
        let mut store = self.store.lock().await;

        let live = self.live_addresses().await?;
        let expected = addr.with_label(assigned_address_label(&link.name));
        let applied = live
            .get(&link.index)
            .is_some_and(|addrs| addrs.contains(&expected));

        match want {
            Ensure::Present => {
                if applied {
                    debug!(
                        "[{}] address {} already applied to {}, skipping kernel add",
                        self.name, expected, link.name
                    );
                    self.emit_event(ControllerEvent::ApplySkipped {
                        link: link.name.clone(),
                        address: expected.clone(),
                    });
                } else {
                    self.netlink.addr_add(&link, &expected).await?;
                    info!("[{}] assigned {} to {}", self.name, expected, link.name);
                    self.emit_event(ControllerEvent::AddressApplied {
                        link: link.name.clone(),
                        address: expected.clone(),
                    });
                }
                store.insert(&link.name, expected);
            }
            Ensure::Absent => {
                if applied {
                    self.netlink.addr_del(&link, &expected).await?;
                    info!("[{}] removed {} from {}", self.name, expected, link.name);
                    self.emit_event(ControllerEvent::AddressRemoved {
                        link: link.name.clone(),
                        address: expected.clone(),
                    });
                } else {
                    debug!(
                        "[{}] address {} not applied to {}, nothing to remove",
                        self.name, expected, link.name
                    );
                }
                // The store must never assert presence of an address
                // that has been told to go away, kernel call or not.
                store.remove(&link.name, &expected);
            }
        }

        Ok(())
    }

    /// Re-derive the store from a fresh kernel listing
    ///
    /// Adopts exactly those live addresses whose label matches this
    /// controller's label for their link; everything else belongs to
    /// other actors. Replaces any prior store contents. Called once at
    /// startup by [`run`](Controller::run); also the recovery path
    /// after a restart, since nothing is persisted.
    pub async fn sync(&self) -> Result<()> {
        let mut store = self.store.lock().await;

        let snapshot = self.kernel_snapshot().await?;
        let mut fresh = AddressStore::new();
        let mut adopted = 0;
        for (link, addrs) in &snapshot {
            let label = assigned_address_label(&link.name);
            for addr in addrs {
                if addr.label.as_deref() == Some(label.as_str()) {
                    fresh.insert(&link.name, addr.clone());
                    adopted += 1;
                }
            }
        }

        info!(
            "[{}] store synced from kernel: {} link(s), {} owned address(es)",
            self.name,
            fresh.len(),
            adopted
        );
        self.emit_event(ControllerEvent::SyncCompleted {
            links: fresh.len(),
            addresses: adopted,
        });
        *store = fresh;

        Ok(())
    }

    /// One drift-repair pass
    ///
    /// Re-applies every store address missing from the live kernel
    /// listing of its link. Per-address failures are logged and
    /// skipped; the next pass retries them. Errors enumerating kernel
    /// state abort the pass.
    pub async fn reconcile(&self) -> Result<()> {
        let store = self.store.lock().await;

        let snapshot = self.kernel_snapshot().await?;
        let by_name: HashMap<&str, (&LinkInfo, &Vec<LinkAddress>)> = snapshot
            .iter()
            .map(|(link, addrs)| (link.name.as_str(), (link, addrs)))
            .collect();

        for (link_name, addrs) in store.entries() {
            let Some((link, live)) = by_name.get(link_name.as_str()) else {
                warn!(
                    "[{}] link {} missing from kernel listing, keeping its addresses for the next pass",
                    self.name, link_name
                );
                continue;
            };

            for addr in addrs {
                if live.contains(&addr) {
                    continue;
                }
                match self.netlink.addr_add(link, &addr).await {
                    Ok(()) => {
                        info!(
                            "[{}] reapplied drifted address {} to {}",
                            self.name, addr, link_name
                        );
                        self.emit_event(ControllerEvent::AddressApplied {
                            link: link_name.clone(),
                            address: addr.clone(),
                        });
                    }
                    Err(e) => {
                        warn!(
                            "[{}] failed to reapply {} to {}: {}",
                            self.name, addr, link_name, e
                        );
                        self.emit_event(ControllerEvent::ReconcileFailed {
                            link: link_name.clone(),
                            address: addr.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Run the controller loop
    ///
    /// Performs an initial [`sync`](Controller::sync), then repairs
    /// drift on the configured interval until SIGINT.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Test-only helper to run the controller loop with a controlled
    /// shutdown signal
    ///
    /// **TESTING ONLY**: contract tests need deterministic shutdown.
    /// Production code should use [`run`](Controller::run), which
    /// shuts down on OS signals.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit_event(ControllerEvent::Started {
            name: self.name.clone(),
        });

        self.sync().await?;

        let mut ticker = tokio::time::interval(self.reconcile_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately and sync just ran.
        ticker.tick().await;

        if let Some(mut rx) = shutdown_rx {
            // Test mode: wait for the provided shutdown signal
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.reconcile().await {
                            error!("[{}] reconcile pass failed: {}", self.name, e);
                        }
                    }

                    _ = &mut rx => {
                        info!("[{}] shutdown signal received", self.name);
                        self.emit_event(ControllerEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            // Production mode: wait for SIGINT
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.reconcile().await {
                            error!("[{}] reconcile pass failed: {}", self.name, e);
                        }
                    }

                    _ = tokio::signal::ctrl_c() => {
                        info!("[{}] shutdown signal received", self.name);
                        self.emit_event(ControllerEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Snapshot of the addresses recorded for a link (empty if none)
    pub async fn managed_addresses(&self, link_name: &str) -> Vec<LinkAddress> {
        self.store.lock().await.addresses(link_name)
    }

    /// Names of all links with at least one recorded address
    pub async fn managed_links(&self) -> Vec<String> {
        self.store.lock().await.links()
    }

    /// Test-only helper to pre-populate the managed-address store
    ///
    /// **TESTING ONLY**: contract tests need to set up divergence
    /// between the store and live kernel state, which no public
    /// operation produces. Production code derives the store via
    /// [`sync`](Controller::sync).
    pub async fn seed_store(&self, link_name: &str, addrs: Vec<LinkAddress>) {
        let mut store = self.store.lock().await;
        for addr in addrs {
            store.insert(link_name, addr);
        }
    }

    fn family_enabled(&self, family: IpFamily) -> bool {
        match family {
            IpFamily::V4 => self.ipv4_enabled,
            IpFamily::V6 => self.ipv6_enabled,
        }
    }

    fn family_filter(&self) -> FamilyFilter {
        match (self.ipv4_enabled, self.ipv6_enabled) {
            (true, true) => FamilyFilter::All,
            (true, false) => FamilyFilter::V4,
            _ => FamilyFilter::V6,
        }
    }

    /// Live kernel truth: every link with its currently-assigned
    /// addresses, restricted to the enabled families
    async fn kernel_snapshot(&self) -> Result<Vec<(LinkInfo, Vec<LinkAddress>)>> {
        let links = self.netlink.link_list().await?;
        let filter = self.family_filter();
        let mut snapshot = Vec::with_capacity(links.len());
        for link in links {
            let addrs = self.netlink.addr_list(&link, filter).await?;
            snapshot.push((link, addrs));
        }
        Ok(snapshot)
    }

    /// Same snapshot keyed by link index, for the per-operation
    /// applied check
    async fn live_addresses(&self) -> Result<HashMap<u32, Vec<LinkAddress>>> {
        Ok(self
            .kernel_snapshot()
            .await?
            .into_iter()
            .map(|(link, addrs)| (link.index, addrs))
            .collect())
    }

    /// Emit a controller event
    fn emit_event(&self, event: ControllerEvent) {
        // Events are observational; when the channel is full the event
        // is dropped rather than blocking reconciliation.
        if self.event_tx.try_send(event).is_err() {
            warn!(
                "[{}] event channel full, dropping event; consider increasing event_channel_capacity",
                self.name
            );
        }
    }
}
