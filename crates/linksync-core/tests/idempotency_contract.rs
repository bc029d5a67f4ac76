//! Contract tests: idempotence guarantees
//!
//! Constraints verified:
//! - Repeating `add_address` issues at most one kernel add
//! - Repeating `del_address` issues at most one kernel remove
//! - Add followed by del returns the store to its prior state
//!
//! If these fail, the controller is no longer safe to drive from a
//! blindly-retrying reconciliation loop.

mod common;

use std::sync::Arc;

use common::*;

#[tokio::test]
async fn repeated_add_issues_one_kernel_mutation() {
    let nl = Arc::new(MockNetlink::new().with_link("link1", 1));
    let (controller, _events) = new_controller(true, false, nl.clone());

    for _ in 0..3 {
        controller
            .add_address(addr("10.10.10.4/24", 1))
            .await
            .expect("add succeeds");
    }

    assert_eq!(nl.addr_add_count(), 1, "one kernel add across three calls");
    assert_eq!(
        controller.managed_addresses("link1").await,
        vec![labeled_addr("10.10.10.4/24", "link1", 1)],
        "store holds the address exactly once"
    );
}

#[tokio::test]
async fn repeated_del_issues_one_kernel_mutation() {
    let nl = Arc::new(MockNetlink::new().with_link("link1", 1));
    let applied = labeled_addr("10.10.10.4/24", "link1", 1);
    nl.set_live_addrs(1, vec![applied.clone()]);

    let (controller, _events) = new_controller(true, false, nl.clone());
    controller.seed_store("link1", vec![applied]).await;

    for _ in 0..3 {
        controller
            .del_address(addr("10.10.10.4/24", 1))
            .await
            .expect("del succeeds");
    }

    assert_eq!(nl.addr_del_count(), 1, "one kernel remove across three calls");
    assert!(controller.managed_addresses("link1").await.is_empty());
}

#[tokio::test]
async fn add_then_del_round_trips_store_and_kernel() {
    let nl = Arc::new(MockNetlink::new().with_link("link1", 1));
    let (controller, _events) = new_controller(true, false, nl.clone());

    controller
        .add_address(addr("10.10.10.4/24", 1))
        .await
        .expect("add succeeds");
    controller
        .del_address(addr("10.10.10.4/24", 1))
        .await
        .expect("del succeeds");

    assert_eq!(nl.addr_add_count(), 1);
    assert_eq!(nl.addr_del_count(), 1);
    assert!(controller.managed_addresses("link1").await.is_empty());
    assert!(controller.managed_links().await.is_empty());
    assert!(nl.live_addrs(1).is_empty());
}

#[tokio::test]
async fn mixed_families_gate_independently() {
    // Dual-stack controller: both families pass the gate and both get
    // their own label-stamped kernel add.
    let nl = Arc::new(MockNetlink::new().with_link("link1", 1));
    let (controller, _events) = new_controller(true, true, nl.clone());

    controller
        .add_address(addr("10.10.10.4/24", 1))
        .await
        .expect("v4 add succeeds");
    controller
        .add_address(addr("fd00::4/64", 1))
        .await
        .expect("v6 add succeeds");

    assert_eq!(nl.addr_add_count(), 2);
    assert_eq!(controller.managed_addresses("link1").await.len(), 2);
}
