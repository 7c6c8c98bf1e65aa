//! Architectural Contract Test: End-to-End Failover
//!
//! This test drives full cycles through the scheduler against an in-memory
//! controller and probe runner.
//!
//! Constraints verified:
//! - A dead address in a group is disabled and published
//! - A recovered address is re-enabled and published
//! - A healthy, correctly flagged group produces no write
//! - All-zones mode lists zones on every cycle
//! - A dry-run controller is never counted as having published
//!
//! If this test fails, the observable failover behavior has changed.

mod common;

use common::*;
use dnslb_core::config::ZoneSelector;
use dnslb_core::{ReconcileEvent, ReconciliationScheduler};
use std::sync::Arc;

#[tokio::test]
async fn dead_address_is_disabled() {
    let controller = Arc::new(FakeController::with_zone("example.", vec![api_group()]));
    let runner = Arc::new(FakeProbeRunner::new());
    runner.set_down("10.0.0.1");

    let (scheduler, mut events) =
        ReconciliationScheduler::new(controller.clone(), runner, zone_config("example.")).unwrap();

    let report = tokio_test::assert_ok!(scheduler.run_once().await);
    assert_eq!(report.published(), 1);
    assert!(report.failed_zones.is_empty());

    let published = controller.published();
    assert_eq!(published.len(), 1);
    let (zone, set) = &published[0];
    assert_eq!(zone, "example.");
    assert_eq!(set.name, "api.example.");
    assert_eq!(set.disabled_flags(), vec![true, false]);

    let events = drain(&mut events);
    assert!(events.contains(&ReconcileEvent::ZoneFetched {
        zone: "example.".to_string(),
        record_sets: 1,
        eligible: 1,
    }));
    assert!(events.contains(&ReconcileEvent::PublishSucceeded {
        zone: "example.".to_string(),
        name: "api.example.".to_string(),
        disabled: 1,
        enabled: 1,
    }));
}

#[tokio::test]
async fn dry_run_changes_are_reported_but_not_published() {
    let controller = Arc::new(FakeController::with_zone("example.", vec![api_group()]));
    controller.set_dry_run(true);
    let runner = Arc::new(FakeProbeRunner::new());
    runner.set_down("10.0.0.1");

    let (scheduler, mut events) =
        ReconciliationScheduler::new(controller.clone(), runner, zone_config("example.")).unwrap();

    let report = tokio_test::assert_ok!(scheduler.run_once().await);
    assert_eq!(report.published(), 0);
    assert_eq!(report.dry_run(), 1);
    assert_eq!(report.zones[0].changed, 1);
    assert!(controller.published().is_empty());
    assert_eq!(
        controller.zone("example.")[0].disabled_flags(),
        vec![false, false],
        "Dry-run leaves the zone untouched"
    );

    let events = drain(&mut events);
    assert!(events.contains(&ReconcileEvent::PublishDryRun {
        zone: "example.".to_string(),
        name: "api.example.".to_string(),
        disabled: 1,
        enabled: 1,
    }));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, ReconcileEvent::PublishSucceeded { .. }))
    );
}

#[tokio::test]
async fn recovered_address_is_enabled() {
    let controller = Arc::new(FakeController::with_zone(
        "example.",
        vec![record_set(
            "api.example.",
            "A",
            &[("10.0.0.1", true), ("10.0.0.2", false)],
        )],
    ));
    let runner = Arc::new(FakeProbeRunner::new());

    let (scheduler, _events) =
        ReconciliationScheduler::new(controller.clone(), runner, zone_config("example.")).unwrap();

    let report = scheduler.run_once().await.unwrap();
    assert_eq!(report.published(), 1);
    assert_eq!(
        controller.zone("example.")[0].disabled_flags(),
        vec![false, false]
    );
}

#[tokio::test]
async fn healthy_group_is_left_alone() {
    let controller = Arc::new(FakeController::with_zone("example.", vec![api_group()]));
    let runner = Arc::new(FakeProbeRunner::new());

    let (scheduler, mut events) =
        ReconciliationScheduler::new(controller.clone(), runner.clone(), zone_config("example."))
            .unwrap();

    let report = scheduler.run_once().await.unwrap();
    assert_eq!(report.reconciled(), 1);
    assert_eq!(report.published(), 0);
    assert_eq!(runner.probe_count(), 2);
    assert_eq!(controller.publish_count(), 0);

    let events = drain(&mut events);
    assert!(events.contains(&ReconcileEvent::RecordSetReconciled {
        zone: "example.".to_string(),
        name: "api.example.".to_string(),
        changed: false,
        reachable: 2,
        total: 2,
    }));
}

#[tokio::test]
async fn all_zones_mode_reconciles_every_listed_zone() {
    let controller = Arc::new(FakeController::new());
    controller.set_zone("example.", vec![api_group()]);
    controller.set_zone(
        "example.net.",
        vec![record_set(
            "web.example.net.",
            "A",
            &[("192.0.2.1", false), ("192.0.2.2", false)],
        )],
    );
    let runner = Arc::new(FakeProbeRunner::new());
    runner.set_down("10.0.0.2");
    runner.set_down("192.0.2.1");

    let (scheduler, _events) = ReconciliationScheduler::new(
        controller.clone(),
        runner,
        test_config(ZoneSelector::All),
    )
    .unwrap();

    let report = scheduler.run_once().await.unwrap();

    assert_eq!(controller.list_count(), 1);
    let mut zones: Vec<_> = report.zones.iter().map(|z| z.zone.clone()).collect();
    zones.sort();
    assert_eq!(zones, vec!["example.", "example.net."]);
    assert_eq!(report.published(), 2);
    assert_eq!(
        controller.zone("example.net.")[0].disabled_flags(),
        vec![true, false]
    );
}

#[tokio::test]
async fn failed_zone_listing_skips_the_cycle() {
    let controller = Arc::new(FakeController::with_zone("example.", vec![api_group()]));
    controller.set_fail_list(true);
    let runner = Arc::new(FakeProbeRunner::new());

    let (scheduler, mut events) = ReconciliationScheduler::new(
        controller.clone(),
        runner.clone(),
        test_config(ZoneSelector::All),
    )
    .unwrap();

    tokio_test::assert_err!(scheduler.run_once().await);
    assert_eq!(controller.fetch_count(), 0);
    assert_eq!(runner.probe_count(), 0);

    let events = drain(&mut events);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ReconcileEvent::ZoneListFailed { .. }))
    );
}
