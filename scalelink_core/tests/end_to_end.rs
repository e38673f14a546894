//! Full acquisition scenario against the fake bus.

mod common;

use common::{collect_readings, fast_cfg, values};
use scalelink_core::mocks::{BusEvent, FakeBus};
use scalelink_core::{ScaleEvent, ScaleReader};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn absent_then_permission_then_readings_in_order() {
    let bus = FakeBus::with_device(FakeBus::ch340(9));
    bus.appear_after_scans(3);
    bus.grant_after_requests(2);
    bus.push_frames(&[
        "ST,GS,+0000.500kg\r\n",
        "\x02\x03",
        "ST,GS,+0001.000kg\r\n",
        "ST,GS,+0001.500kg\r\n",
    ]);

    let mut reader = ScaleReader::with_backend(Arc::new(bus.clone()), fast_cfg());
    let rx = reader.subscribe_channel();
    let events = collect_readings(&rx, 3, Duration::from_secs(5));
    reader.unsubscribe();

    // Three empty scans, then two absent cycles while the grant is pending.
    let absents = events
        .iter()
        .take_while(|e| **e == ScaleEvent::Absent)
        .count();
    assert_eq!(absents, 5);
    assert_eq!(values(&events), vec!["0000.500", "0001.000", "0001.500"]);
    assert!(!events.iter().any(|e| matches!(e, ScaleEvent::Error { .. })));

    let log = bus.events();
    let first_open = log
        .iter()
        .position(|e| matches!(e, BusEvent::Open(_)))
        .unwrap();
    let requests_before_open = log[..first_open]
        .iter()
        .filter(|e| matches!(e, BusEvent::PermissionRequested(_)))
        .count();
    assert_eq!(requests_before_open, 2);
    assert_eq!(bus.opens(), 1);
}

#[test]
fn readings_are_stamped_monotonically() {
    let bus = FakeBus::with_device(FakeBus::ch340(9));
    bus.push_frames(&["1.0", "2.0", "3.0"]);
    let mut reader = ScaleReader::with_backend(Arc::new(bus), fast_cfg());
    let rx = reader.subscribe_channel();
    let events = collect_readings(&rx, 3, Duration::from_secs(5));
    reader.unsubscribe();

    let stamps: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            ScaleEvent::Reading(r) => Some(r.at_ms),
            _ => None,
        })
        .collect();
    assert_eq!(stamps.len(), 3);
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn repeated_absence_never_opens() {
    let bus = FakeBus::new();
    let mut cfg = fast_cfg();
    cfg.backoff.no_device_ms = 30;
    let mut reader = ScaleReader::with_backend(Arc::new(bus.clone()), cfg);
    let rx = reader.subscribe_channel();

    let deadline = Instant::now() + Duration::from_millis(200);
    let mut received = Vec::new();
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        if let Ok(ev) = rx.recv_timeout(left) {
            assert_eq!(ev, ScaleEvent::Absent);
            received.push(Instant::now());
        }
    }
    reader.unsubscribe();
    let late = rx.try_iter().filter(|e| *e == ScaleEvent::Absent).count();

    assert_eq!(bus.opens(), 0);
    // One absent per scan.
    assert_eq!((received.len() + late) as u32, bus.scans());
    assert!((2..=8).contains(&received.len()), "absents = {}", received.len());
    // Consecutive absents are at least one backoff apart (minus receive jitter).
    for gap in received.windows(2).map(|w| w[1] - w[0]) {
        assert!(gap >= Duration::from_millis(25), "gap = {gap:?}");
    }
}
