use rstest::rstest;
use scalelink_core::config::ReaderCfg;
use scalelink_core::error::BuildError;
use scalelink_core::mocks::FakeBus;
use scalelink_core::{ScaleReader, ScaleReaderBuilder};
use scalelink_traits::ManualClock;
use std::sync::Arc;

#[rstest]
fn missing_registry_is_typed_error() {
    let err = ScaleReaderBuilder::<FakeBus, FakeBus>::new()
        .with_broker(Arc::new(FakeBus::new()))
        .build()
        .err()
        .expect("should fail with MissingRegistry");
    assert_eq!(err, BuildError::MissingRegistry);
}

#[rstest]
fn missing_broker_is_typed_error() {
    let err = ScaleReaderBuilder::<FakeBus, FakeBus>::new()
        .with_registry(Arc::new(FakeBus::new()))
        .build()
        .err()
        .expect("should fail with MissingBroker");
    assert_eq!(err, BuildError::MissingBroker);
}

#[rstest]
#[case::no_product_ids(|c: &mut ReaderCfg| c.device.product_ids.clear())]
#[case::zero_buffer(|c: &mut ReaderCfg| c.buffer_size = 0)]
#[case::zero_read_timeout(|c: &mut ReaderCfg| c.timeouts.read_ms = 0)]
#[case::zero_baud(|c: &mut ReaderCfg| c.line.baud_rate = 0)]
fn invalid_config_is_rejected(#[case] tweak: fn(&mut ReaderCfg)) {
    let mut cfg = ReaderCfg::default();
    tweak(&mut cfg);
    let err = ScaleReader::builder()
        .with_backend(Arc::new(FakeBus::new()))
        .with_config(cfg)
        .build()
        .err()
        .expect("should reject config");
    assert!(matches!(err, BuildError::InvalidConfig(_)), "{err:?}");
}

#[rstest]
fn builds_with_backend_and_custom_clock() {
    let bus = FakeBus::with_device(FakeBus::ch340(1));
    bus.push_frames(&["2.5"]);
    let mut reader = ScaleReaderBuilder::new()
        .with_backend(Arc::new(bus.clone()))
        .with_clock(ManualClock::new())
        .build()
        .expect("valid builder");
    let rx = reader.subscribe_channel();
    let ev = rx
        .iter()
        .find(|e| matches!(e, scalelink_core::ScaleEvent::Reading(_)))
        .expect("a reading");
    match ev {
        scalelink_core::ScaleEvent::Reading(r) => {
            assert_eq!(r.value, "2.5");
            // Manual clock never advanced.
            assert_eq!(r.at_ms, 0);
        }
        other => panic!("unexpected {other:?}"),
    }
    reader.unsubscribe();
}
