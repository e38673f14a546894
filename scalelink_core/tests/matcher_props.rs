use proptest::prelude::*;
use scalelink_core::config::DeviceFilter;
use scalelink_core::matcher::find_device;
use scalelink_core::mocks::FakeBus;
use scalelink_traits::DeviceInfo;

const ACCEPTED: [u16; 3] = [0x7523, 0x7522, 0x5523];

// Mix real CH340 ids with near misses so matches are neither rare nor certain.
fn vid() -> impl Strategy<Value = u16> {
    prop_oneof![Just(0x1A86u16), Just(0x1A87u16), Just(0x0403u16), any::<u16>()]
}

fn pid() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(0x7523u16),
        Just(0x7522u16),
        Just(0x5523u16),
        Just(0x55D4u16),
        any::<u16>()
    ]
}

fn devices() -> impl Strategy<Value = Vec<DeviceInfo>> {
    prop::collection::vec((vid(), pid()), 0..8).prop_map(|ids| {
        ids.into_iter()
            .enumerate()
            .map(|(i, (v, p))| FakeBus::device(v, p, i as u8 + 1))
            .collect()
    })
}

proptest! {
    #[test]
    fn match_iff_exact_vid_and_accepted_pid(devs in devices()) {
        let expected = devs
            .iter()
            .any(|d| d.vendor_id == 0x1A86 && ACCEPTED.contains(&d.product_id));
        let found = find_device(&devs, &DeviceFilter::ch340());
        prop_assert_eq!(found.is_some(), expected);
        if let Some(d) = found {
            prop_assert_eq!(d.vendor_id, 0x1A86);
            prop_assert!(ACCEPTED.contains(&d.product_id));
        }
    }

    #[test]
    fn match_is_first_in_enumeration_order(devs in devices()) {
        let first = devs
            .iter()
            .position(|d| d.vendor_id == 0x1A86 && ACCEPTED.contains(&d.product_id));
        let found = find_device(&devs, &DeviceFilter::ch340()).map(|d| d.id);
        prop_assert_eq!(found, first.map(|i| devs[i].id));
    }

    #[test]
    fn narrow_filter_only_accepts_listed_pid(devs in devices()) {
        let narrow = DeviceFilter { vendor_id: 0x1A86, product_ids: vec![0x7523] };
        if let Some(d) = find_device(&devs, &narrow) {
            prop_assert_eq!(d.product_id, 0x7523);
        }
    }
}
