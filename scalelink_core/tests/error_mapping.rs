#![cfg(feature = "usb-errors")]

use rstest::rstest;
use scalelink_core::error::LinkError;
use scalelink_core::map_usb_error;
use scalelink_usb::error::UsbError;
use std::error::Error;

type BoxError = Box<dyn Error + Send + Sync>;

#[rstest]
#[case::usb_timeout(Box::new(UsbError::Timeout) as BoxError, LinkError::Timeout)]
#[case::usb_disconnected(Box::new(UsbError::Disconnected) as BoxError, LinkError::Disconnected)]
#[case::usb_not_found(Box::new(UsbError::NotFound("001:004".into())) as BoxError, LinkError::Disconnected)]
#[case::usb_backend(
    Box::new(UsbError::Backend("no context".into())) as BoxError,
    LinkError::Fatal("no context".into())
)]
#[case::link_passthrough(Box::new(LinkError::NoEndpoint(0)) as BoxError, LinkError::NoEndpoint(0))]
#[case::text_timeout("operation timed out".into(), LinkError::Timeout)]
#[case::text_no_device("No device (it may have been disconnected)".into(), LinkError::Disconnected)]
fn classifies_backend_errors(#[case] err: BoxError, #[case] expected: LinkError) {
    assert_eq!(map_usb_error(&*err), expected);
}

#[rstest]
fn usb_io_maps_to_transient_io() {
    let err: BoxError = Box::new(UsbError::Io("pipe".into()));
    let mapped = map_usb_error(&*err);
    assert!(matches!(mapped, LinkError::Io(_)));
    assert!(!mapped.is_fatal());
    assert!(!mapped.is_absence());
}

#[rstest]
fn unknown_text_falls_back_to_io() {
    let err: BoxError = "overflow".into();
    assert_eq!(map_usb_error(&*err), LinkError::Io("overflow".into()));
}

#[rstest]
#[case(LinkError::NotFound)]
#[case(LinkError::PermissionPending("001:002".into()))]
#[case(LinkError::Open("busy".into()))]
#[case(LinkError::Claim { interface: 0, reason: "busy".into() })]
#[case(LinkError::NoEndpoint(0))]
fn acquisition_failures_are_absence(#[case] e: LinkError) {
    assert!(e.is_absence());
    assert!(!e.is_fatal());
}
