//! Picks the scale out of the attached device set.
//!
//! Several CH340 adapters attached at once are not told apart: the first one
//! in enumeration order wins. No serial number or other identity is tracked.

use crate::config::DeviceFilter;
use scalelink_traits::{DeviceInfo, DeviceRegistry};
use tracing::{debug, warn};

/// First device in `devices` accepted by `filter`.
pub fn find_device<'a>(devices: &'a [DeviceInfo], filter: &DeviceFilter) -> Option<&'a DeviceInfo> {
    devices
        .iter()
        .find(|d| filter.matches(d.vendor_id, d.product_id))
}

/// Enumerate `registry` and return the first match.
///
/// An enumeration failure is treated like an empty bus.
pub fn scan<R: DeviceRegistry + ?Sized>(registry: &R, filter: &DeviceFilter) -> Option<DeviceInfo> {
    let devices = match registry.devices() {
        Ok(devices) => devices,
        Err(e) => {
            warn!(error = %e, "device enumeration failed");
            return None;
        }
    };
    debug!(count = devices.len(), "enumerated usb devices");
    for d in &devices {
        debug!(
            vid = format_args!("0x{:04X}", d.vendor_id),
            pid = format_args!("0x{:04X}", d.product_id),
            at = %d.id,
            "usb device"
        );
    }
    find_device(&devices, filter).cloned()
}
