//! Chooses the inbound data endpoint of the claimed interface.

use scalelink_traits::{Direction, EndpointInfo, InterfaceInfo, TransferType};
use tracing::debug;

/// First endpoint that is both IN and bulk.
///
/// CH340 interfaces also carry an interrupt-IN status endpoint, which is skipped.
pub fn select_bulk_in(interface: &InterfaceInfo) -> Option<EndpointInfo> {
    for (i, ep) in interface.endpoints.iter().enumerate() {
        debug!(
            index = i,
            address = format_args!("0x{:02x}", ep.address),
            kind = ?ep.transfer_type,
            direction = ?ep.direction,
            "endpoint"
        );
        if ep.direction == Direction::In && ep.transfer_type == TransferType::Bulk {
            debug!(address = format_args!("0x{:02x}", ep.address), "selected endpoint");
            return Some(*ep);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_interrupt_and_out_endpoints() {
        let iface = InterfaceInfo {
            number: 0,
            endpoints: vec![
                EndpointInfo::interrupt_in(0x81),
                EndpointInfo::bulk_out(0x02),
                EndpointInfo::bulk_in(0x82),
            ],
        };
        assert_eq!(select_bulk_in(&iface).map(|e| e.address), Some(0x82));
    }

    #[test]
    fn none_without_bulk_in() {
        let iface = InterfaceInfo {
            number: 0,
            endpoints: vec![EndpointInfo::interrupt_in(0x81), EndpointInfo::bulk_out(0x02)],
        };
        assert!(select_bulk_in(&iface).is_none());
    }

    #[test]
    fn first_of_several_bulk_in() {
        let iface = InterfaceInfo {
            number: 0,
            endpoints: vec![EndpointInfo::bulk_in(0x83), EndpointInfo::bulk_in(0x82)],
        };
        assert_eq!(select_bulk_in(&iface).map(|e| e.address), Some(0x83));
    }
}
