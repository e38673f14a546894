//! Plain descriptor values handed out by a `DeviceRegistry`.
//!
//! These mirror the subset of the USB descriptor tree the reader cares about:
//! identity (VID/PID), a bus location that the backend can reopen from, and
//! the endpoints of each interface.

use std::fmt;

/// Endpoint data direction, seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

/// USB transfer type of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointInfo {
    /// Raw endpoint address including the direction bit (e.g. 0x82).
    pub address: u8,
    pub direction: Direction,
    pub transfer_type: TransferType,
}

impl EndpointInfo {
    pub const fn bulk_in(address: u8) -> Self {
        Self {
            address,
            direction: Direction::In,
            transfer_type: TransferType::Bulk,
        }
    }

    pub const fn bulk_out(address: u8) -> Self {
        Self {
            address,
            direction: Direction::Out,
            transfer_type: TransferType::Bulk,
        }
    }

    pub const fn interrupt_in(address: u8) -> Self {
        Self {
            address,
            direction: Direction::In,
            transfer_type: TransferType::Interrupt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub number: u8,
    pub endpoints: Vec<EndpointInfo>,
}

/// System-assigned location of an attached device.
///
/// Only valid while the device stays plugged in; a replug may reuse or change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId {
    pub bus: u8,
    pub address: u8,
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}:{:03}", self.bus, self.address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub id: DeviceId,
    pub interfaces: Vec<InterfaceInfo>,
}

impl DeviceInfo {
    pub fn interface(&self, number: u8) -> Option<&InterfaceInfo> {
        self.interfaces.iter().find(|i| i.number == number)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VID=0x{:04X} PID=0x{:04X} at {}",
            self.vendor_id, self.product_id, self.id
        )
    }
}
