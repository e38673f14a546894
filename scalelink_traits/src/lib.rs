pub mod clock;
pub mod usb;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use usb::{DeviceId, DeviceInfo, Direction, EndpointInfo, InterfaceInfo, TransferType};

use std::time::Duration;

/// Error type crossing the backend trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Enumerates attached devices and opens connections to them.
///
/// Shared between the control thread and the reader worker, hence `Send + Sync`.
pub trait DeviceRegistry: Send + Sync {
    type Connection: Connection;

    fn devices(&self) -> Result<Vec<DeviceInfo>, BoxError>;
    fn open(&self, device: &DeviceInfo) -> Result<Self::Connection, BoxError>;
}

/// Answers and requests access rights for a device.
pub trait PermissionBroker: Send + Sync {
    fn has_permission(&self, device: &DeviceInfo) -> bool;
    /// Fire-and-forget. The outcome is only visible through a later `has_permission`.
    fn request_permission(&self, device: &DeviceInfo);
}

/// An open channel to one device.
///
/// A read that times out may be reported either as `Ok(0)` or as an error the
/// core classifies as a timeout.
pub trait Connection {
    fn claim_interface(&mut self, interface: u8, force: bool) -> Result<(), BoxError>;
    fn release_interface(&mut self, interface: u8) -> Result<(), BoxError>;
    #[allow(clippy::too_many_arguments)]
    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, BoxError>;
    fn read_bulk(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, BoxError>;
    /// Close the handle. Called once; later calls must be no-ops.
    fn close(&mut self);
}

/// A decimal weight token and when it was produced (ms since subscription start).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub value: String,
    pub at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleEvent {
    Reading(Reading),
    /// No data this cycle; not an error.
    Absent,
    /// Terminal: nothing else is emitted for the subscription afterwards.
    Error { code: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("reading sink closed")]
pub struct SinkClosed;

pub trait ReadingSink: Send {
    fn emit(&mut self, event: ScaleEvent) -> Result<(), SinkClosed>;
}
