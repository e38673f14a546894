//! libusb backend built on `rusb`.
//!
//! Desktop hosts have no permission prompt: access is probed by opening the
//! device, and a request for rights only logs how to grant them (udev rule).
use crate::error::UsbError;
use rusb::{Context, Device, DeviceHandle, UsbContext};
use scalelink_traits::{
    BoxError, Connection, DeviceId, DeviceInfo, DeviceRegistry, Direction, EndpointInfo,
    InterfaceInfo, PermissionBroker, TransferType,
};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

fn boxed(e: rusb::Error) -> BoxError {
    Box::new(UsbError::from(e))
}

fn endpoint_info(ep: &rusb::EndpointDescriptor<'_>) -> EndpointInfo {
    EndpointInfo {
        address: ep.address(),
        direction: match ep.direction() {
            rusb::Direction::In => Direction::In,
            rusb::Direction::Out => Direction::Out,
        },
        transfer_type: match ep.transfer_type() {
            rusb::TransferType::Control => TransferType::Control,
            rusb::TransferType::Isochronous => TransferType::Isochronous,
            rusb::TransferType::Bulk => TransferType::Bulk,
            rusb::TransferType::Interrupt => TransferType::Interrupt,
        },
    }
}

/// Whether claiming must detach the kernel driver by hand, given the outcome
/// of enabling libusb's auto-detach (which reattaches on release).
fn needs_manual_detach(auto_detach: Result<(), rusb::Error>) -> Result<bool, rusb::Error> {
    match auto_detach {
        Ok(()) => Ok(false),
        Err(rusb::Error::NotSupported) => Ok(true),
        Err(e) => Err(e),
    }
}

fn describe(device: &Device<Context>) -> Result<DeviceInfo, rusb::Error> {
    let desc = device.device_descriptor()?;
    let config = device
        .active_config_descriptor()
        .or_else(|_| device.config_descriptor(0));
    let interfaces = match config {
        Ok(config) => config
            .interfaces()
            .map(|iface| InterfaceInfo {
                number: iface.number(),
                // Alternate setting 0 is the one active after claim.
                endpoints: iface
                    .descriptors()
                    .next()
                    .map(|alt| alt.endpoint_descriptors().map(|ep| endpoint_info(&ep)).collect())
                    .unwrap_or_default(),
            })
            .collect(),
        Err(e) => {
            debug!(error = %e, "no config descriptor; reporting device without interfaces");
            Vec::new()
        }
    };
    Ok(DeviceInfo {
        vendor_id: desc.vendor_id(),
        product_id: desc.product_id(),
        id: DeviceId {
            bus: device.bus_number(),
            address: device.address(),
        },
        interfaces,
    })
}

pub struct LibUsbRegistry {
    context: Context,
    hinted: Mutex<HashSet<DeviceId>>,
}

impl LibUsbRegistry {
    pub fn new() -> Result<Self, UsbError> {
        let context = Context::new()?;
        Ok(Self {
            context,
            hinted: Mutex::new(HashSet::new()),
        })
    }

    fn find_device(&self, id: DeviceId) -> Result<Device<Context>, UsbError> {
        for device in self.context.devices()?.iter() {
            if device.bus_number() == id.bus && device.address() == id.address {
                return Ok(device);
            }
        }
        Err(UsbError::NotFound(id.to_string()))
    }
}

impl DeviceRegistry for LibUsbRegistry {
    type Connection = LibUsbConnection;

    fn devices(&self) -> Result<Vec<DeviceInfo>, BoxError> {
        let list = self.context.devices().map_err(boxed)?;
        let mut out = Vec::with_capacity(list.len());
        for device in list.iter() {
            match describe(&device) {
                Ok(info) => out.push(info),
                Err(e) => debug!(
                    bus = device.bus_number(),
                    address = device.address(),
                    error = %e,
                    "skipping device without readable descriptor"
                ),
            }
        }
        Ok(out)
    }

    fn open(&self, device: &DeviceInfo) -> Result<LibUsbConnection, BoxError> {
        let found = self.find_device(device.id)?;
        let handle = found.open().map_err(boxed)?;
        Ok(LibUsbConnection {
            handle: Some(handle),
            detached: None,
        })
    }
}

impl PermissionBroker for LibUsbRegistry {
    fn has_permission(&self, device: &DeviceInfo) -> bool {
        match self.find_device(device.id).map(|d| d.open()) {
            Ok(Ok(_handle)) => true,
            Ok(Err(rusb::Error::Access)) => false,
            // Let the open step report anything else.
            _ => true,
        }
    }

    fn request_permission(&self, device: &DeviceInfo) {
        let mut hinted = self.hinted.lock().unwrap_or_else(PoisonError::into_inner);
        if hinted.insert(device.id) {
            warn!(
                device = %device,
                "no access to device; grant it with a udev rule such as \
                 SUBSYSTEM==\"usb\", ATTRS{{idVendor}}==\"{:04x}\", MODE=\"0666\"",
                device.vendor_id
            );
        }
    }
}

pub struct LibUsbConnection {
    handle: Option<DeviceHandle<Context>>,
    /// Interface whose kernel driver was detached by hand and must be reattached.
    detached: Option<u8>,
}

impl LibUsbConnection {
    fn handle(&mut self) -> Result<&mut DeviceHandle<Context>, BoxError> {
        self.handle
            .as_mut()
            .ok_or_else(|| Box::new(UsbError::Disconnected) as BoxError)
    }

    /// Give a hand-detached interface back to its kernel driver.
    fn reattach(&mut self, interface: u8) {
        if self.detached != Some(interface) {
            return;
        }
        self.detached = None;
        if let Some(handle) = self.handle.as_mut()
            && let Err(e) = handle.attach_kernel_driver(interface)
        {
            warn!(interface, error = %e, "could not reattach kernel driver");
        }
    }
}

impl Connection for LibUsbConnection {
    fn claim_interface(&mut self, interface: u8, force: bool) -> Result<(), BoxError> {
        let handle = self.handle()?;
        let mut detached = false;
        if force
            && needs_manual_detach(handle.set_auto_detach_kernel_driver(true)).map_err(boxed)?
            && let Ok(true) = handle.kernel_driver_active(interface)
        {
            debug!(interface, "detaching kernel driver");
            handle.detach_kernel_driver(interface).map_err(boxed)?;
            detached = true;
        }
        let claimed = handle.claim_interface(interface).map_err(boxed);
        if detached {
            self.detached = Some(interface);
        }
        claimed
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), BoxError> {
        let released = self.handle()?.release_interface(interface).map_err(boxed);
        self.reattach(interface);
        released
    }

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, BoxError> {
        self.handle()?
            .write_control(request_type, request, value, index, data, timeout)
            .map_err(boxed)
    }

    fn read_bulk(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, BoxError> {
        match self.handle()?.read_bulk(endpoint, buf, timeout) {
            Ok(n) => Ok(n),
            Err(rusb::Error::Timeout) => Ok(0),
            Err(e) => Err(boxed(e)),
        }
    }

    fn close(&mut self) {
        if let Some(interface) = self.detached {
            self.reattach(interface);
        }
        // Dropping the handle closes it.
        self.handle.take();
    }
}
