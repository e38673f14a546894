//! Open serial link to the adapter.
//!
//! `Link` owns the backend connection for its whole life: the interface is
//! released and the handle closed exactly once, on `close` or on drop,
//! whichever comes first.

use crate::config::{ControlLines, LineCoding};
use crate::error::LinkError;
use scalelink_traits::{BoxError, Connection, DeviceInfo, DeviceRegistry};
use std::time::Duration;
use tracing::{debug, warn};

/// bmRequestType for class requests to an interface, host to device.
pub const CDC_REQUEST_TYPE_OUT: u8 = 0x21;
pub const SET_LINE_CODING: u8 = 0x20;
pub const SET_CONTROL_LINE_STATE: u8 = 0x22;

pub struct Link<C: Connection> {
    conn: C,
    interface: u8,
    claimed: bool,
    closed: bool,
}

impl<C: Connection> Link<C> {
    /// Open `device` and force-claim `interface`.
    ///
    /// On a claim failure the connection is closed before returning.
    pub fn open<R>(registry: &R, device: &DeviceInfo, interface: u8) -> Result<Self, LinkError>
    where
        R: DeviceRegistry<Connection = C> + ?Sized,
    {
        let conn = registry
            .open(device)
            .map_err(|e| LinkError::Open(e.to_string()))?;
        let mut link = Self {
            conn,
            interface,
            claimed: false,
            closed: false,
        };
        link.conn
            .claim_interface(interface, true)
            .map_err(|e| LinkError::Claim {
                interface,
                reason: e.to_string(),
            })?;
        link.claimed = true;
        debug!(device = %device, interface, "interface claimed");
        Ok(link)
    }

    /// Program control lines and line coding.
    ///
    /// Failures are logged and tolerated: many adapters run fine on their
    /// power-on defaults. Returns whether both transfers went through.
    pub fn configure(&mut self, line: &LineCoding, lines: ControlLines, timeout: Duration) -> bool {
        let index = u16::from(self.interface);
        let mut ok = true;

        if let Err(e) = self.conn.write_control(
            CDC_REQUEST_TYPE_OUT,
            SET_CONTROL_LINE_STATE,
            lines.value(),
            index,
            &[],
            timeout,
        ) {
            warn!(error = %e, "failed to set control line state");
            ok = false;
        }

        let coding = line.to_bytes();
        if let Err(e) = self.conn.write_control(
            CDC_REQUEST_TYPE_OUT,
            SET_LINE_CODING,
            0,
            index,
            &coding,
            timeout,
        ) {
            warn!(error = %e, "failed to set serial parameters");
            ok = false;
        } else {
            debug!(
                baud = line.baud_rate,
                data_bits = line.data_bits,
                parity = ?line.parity,
                stop_bits = ?line.stop_bits,
                "serial parameters set"
            );
        }
        ok
    }

    pub fn read(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> Result<usize, BoxError> {
        self.conn.read_bulk(endpoint, buf, timeout)
    }

    /// Release the interface and close the handle now.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.claimed {
            self.claimed = false;
            if let Err(e) = self.conn.release_interface(self.interface) {
                debug!(error = %e, interface = self.interface, "release interface failed");
            }
        }
        if !self.closed {
            self.closed = true;
            self.conn.close();
        }
    }
}

impl<C: Connection> Drop for Link<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{BusEvent, FakeBus};

    #[test]
    fn configure_sends_control_lines_then_line_coding() {
        let dev = FakeBus::ch340(4);
        let bus = FakeBus::with_device(dev.clone());
        let mut link = Link::open(&bus, &dev, 0).unwrap();
        assert!(link.configure(
            &LineCoding::SCALE_DEFAULT,
            ControlLines::default(),
            Duration::from_millis(10)
        ));
        let controls: Vec<_> = bus
            .events()
            .into_iter()
            .filter(|e| matches!(e, BusEvent::Control { .. }))
            .collect();
        assert_eq!(
            controls,
            vec![
                BusEvent::Control {
                    request_type: 0x21,
                    request: 0x22,
                    value: 0,
                    data: vec![],
                },
                BusEvent::Control {
                    request_type: 0x21,
                    request: 0x20,
                    value: 0,
                    data: vec![0x80, 0x25, 0x00, 0x00, 0x00, 0x00, 0x08],
                },
            ]
        );
    }

    #[test]
    fn control_failures_are_tolerated() {
        let dev = FakeBus::ch340(4);
        let bus = FakeBus::with_device(dev.clone());
        bus.fail_control(true);
        let mut link = Link::open(&bus, &dev, 0).unwrap();
        assert!(!link.configure(
            &LineCoding::SCALE_DEFAULT,
            ControlLines::default(),
            Duration::from_millis(10)
        ));
        assert_eq!(bus.open_now(), 1);
    }

    #[test]
    fn close_then_drop_releases_once() {
        let dev = FakeBus::ch340(4);
        let bus = FakeBus::with_device(dev.clone());
        let link = Link::open(&bus, &dev, 0).unwrap();
        link.close();
        assert_eq!(bus.releases(), 1);
        assert_eq!(bus.closes(), 1);
        assert_eq!(bus.open_now(), 0);
    }

    #[test]
    fn claim_failure_closes_without_release() {
        let dev = FakeBus::ch340(4);
        let bus = FakeBus::with_device(dev.clone());
        bus.fail_next_claims(1);
        let err = Link::open(&bus, &dev, 0).err().unwrap();
        assert!(matches!(err, LinkError::Claim { interface: 0, .. }));
        assert_eq!(bus.releases(), 0);
        assert_eq!(bus.closes(), 1);
        assert_eq!(bus.open_now(), 0);
    }
}
