//! Runtime configuration for the reader.
//!
//! Separate from the TOML-deserialized config in `scalelink_config`; see
//! `conversions` for the mapping.

use crate::error::BuildError;
use std::time::Duration;

/// Vendor/product identity the matcher accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_ids: Vec<u16>,
}

impl DeviceFilter {
    /// The CH340 family: one vendor, several product ids.
    pub fn ch340() -> Self {
        Self {
            vendor_id: scalelink_config::CH340_VENDOR_ID,
            product_ids: scalelink_config::CH340_PRODUCT_IDS.to_vec(),
        }
    }

    #[inline]
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        vendor_id == self.vendor_id && self.product_ids.contains(&product_id)
    }
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self::ch340()
    }
}

/// CDC stop-bit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    One = 0,
    OnePointFive = 1,
    Two = 2,
}

/// CDC parity codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None = 0,
    Odd = 1,
    Even = 2,
    Mark = 3,
    Space = 4,
}

/// Serial line parameters programmed with SET_LINE_CODING.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCoding {
    pub baud_rate: u32,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub data_bits: u8,
}

impl LineCoding {
    /// 9600 8N1, what the scales speak out of the box.
    pub const SCALE_DEFAULT: Self = Self {
        baud_rate: 9600,
        stop_bits: StopBits::One,
        parity: Parity::None,
        data_bits: 8,
    };

    /// Wire layout: baud rate little-endian, then stop-bit code, parity code, data bits.
    pub fn to_bytes(&self) -> [u8; 7] {
        let baud = self.baud_rate.to_le_bytes();
        [
            baud[0],
            baud[1],
            baud[2],
            baud[3],
            self.stop_bits as u8,
            self.parity as u8,
            self.data_bits,
        ]
    }
}

impl Default for LineCoding {
    fn default() -> Self {
        Self::SCALE_DEFAULT
    }
}

/// Modem control lines for SET_CONTROL_LINE_STATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlLines {
    pub dtr: bool,
    pub rts: bool,
}

impl ControlLines {
    /// wValue bitmap: bit 0 = DTR, bit 1 = RTS.
    pub fn value(&self) -> u16 {
        u16::from(self.dtr) | (u16::from(self.rts) << 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub read_ms: u64,
    pub control_ms: u64,
}

impl Timeouts {
    pub fn read(&self) -> Duration {
        Duration::from_millis(self.read_ms)
    }

    pub fn control(&self) -> Duration {
        Duration::from_millis(self.control_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read_ms: 1000,
            control_ms: 1000,
        }
    }
}

/// Fixed retry intervals; retries themselves are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffCfg {
    pub no_device_ms: u64,
    pub permission_ms: u64,
    pub connect_retry_ms: u64,
}

impl BackoffCfg {
    pub fn no_device(&self) -> Duration {
        Duration::from_millis(self.no_device_ms)
    }

    pub fn permission(&self) -> Duration {
        Duration::from_millis(self.permission_ms)
    }

    pub fn connect_retry(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }
}

impl Default for BackoffCfg {
    fn default() -> Self {
        Self {
            no_device_ms: 1000,
            permission_ms: 2000,
            connect_retry_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderCfg {
    pub device: DeviceFilter,
    /// Data interface claimed on the adapter.
    pub interface: u8,
    pub line: LineCoding,
    pub control_lines: ControlLines,
    pub timeouts: Timeouts,
    pub backoff: BackoffCfg,
    /// Bulk read buffer size in bytes.
    pub buffer_size: usize,
}

impl Default for ReaderCfg {
    fn default() -> Self {
        Self {
            device: DeviceFilter::default(),
            interface: 0,
            line: LineCoding::default(),
            control_lines: ControlLines::default(),
            timeouts: Timeouts::default(),
            backoff: BackoffCfg::default(),
            buffer_size: 64,
        }
    }
}

impl ReaderCfg {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.device.product_ids.is_empty() {
            return Err(BuildError::InvalidConfig("device.product_ids is empty"));
        }
        if self.buffer_size == 0 {
            return Err(BuildError::InvalidConfig("buffer_size must be > 0"));
        }
        if self.timeouts.read_ms == 0 {
            return Err(BuildError::InvalidConfig("timeouts.read_ms must be > 0"));
        }
        if self.line.baud_rate == 0 {
            return Err(BuildError::InvalidConfig("line.baud_rate must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_default_line_coding_bytes() {
        assert_eq!(
            LineCoding::SCALE_DEFAULT.to_bytes(),
            [0x80, 0x25, 0x00, 0x00, 0x00, 0x00, 0x08]
        );
    }

    #[test]
    fn high_baud_rates_span_all_four_bytes() {
        let lc = LineCoding {
            baud_rate: 0x0102_0304,
            stop_bits: StopBits::Two,
            parity: Parity::Even,
            data_bits: 7,
        };
        assert_eq!(lc.to_bytes(), [0x04, 0x03, 0x02, 0x01, 2, 2, 7]);
    }

    #[test]
    fn control_line_bitmap() {
        assert_eq!(ControlLines::default().value(), 0);
        assert_eq!(ControlLines { dtr: true, rts: false }.value(), 1);
        assert_eq!(ControlLines { dtr: true, rts: true }.value(), 3);
    }

    #[test]
    fn filter_accepts_every_ch340_variant() {
        let f = DeviceFilter::ch340();
        for pid in [0x7523, 0x7522, 0x5523] {
            assert!(f.matches(0x1A86, pid));
        }
        assert!(!f.matches(0x1A86, 0x55D4));
        assert!(!f.matches(0x0403, 0x7523));
    }

    #[test]
    fn empty_product_list_is_rejected() {
        let cfg = ReaderCfg {
            device: DeviceFilter {
                vendor_id: 0x1A86,
                product_ids: vec![],
            },
            ..ReaderCfg::default()
        };
        assert!(matches!(cfg.validate(), Err(BuildError::InvalidConfig(_))));
    }
}
