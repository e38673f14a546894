//! `From` implementations bridging `scalelink_config` types to `scalelink_core` types.

use crate::config::{
    BackoffCfg, ControlLines, DeviceFilter, LineCoding, Parity, ReaderCfg, StopBits, Timeouts,
};
use crate::error::Result;
use eyre::WrapErr;

// ── Device ───────────────────────────────────────────────────────────────────

impl From<&scalelink_config::DeviceCfg> for DeviceFilter {
    fn from(c: &scalelink_config::DeviceCfg) -> Self {
        Self {
            vendor_id: c.vendor_id,
            product_ids: c.product_ids.clone(),
        }
    }
}

// ── Line ─────────────────────────────────────────────────────────────────────

impl From<scalelink_config::StopBits> for StopBits {
    fn from(s: scalelink_config::StopBits) -> Self {
        match s {
            scalelink_config::StopBits::One => StopBits::One,
            scalelink_config::StopBits::OnePointFive => StopBits::OnePointFive,
            scalelink_config::StopBits::Two => StopBits::Two,
        }
    }
}

impl From<scalelink_config::Parity> for Parity {
    fn from(p: scalelink_config::Parity) -> Self {
        match p {
            scalelink_config::Parity::None => Parity::None,
            scalelink_config::Parity::Odd => Parity::Odd,
            scalelink_config::Parity::Even => Parity::Even,
            scalelink_config::Parity::Mark => Parity::Mark,
            scalelink_config::Parity::Space => Parity::Space,
        }
    }
}

impl From<&scalelink_config::LineCfg> for LineCoding {
    fn from(c: &scalelink_config::LineCfg) -> Self {
        Self {
            baud_rate: c.baud_rate,
            stop_bits: c.stop_bits.into(),
            parity: c.parity.into(),
            data_bits: c.data_bits,
        }
    }
}

impl From<&scalelink_config::LineCfg> for ControlLines {
    fn from(c: &scalelink_config::LineCfg) -> Self {
        Self {
            dtr: c.dtr,
            rts: c.rts,
        }
    }
}

// ── Timing ───────────────────────────────────────────────────────────────────

impl From<&scalelink_config::Timeouts> for Timeouts {
    fn from(c: &scalelink_config::Timeouts) -> Self {
        Self {
            read_ms: c.read_ms,
            control_ms: c.control_ms,
        }
    }
}

impl From<&scalelink_config::Backoff> for BackoffCfg {
    fn from(c: &scalelink_config::Backoff) -> Self {
        Self {
            no_device_ms: c.no_device_ms,
            permission_ms: c.permission_ms,
            connect_retry_ms: c.connect_retry_ms,
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&scalelink_config::Config> for ReaderCfg {
    fn from(c: &scalelink_config::Config) -> Self {
        Self {
            device: (&c.device).into(),
            interface: c.device.interface,
            line: (&c.line).into(),
            control_lines: (&c.line).into(),
            timeouts: (&c.timeouts).into(),
            backoff: (&c.backoff).into(),
            buffer_size: c.read.buffer_size,
        }
    }
}

/// Map and re-validate a loaded config.
pub fn reader_cfg(c: &scalelink_config::Config) -> Result<ReaderCfg> {
    let cfg = ReaderCfg::from(c);
    cfg.validate().wrap_err("config rejected by reader")?;
    Ok(cfg)
}
