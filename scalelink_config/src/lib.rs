#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the scale reader.
//!
//! Every section defaults to the CH340 scale constants, so an empty TOML file
//! yields a usable configuration. `Config::validate` rejects values the reader
//! cannot work with and names the offending key.
use serde::Deserialize;
use std::path::Path;

/// WCH (QinHeng Electronics) vendor id.
pub const CH340_VENDOR_ID: u16 = 0x1A86;
/// Product ids shipped with the CH340/CH341 serial bridge.
pub const CH340_PRODUCT_IDS: [u16; 3] = [0x7523, 0x7522, 0x5523];

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeviceCfg {
    pub vendor_id: u16,
    /// Accepted product ids; a narrow deployment may list only 0x7523.
    pub product_ids: Vec<u16>,
    /// Data interface to claim.
    pub interface: u8,
}

impl Default for DeviceCfg {
    fn default() -> Self {
        Self {
            vendor_id: CH340_VENDOR_ID,
            product_ids: CH340_PRODUCT_IDS.to_vec(),
            interface: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopBits {
    #[default]
    #[serde(rename = "1")]
    One,
    #[serde(rename = "1.5")]
    OnePointFive,
    #[serde(rename = "2")]
    Two,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct LineCfg {
    pub baud_rate: u32,
    pub data_bits: u8,
    /// "1", "1.5" or "2"
    pub stop_bits: StopBits,
    /// "none" | "odd" | "even" | "mark" | "space"
    pub parity: Parity,
    /// Assert DTR in SET_CONTROL_LINE_STATE
    pub dtr: bool,
    /// Assert RTS in SET_CONTROL_LINE_STATE
    pub rts: bool,
}

impl Default for LineCfg {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: StopBits::One,
            parity: Parity::None,
            dtr: false,
            rts: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Timeouts {
    /// Bulk read timeout per attempt (ms).
    pub read_ms: u64,
    /// Control transfer timeout (ms).
    pub control_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read_ms: 1000,
            control_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Backoff {
    /// Wait after a scan that found no matching device.
    pub no_device_ms: u64,
    /// Wait after requesting access rights.
    pub permission_ms: u64,
    /// Wait after a failed open/claim/endpoint lookup.
    pub connect_retry_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            no_device_ms: 1000,
            permission_ms: 2000,
            connect_retry_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ReadCfg {
    /// Bulk read buffer size in bytes.
    pub buffer_size: usize,
}

impl Default for ReadCfg {
    fn default() -> Self {
        Self { buffer_size: 64 }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub device: DeviceCfg,
    pub line: LineCfg,
    pub timeouts: Timeouts,
    pub backoff: Backoff,
    pub read: ReadCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Device
        if self.device.product_ids.is_empty() {
            eyre::bail!("device.product_ids must list at least one product id");
        }

        // Line
        if self.line.baud_rate == 0 {
            eyre::bail!("line.baud_rate must be > 0");
        }
        if !matches!(self.line.data_bits, 5..=8 | 16) {
            eyre::bail!("line.data_bits must be one of 5, 6, 7, 8 or 16");
        }

        // Timeouts
        if self.timeouts.read_ms == 0 {
            eyre::bail!("timeouts.read_ms must be >= 1");
        }
        if self.timeouts.read_ms > 60_000 {
            eyre::bail!("timeouts.read_ms is unreasonably large (>60s)");
        }
        if self.timeouts.control_ms == 0 {
            eyre::bail!("timeouts.control_ms must be >= 1");
        }

        // Backoff
        if self.backoff.no_device_ms == 0 {
            eyre::bail!("backoff.no_device_ms must be >= 1");
        }
        if self.backoff.permission_ms == 0 {
            eyre::bail!("backoff.permission_ms must be >= 1");
        }
        if self.backoff.connect_retry_ms == 0 {
            eyre::bail!("backoff.connect_retry_ms must be >= 1");
        }

        // Read
        if self.read.buffer_size == 0 || self.read.buffer_size > 16 * 1024 {
            eyre::bail!("read.buffer_size must be in [1, 16384]");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}
