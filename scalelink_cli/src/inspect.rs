//! `list` and `self-check` commands.

use scalelink_core::endpoint::select_bulk_in;
use scalelink_core::{DeviceFilter, ReaderCfg};
use scalelink_traits::{DeviceInfo, DeviceRegistry};
use serde_json::json;
use std::io::Write;

fn enumerate<R: DeviceRegistry + ?Sized>(registry: &R) -> eyre::Result<Vec<DeviceInfo>> {
    registry
        .devices()
        .map_err(|e| eyre::eyre!("failed to enumerate usb devices: {e}"))
}

/// Print every attached device; returns how many the reader would accept.
pub fn run_list<R: DeviceRegistry + ?Sized>(
    registry: &R,
    cfg: &ReaderCfg,
    json: bool,
) -> eyre::Result<usize> {
    let devices = enumerate(registry)?;
    let mut out = std::io::stdout().lock();
    let mut matched = 0usize;
    for d in &devices {
        let is_match = cfg.device.matches(d.vendor_id, d.product_id);
        let endpoint = if is_match {
            d.interface(cfg.interface).and_then(select_bulk_in)
        } else {
            None
        };
        if is_match {
            matched += 1;
        }
        if json {
            let line = json!({
                "vendor_id": format!("{:04x}", d.vendor_id),
                "product_id": format!("{:04x}", d.product_id),
                "location": d.id.to_string(),
                "match": is_match,
                "bulk_in": endpoint.map(|e| format!("0x{:02x}", e.address)),
            });
            writeln!(out, "{line}")?;
        } else {
            let mark = match (is_match, endpoint) {
                (true, Some(ep)) => format!("  <- scale (bulk-in 0x{:02x})", ep.address),
                (true, None) => "  <- scale (no bulk-in endpoint)".to_string(),
                (false, _) => String::new(),
            };
            writeln!(
                out,
                "{:04x}:{:04x}  {}{}",
                d.vendor_id, d.product_id, d.id, mark
            )?;
        }
    }
    if !json && devices.is_empty() {
        writeln!(out, "no usb devices")?;
    }
    tracing::debug!(total = devices.len(), matched, "listed devices");
    Ok(matched)
}

/// Config was already loaded and validated by the caller; check the backend answers.
pub fn run_self_check<R: DeviceRegistry + ?Sized>(
    registry: &R,
    filter: &DeviceFilter,
    json: bool,
) -> eyre::Result<()> {
    let devices = enumerate(registry)?;
    let found = scalelink_core::matcher::find_device(&devices, filter);
    let mut out = std::io::stdout().lock();
    if json {
        let line = json!({
            "status": "ok",
            "devices": devices.len(),
            "scale": found.map(|d| d.id.to_string()),
        });
        writeln!(out, "{line}")?;
    } else {
        writeln!(out, "config: ok")?;
        writeln!(out, "backend: ok ({} device(s))", devices.len())?;
        match found {
            Some(d) => writeln!(out, "scale: {d}")?,
            None => writeln!(out, "scale: not attached")?,
        }
    }
    Ok(())
}
