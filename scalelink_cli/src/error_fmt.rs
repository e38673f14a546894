//! Human-readable error descriptions, exit codes and structured JSON errors.

use scalelink_core::error::BuildError;
use serde_json::json;
use thiserror::Error;

/// Failures the CLI classifies for exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration rejected: {0}")]
    Config(String),
    #[error("device error {code}: {message}")]
    Device { code: String, message: String },
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config(msg) => format!(
                "What happened: The configuration was rejected ({msg}).\nLikely causes: A value in the TOML is misspelled or out of range.\nHow to fix: Edit the config file (etc/scalelink.toml is a commented sample), then rerun."
            ),
            CliError::Device { code, message } => format!(
                "What happened: The USB backend failed and reading stopped ({code}: {message}).\nLikely causes: The host controller was reset or libusb lost its context.\nHow to fix: Replug the scale, check `dmesg` for USB errors, then rerun."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingRegistry | BuildError::MissingBroker => format!(
                "What happened: The reader was built without a USB backend ({be}).\nLikely causes: A backend failed to initialize.\nHow to fix: Re-run with --log-level=debug to see which backend failed."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    // String-based heuristics for errors coming from backend init
    let msg = err.to_string();
    let lower = format!("{err:#}").to_ascii_lowercase();

    if lower.contains("access denied") || lower.contains("permission") {
        return "What happened: The process may not open USB devices.\nLikely causes: No udev rule grants access to the adapter.\nHow to fix: Add a udev rule for vendor 1a86 (see the warning in the log), replug the scale, or run with elevated rights.".to_string();
    }

    if lower.contains("libusb") || lower.contains("enumerate") {
        return format!(
            "What happened: USB devices could not be enumerated ({msg}).\nLikely causes: libusb is missing or the USB subsystem is unavailable in this environment.\nHow to fix: Install libusb-1.0 and rerun; inside containers pass the USB bus through."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// 2 for configuration/build errors, 3 for a terminal device error, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<CliError>() {
        Some(CliError::Config(_)) => return 2,
        Some(CliError::Device { .. }) => return 3,
        None => {}
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let message = humanize(err);
    match err.downcast_ref::<CliError>() {
        Some(CliError::Device { code, .. }) => {
            json!({ "event": "error", "reason": "Device", "code": code, "message": message })
        }
        Some(CliError::Config(_)) => {
            json!({ "event": "error", "reason": "Config", "message": message })
        }
        None if err.downcast_ref::<BuildError>().is_some() => {
            json!({ "event": "error", "reason": "Config", "message": message })
        }
        None => json!({ "event": "error", "reason": "Error", "message": message }),
    }
    .to_string()
}
