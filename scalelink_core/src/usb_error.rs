//! Maps `Box<dyn Error>` from backend trait boundaries to typed `LinkError`.
//!
//! The traits in `scalelink_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module classifies those errors, with an optional
//! feature-gated path for `scalelink_usb::UsbError` downcasting.

use crate::error::LinkError;

/// Map a trait-boundary error to a typed `LinkError`.
///
/// Tries `LinkError` itself, then known backend error types, then falls back
/// to string-based heuristics.
pub fn map_usb_error(e: &(dyn std::error::Error + Send + Sync + 'static)) -> LinkError {
    if let Some(link) = e.downcast_ref::<LinkError>() {
        return link.clone();
    }

    #[cfg(feature = "usb-errors")]
    {
        use scalelink_usb::error::UsbError;
        if let Some(usb) = e.downcast_ref::<UsbError>() {
            return match usb {
                UsbError::Timeout => LinkError::Timeout,
                UsbError::Disconnected | UsbError::NotFound(_) => LinkError::Disconnected,
                UsbError::Backend(msg) => LinkError::Fatal(msg.clone()),
                other => LinkError::Io(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        LinkError::Timeout
    } else if lower.contains("no device") || lower.contains("disconnected") {
        LinkError::Disconnected
    } else {
        LinkError::Io(s)
    }
}
