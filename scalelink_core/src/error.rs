use thiserror::Error;

/// Tag carried by the terminal error event.
pub const USB_ERROR_CODE: &str = "USB_ERROR";

/// Everything that can go wrong between scanning the bus and reading a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("no matching device attached")]
    NotFound,
    #[error("access to device {0} not granted yet")]
    PermissionPending(String),
    #[error("failed to open device: {0}")]
    Open(String),
    #[error("failed to claim interface {interface}: {reason}")]
    Claim { interface: u8, reason: String },
    #[error("no bulk-in endpoint on interface {0}")]
    NoEndpoint(u8),
    #[error("usb read timed out")]
    Timeout,
    #[error("device disconnected")]
    Disconnected,
    #[error("usb i/o error: {0}")]
    Io(String),
    #[error("usb backend failure: {0}")]
    Fatal(String),
}

impl LinkError {
    /// Reported to the sink as "no data", then retried after a backoff.
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            LinkError::NotFound
                | LinkError::PermissionPending(_)
                | LinkError::Open(_)
                | LinkError::Claim { .. }
                | LinkError::NoEndpoint(_)
        )
    }

    /// Ends the subscription with a terminal error event.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkError::Fatal(_))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing device registry")]
    MissingRegistry,
    #[error("missing permission broker")]
    MissingBroker,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
