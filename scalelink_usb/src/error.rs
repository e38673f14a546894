use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsbError {
    #[error("usb timeout")]
    Timeout,
    #[error("access denied to device {0}")]
    Access(String),
    #[error("device {0} not found")]
    NotFound(String),
    #[error("device disconnected")]
    Disconnected,
    #[error("usb i/o: {0}")]
    Io(String),
    #[error("usb backend unavailable: {0}")]
    Backend(String),
}

#[cfg(feature = "hardware")]
impl From<rusb::Error> for UsbError {
    fn from(e: rusb::Error) -> Self {
        match e {
            rusb::Error::Timeout => UsbError::Timeout,
            rusb::Error::Access => UsbError::Access(e.to_string()),
            rusb::Error::NoDevice => UsbError::Disconnected,
            rusb::Error::NotFound => UsbError::NotFound(e.to_string()),
            rusb::Error::NoMem | rusb::Error::NotSupported => UsbError::Backend(e.to_string()),
            other => UsbError::Io(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, UsbError>;
