pub mod error;
#[cfg(feature = "hardware")]
pub mod libusb;

use error::UsbError;
use scalelink_traits::{
    BoxError, Clock, Connection, DeviceId, DeviceInfo, DeviceRegistry, EndpointInfo,
    InterfaceInfo, MonotonicClock, PermissionBroker,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Location the simulated adapter reports.
pub const SIM_DEVICE_ID: DeviceId = DeviceId { bus: 1, address: 7 };
/// Bulk-IN endpoint of a CH340 data interface.
pub const CH340_BULK_IN: u8 = 0x82;

/// Knobs for the simulated scale.
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Whether the adapter shows up in enumeration at all.
    pub present: bool,
    pub product_id: u16,
    /// Number of permission requests before access is granted (0 = granted up front).
    pub grant_after_requests: u32,
    /// Grams added per frame.
    pub step_g: f32,
    /// Time between frames.
    pub frame_interval: Duration,
    /// Every Nth frame is line noise without a weight; 0 disables.
    pub garble_every: u32,
    /// Fail a read with an I/O error after this many frames on each connection.
    pub fail_after_frames: Option<u32>,
    /// Make that injected failure a backend failure instead of an I/O error.
    pub fail_fatal: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            present: true,
            product_id: 0x7523,
            grant_after_requests: 0,
            step_g: 0.5,
            frame_interval: Duration::from_millis(100),
            garble_every: 0,
            fail_after_frames: None,
            fail_fatal: false,
        }
    }
}

impl SimOptions {
    /// Defaults overridden by `SCALELINK_SIM_*` environment variables.
    ///
    /// - `SCALELINK_SIM_ABSENT=1`: no device attached
    /// - `SCALELINK_SIM_GRANT_AFTER=<n>`: permission requests before grant
    /// - `SCALELINK_SIM_STEP=<grams>`: increment per frame
    /// - `SCALELINK_SIM_INTERVAL_MS=<ms>`: frame interval
    /// - `SCALELINK_SIM_GARBLE_EVERY=<n>`: noise frame cadence
    /// - `SCALELINK_SIM_FAIL_AFTER=<n>`: frames before a simulated I/O error
    /// - `SCALELINK_SIM_FAIL_FATAL=1`: that error is a backend failure
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
        }
        let mut opts = Self::default();
        if var::<u8>("SCALELINK_SIM_ABSENT").is_some_and(|v| v != 0) {
            opts.present = false;
        }
        if let Some(n) = var("SCALELINK_SIM_GRANT_AFTER") {
            opts.grant_after_requests = n;
        }
        if let Some(step) = var::<f32>("SCALELINK_SIM_STEP")
            && step.is_finite()
        {
            opts.step_g = step;
        }
        if let Some(ms) = var("SCALELINK_SIM_INTERVAL_MS") {
            opts.frame_interval = Duration::from_millis(ms);
        }
        if let Some(n) = var("SCALELINK_SIM_GARBLE_EVERY") {
            opts.garble_every = n;
        }
        opts.fail_after_frames = var("SCALELINK_SIM_FAIL_AFTER");
        opts.fail_fatal = var::<u8>("SCALELINK_SIM_FAIL_FATAL").is_some_and(|v| v != 0);
        opts
    }
}

#[derive(Debug, Default)]
struct SimState {
    weight_g: f32,
    permission_requests: u32,
}

/// A CH340 scale that lives in memory.
///
/// Acts as both registry and permission broker, emitting frames shaped like
/// `ST,GS,+0012.345kg\r\n` with a steadily rising weight.
#[derive(Clone)]
pub struct SimulatedScale {
    opts: SimOptions,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedScale {
    pub fn new() -> Self {
        Self::with_options(SimOptions::default())
    }

    pub fn with_options(opts: SimOptions) -> Self {
        Self {
            opts,
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    pub fn options(&self) -> &SimOptions {
        &self.opts
    }

    pub fn descriptor(&self) -> DeviceInfo {
        DeviceInfo {
            vendor_id: 0x1A86,
            product_id: self.opts.product_id,
            id: SIM_DEVICE_ID,
            interfaces: vec![InterfaceInfo {
                number: 0,
                endpoints: vec![
                    EndpointInfo::bulk_in(CH340_BULK_IN),
                    EndpointInfo::bulk_out(0x02),
                    EndpointInfo::interrupt_in(0x81),
                ],
            }],
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SimulatedScale {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry for SimulatedScale {
    type Connection = SimConnection;

    fn devices(&self) -> Result<Vec<DeviceInfo>, BoxError> {
        if self.opts.present {
            Ok(vec![self.descriptor()])
        } else {
            Ok(Vec::new())
        }
    }

    fn open(&self, device: &DeviceInfo) -> Result<SimConnection, BoxError> {
        if !self.opts.present || device.id != SIM_DEVICE_ID {
            return Err(Box::new(UsbError::NotFound(device.id.to_string())));
        }
        tracing::debug!(device = %device, "simulated scale opened");
        Ok(SimConnection {
            opts: self.opts.clone(),
            state: self.state.clone(),
            clock: MonotonicClock::new(),
            claimed: None,
            open: true,
            frames: 0,
        })
    }
}

impl PermissionBroker for SimulatedScale {
    fn has_permission(&self, _device: &DeviceInfo) -> bool {
        self.state().permission_requests >= self.opts.grant_after_requests
    }

    fn request_permission(&self, device: &DeviceInfo) {
        let mut st = self.state();
        st.permission_requests = st.permission_requests.saturating_add(1);
        tracing::debug!(device = %device, requests = st.permission_requests, "simulated permission request");
    }
}

pub struct SimConnection {
    opts: SimOptions,
    state: Arc<Mutex<SimState>>,
    clock: MonotonicClock,
    claimed: Option<u8>,
    open: bool,
    frames: u32,
}

impl SimConnection {
    fn next_frame(&mut self) -> Vec<u8> {
        self.frames = self.frames.saturating_add(1);
        if self.opts.garble_every > 0 && self.frames % self.opts.garble_every == 0 {
            return b"\x02\x03\xffST,GS,".to_vec();
        }
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.weight_g += self.opts.step_g;
        format!("ST,GS,{:+09.3}kg\r\n", st.weight_g).into_bytes()
    }
}

impl Connection for SimConnection {
    fn claim_interface(&mut self, interface: u8, _force: bool) -> Result<(), BoxError> {
        if interface != 0 {
            return Err(Box::new(UsbError::NotFound(format!("interface {interface}"))));
        }
        self.claimed = Some(interface);
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), BoxError> {
        if self.claimed != Some(interface) {
            return Err(Box::new(UsbError::Io(format!(
                "interface {interface} not claimed"
            ))));
        }
        self.claimed = None;
        Ok(())
    }

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        _index: u16,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, BoxError> {
        if !self.open {
            return Err(Box::new(UsbError::Disconnected));
        }
        tracing::trace!(request_type, request, value, len = data.len(), "simulated control out");
        Ok(data.len())
    }

    fn read_bulk(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, BoxError> {
        if !self.open {
            return Err(Box::new(UsbError::Disconnected));
        }
        if endpoint != CH340_BULK_IN {
            return Err(Box::new(UsbError::Io(format!(
                "no bulk-in endpoint 0x{endpoint:02x}"
            ))));
        }
        self.clock.sleep(self.opts.frame_interval.min(timeout));
        if let Some(n) = self.opts.fail_after_frames
            && self.frames >= n
        {
            self.frames = 0;
            if self.opts.fail_fatal {
                return Err(Box::new(UsbError::Backend("simulated host controller reset".into())));
            }
            return Err(Box::new(UsbError::Io("simulated cable glitch".into())));
        }
        let frame = self.next_frame();
        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }

    fn close(&mut self) {
        self.open = false;
        self.claimed = None;
    }
}
