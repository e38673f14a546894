//! Scriptable in-memory USB bus for tests and demos.
//!
//! `FakeBus` is registry and permission broker at once. Tests attach
//! devices, queue read outcomes and inject failures, then inspect the
//! counters and the event log to check what the reader did.

use crate::error::LinkError;
use scalelink_traits::{
    BoxError, Connection, DeviceId, DeviceInfo, DeviceRegistry, EndpointInfo, InterfaceInfo,
    PermissionBroker,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One scripted outcome of `read_bulk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeRead {
    Data(Vec<u8>),
    /// Reported as `Ok(0)`.
    Timeout,
    /// Reported as a timeout error instead of `Ok(0)`.
    TimeoutError,
    Fail(String),
    Fatal(String),
    Panic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Enumerate,
    PermissionRequested(DeviceId),
    Open(DeviceId),
    Claim { interface: u8, force: bool },
    Release(u8),
    Control {
        request_type: u8,
        request: u8,
        value: u16,
        data: Vec<u8>,
    },
    Close,
}

#[derive(Debug)]
struct BusState {
    devices: Vec<DeviceInfo>,
    hidden_until_scan: u32,
    fail_enumeration: bool,
    grant_after: u32,
    fail_opens: u32,
    fail_claims: u32,
    fail_control: bool,
    reads: VecDeque<FakeRead>,
    idle_read: Duration,
    // Bumped on unplug; connections from an older generation are dead.
    generation: u64,
    scans: u32,
    permission_requests: u32,
    opens: u32,
    open_now: u32,
    max_open: u32,
    releases: u32,
    closes: u32,
    events: Vec<BusEvent>,
}

impl Default for BusState {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            hidden_until_scan: 0,
            fail_enumeration: false,
            grant_after: 0,
            fail_opens: 0,
            fail_claims: 0,
            fail_control: false,
            reads: VecDeque::new(),
            idle_read: Duration::from_millis(2),
            generation: 0,
            scans: 0,
            permission_requests: 0,
            opens: 0,
            open_now: 0,
            max_open: 0,
            releases: 0,
            closes: 0,
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeBus {
    state: Arc<Mutex<BusState>>,
}

impl FakeBus {
    /// Empty bus; access is granted up front.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus with `device` already attached.
    pub fn with_device(device: DeviceInfo) -> Self {
        let bus = Self::new();
        bus.attach(device);
        bus
    }

    /// Device with one interface and no endpoints.
    pub fn device(vendor_id: u16, product_id: u16, address: u8) -> DeviceInfo {
        DeviceInfo {
            vendor_id,
            product_id,
            id: DeviceId { bus: 1, address },
            interfaces: vec![InterfaceInfo {
                number: 0,
                endpoints: Vec::new(),
            }],
        }
    }

    /// CH340 adapter laid out the way the chip reports itself.
    pub fn ch340(address: u8) -> DeviceInfo {
        let mut dev = Self::device(0x1A86, 0x7523, address);
        dev.interfaces[0].endpoints = vec![
            EndpointInfo::bulk_in(0x82),
            EndpointInfo::bulk_out(0x02),
            EndpointInfo::interrupt_in(0x81),
        ];
        dev
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Scripting ──

    pub fn attach(&self, device: DeviceInfo) {
        self.state().devices.push(device);
    }

    /// Unplug everything. Open connections fail their next read.
    pub fn detach_all(&self) {
        let mut st = self.state();
        st.devices.clear();
        st.generation += 1;
    }

    /// Attached devices stay invisible for the first `n` scans.
    pub fn appear_after_scans(&self, n: u32) {
        self.state().hidden_until_scan = n;
    }

    /// Access is granted once `n` requests have been made.
    pub fn grant_after_requests(&self, n: u32) {
        self.state().grant_after = n;
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.state().fail_enumeration = fail;
    }

    pub fn fail_next_opens(&self, n: u32) {
        self.state().fail_opens = n;
    }

    pub fn fail_next_claims(&self, n: u32) {
        self.state().fail_claims = n;
    }

    pub fn fail_control(&self, fail: bool) {
        self.state().fail_control = fail;
    }

    pub fn push_read(&self, read: FakeRead) {
        self.state().reads.push_back(read);
    }

    pub fn push_frames(&self, frames: &[&str]) {
        let mut st = self.state();
        for f in frames {
            st.reads.push_back(FakeRead::Data(f.as_bytes().to_vec()));
        }
    }

    /// How long a read with nothing queued blocks before reporting a timeout.
    pub fn set_idle_read(&self, d: Duration) {
        self.state().idle_read = d;
    }

    // ── Inspection ──

    pub fn scans(&self) -> u32 {
        self.state().scans
    }

    pub fn permission_requests(&self) -> u32 {
        self.state().permission_requests
    }

    pub fn opens(&self) -> u32 {
        self.state().opens
    }

    /// Connections opened and not yet closed.
    pub fn open_now(&self) -> u32 {
        self.state().open_now
    }

    pub fn max_open(&self) -> u32 {
        self.state().max_open
    }

    pub fn releases(&self) -> u32 {
        self.state().releases
    }

    pub fn closes(&self) -> u32 {
        self.state().closes
    }

    pub fn pending_reads(&self) -> usize {
        self.state().reads.len()
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.state().events.clone()
    }
}

impl DeviceRegistry for FakeBus {
    type Connection = FakeConnection;

    fn devices(&self) -> Result<Vec<DeviceInfo>, BoxError> {
        let mut st = self.state();
        st.scans += 1;
        st.events.push(BusEvent::Enumerate);
        if st.fail_enumeration {
            return Err(Box::new(LinkError::Io("enumeration failed".into())));
        }
        if st.scans <= st.hidden_until_scan {
            return Ok(Vec::new());
        }
        Ok(st.devices.clone())
    }

    fn open(&self, device: &DeviceInfo) -> Result<FakeConnection, BoxError> {
        let mut st = self.state();
        if st.fail_opens > 0 {
            st.fail_opens -= 1;
            return Err(Box::new(LinkError::Io("open refused".into())));
        }
        if !st.devices.iter().any(|d| d.id == device.id) {
            return Err(Box::new(LinkError::Disconnected));
        }
        st.opens += 1;
        st.open_now += 1;
        st.max_open = st.max_open.max(st.open_now);
        st.events.push(BusEvent::Open(device.id));
        Ok(FakeConnection {
            state: self.state.clone(),
            generation: st.generation,
            claimed: None,
            closed: false,
        })
    }
}

impl PermissionBroker for FakeBus {
    fn has_permission(&self, _device: &DeviceInfo) -> bool {
        let st = self.state();
        st.permission_requests >= st.grant_after
    }

    fn request_permission(&self, device: &DeviceInfo) {
        let mut st = self.state();
        st.permission_requests += 1;
        st.events.push(BusEvent::PermissionRequested(device.id));
    }
}

#[derive(Debug)]
pub struct FakeConnection {
    state: Arc<Mutex<BusState>>,
    generation: u64,
    claimed: Option<u8>,
    closed: bool,
}

impl FakeConnection {
    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unplugged(&self, st: &BusState) -> bool {
        self.closed || st.generation != self.generation
    }
}

impl Connection for FakeConnection {
    fn claim_interface(&mut self, interface: u8, force: bool) -> Result<(), BoxError> {
        {
            let mut st = self.state();
            st.events.push(BusEvent::Claim { interface, force });
            if st.fail_claims > 0 {
                st.fail_claims -= 1;
                return Err(Box::new(LinkError::Io("interface busy".into())));
            }
        }
        self.claimed = Some(interface);
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), BoxError> {
        let mut st = self.state();
        st.events.push(BusEvent::Release(interface));
        st.releases += 1;
        drop(st);
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
        let mut st = self.state();
        st.events.push(BusEvent::Control {
            request_type,
            request,
            value,
            data: data.to_vec(),
        });
        if st.fail_control {
            return Err(Box::new(LinkError::Io("pipe stalled".into())));
        }
        if self.unplugged(&st) {
            return Err(Box::new(LinkError::Disconnected));
        }
        Ok(data.len())
    }

    fn read_bulk(
        &mut self,
        _endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, BoxError> {
        let (next, idle) = {
            let mut st = self.state();
            if self.unplugged(&st) {
                return Err(Box::new(LinkError::Disconnected));
            }
            (st.reads.pop_front(), st.idle_read.min(timeout))
        };
        match next {
            Some(FakeRead::Data(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(FakeRead::Timeout) | None => {
                std::thread::sleep(idle);
                Ok(0)
            }
            Some(FakeRead::TimeoutError) => Err(Box::new(LinkError::Timeout)),
            Some(FakeRead::Fail(msg)) => Err(Box::new(LinkError::Io(msg))),
            Some(FakeRead::Fatal(msg)) => Err(Box::new(LinkError::Fatal(msg))),
            Some(FakeRead::Panic) => panic!("fake backend panicked during read"),
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut st = self.state();
        st.closes += 1;
        st.open_now = st.open_now.saturating_sub(1);
        st.events.push(BusEvent::Close);
    }
}
