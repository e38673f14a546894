//! Acquisition state machine.
//!
//! One `step` per transition. Absence of any kind (no device, rights pending,
//! failed connect) is reported to the sink as `Absent` and retried after a
//! fixed, interruptible wait. A streaming I/O failure tears the link down,
//! waits out the connect-retry interval without an absent signal and goes
//! back to `Seeking`.

use crate::config::ReaderCfg;
use crate::endpoint;
use crate::error::{LinkError, USB_ERROR_CODE};
use crate::link::Link;
use crate::matcher;
use crate::permission::{self, Access};
use crate::read_loop::{self, LoopExit, ReadParams};
use crate::stop::StopSignal;
use scalelink_traits::{
    Clock, Connection, DeviceInfo, DeviceRegistry, EndpointInfo, PermissionBroker, ReadingSink,
    ScaleEvent,
};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Observable summary of `State`, without the payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Seeking = 1,
    AwaitingPermission = 2,
    Connecting = 3,
    Streaming = 4,
    Stopped = 5,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Phase::Seeking,
            2 => Phase::AwaitingPermission,
            3 => Phase::Connecting,
            4 => Phase::Streaming,
            5 => Phase::Stopped,
            _ => Phase::Idle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Seeking => "seeking",
            Phase::AwaitingPermission => "awaiting_permission",
            Phase::Connecting => "connecting",
            Phase::Streaming => "streaming",
            Phase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase shared with the control thread.
#[derive(Debug, Clone)]
pub struct PhaseCell(Arc<AtomicU8>);

impl PhaseCell {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(Phase::Idle as u8)))
    }

    pub fn get(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, phase: Phase) {
        self.0.store(phase as u8, Ordering::Relaxed);
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

pub enum State<C: Connection> {
    Idle,
    Seeking,
    AwaitingPermission(DeviceInfo),
    Connecting(DeviceInfo),
    Streaming { link: Link<C>, endpoint: EndpointInfo },
    Stopped,
}

impl<C: Connection> State<C> {
    pub fn phase(&self) -> Phase {
        match self {
            State::Idle => Phase::Idle,
            State::Seeking => Phase::Seeking,
            State::AwaitingPermission(_) => Phase::AwaitingPermission,
            State::Connecting(_) => Phase::Connecting,
            State::Streaming { .. } => Phase::Streaming,
            State::Stopped => Phase::Stopped,
        }
    }
}

impl<C: Connection> fmt::Debug for State<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::AwaitingPermission(dev) | State::Connecting(dev) => {
                write!(f, "{}({})", self.phase(), dev)
            }
            State::Streaming { endpoint, .. } => {
                write!(f, "streaming(endpoint=0x{:02x})", endpoint.address)
            }
            other => f.write_str(other.phase().as_str()),
        }
    }
}

pub struct Controller<R, P, S, K>
where
    R: DeviceRegistry,
    P: PermissionBroker + ?Sized,
    S: ReadingSink,
    K: Clock,
{
    registry: Arc<R>,
    broker: Arc<P>,
    sink: S,
    cfg: ReaderCfg,
    stop: StopSignal,
    clock: K,
    epoch: Instant,
    phase: PhaseCell,
}

impl<R, P, S, K> Controller<R, P, S, K>
where
    R: DeviceRegistry,
    P: PermissionBroker + ?Sized,
    S: ReadingSink,
    K: Clock,
{
    pub fn new(
        registry: Arc<R>,
        broker: Arc<P>,
        sink: S,
        cfg: ReaderCfg,
        stop: StopSignal,
        clock: K,
    ) -> Self {
        let epoch = clock.now();
        Self {
            registry,
            broker,
            sink,
            cfg,
            stop,
            clock,
            epoch,
            phase: PhaseCell::new(),
        }
    }

    pub fn phase_cell(&self) -> PhaseCell {
        self.phase.clone()
    }

    /// Advance one transition.
    ///
    /// `Err` carries a fatal backend error; the caller reports it and stops.
    pub fn step(&mut self, state: State<R::Connection>) -> Result<State<R::Connection>, LinkError> {
        if !self.stop.is_running() {
            // Dropping a streaming state releases its link.
            return Ok(State::Stopped);
        }
        let next = match state {
            State::Idle => State::Seeking,
            State::Seeking => match matcher::scan(self.registry.as_ref(), &self.cfg.device) {
                None => self.absent_then_wait(&LinkError::NotFound, self.cfg.backoff.no_device()),
                Some(dev) => {
                    info!(device = %dev, "scale found");
                    match permission::check(self.broker.as_ref(), &dev) {
                        Access::Granted => State::Connecting(dev),
                        Access::Deferred => State::AwaitingPermission(dev),
                    }
                }
            },
            State::AwaitingPermission(dev) => {
                let reason = LinkError::PermissionPending(dev.to_string());
                self.absent_then_wait(&reason, self.cfg.backoff.permission())
            }
            State::Connecting(dev) => match self.connect(&dev) {
                Ok((link, endpoint)) => {
                    info!(
                        device = %dev,
                        endpoint = format_args!("0x{:02x}", endpoint.address),
                        "link up"
                    );
                    State::Streaming { link, endpoint }
                }
                Err(e) => {
                    warn!(device = %dev, error = %e, "connect failed");
                    self.absent_then_wait(&e, self.cfg.backoff.connect_retry())
                }
            },
            State::Streaming { mut link, endpoint } => {
                let params = ReadParams {
                    endpoint: endpoint.address,
                    buffer_size: self.cfg.buffer_size,
                    timeout: self.cfg.timeouts.read(),
                    clock: &self.clock,
                    epoch: self.epoch,
                };
                let exit = read_loop::run(&mut link, &mut self.sink, &self.stop, &params);
                link.close();
                match exit {
                    LoopExit::Stopped => State::Stopped,
                    LoopExit::SinkClosed => {
                        self.stop.halt();
                        State::Stopped
                    }
                    LoopExit::Failed(e) => {
                        let wait = self.cfg.backoff.connect_retry();
                        info!(error = %e, retry_in = ?wait, "link lost; rescanning");
                        if self.stop.wait(wait) {
                            State::Seeking
                        } else {
                            State::Stopped
                        }
                    }
                    LoopExit::Fatal(e) => return Err(e),
                }
            }
            State::Stopped => State::Stopped,
        };
        Ok(next)
    }

    /// Drive the machine from `Idle` until it stops.
    pub fn run(&mut self) -> Result<(), LinkError> {
        let mut state = State::Idle;
        loop {
            let phase = state.phase();
            if self.phase.get() != phase {
                debug!(from = %self.phase.get(), to = %phase, "phase");
                self.phase.set(phase);
            }
            if phase == Phase::Stopped {
                return Ok(());
            }
            state = match self.step(state) {
                Ok(next) => next,
                Err(e) => {
                    self.phase.set(Phase::Stopped);
                    return Err(e);
                }
            };
        }
    }

    /// Emit the terminal error event and clear the running flag.
    pub fn fail(&mut self, message: String) {
        warn!(%message, "subscription ended by device error");
        // Emit before clearing the flag so a stopped worker has always delivered its error.
        let _ = self.sink.emit(ScaleEvent::Error {
            code: USB_ERROR_CODE.to_owned(),
            message,
        });
        self.phase.set(Phase::Stopped);
        self.stop.halt();
    }

    fn absent_then_wait(&mut self, reason: &LinkError, wait: Duration) -> State<R::Connection> {
        debug!(%reason, retry_in = ?wait, "absent");
        if self.sink.emit(ScaleEvent::Absent).is_err() {
            debug!("reading sink closed while absent");
            self.stop.halt();
            return State::Stopped;
        }
        if self.stop.wait(wait) {
            State::Seeking
        } else {
            State::Stopped
        }
    }

    fn connect(&self, dev: &DeviceInfo) -> Result<(Link<R::Connection>, EndpointInfo), LinkError> {
        let mut link = Link::open(self.registry.as_ref(), dev, self.cfg.interface)?;
        link.configure(
            &self.cfg.line,
            self.cfg.control_lines,
            self.cfg.timeouts.control(),
        );
        let endpoint = dev
            .interface(self.cfg.interface)
            .and_then(endpoint::select_bulk_in)
            .ok_or(LinkError::NoEndpoint(self.cfg.interface))?;
        Ok((link, endpoint))
    }
}
