//! Background worker running the acquisition state machine.
//!
//! Each `Subscription` owns exactly one thread. Dropping it stops the worker
//! and joins it, so no thread outlives its handle. Stop latency is bounded by
//! the in-flight bulk read timeout; backoff waits wake immediately.
use crate::config::ReaderCfg;
use crate::controller::{Controller, Phase, PhaseCell};
use crate::stop::{self, StopHandle};
use scalelink_traits::{Clock, DeviceRegistry, PermissionBroker, ReadingSink};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

pub struct Subscription {
    stop: StopHandle,
    phase: PhaseCell,
    join_handle: Option<JoinHandle<()>>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "reader worker panicked".to_owned()
    }
}

impl Subscription {
    pub fn spawn<R, P, S, K>(
        registry: Arc<R>,
        broker: Arc<P>,
        sink: S,
        cfg: ReaderCfg,
        clock: K,
    ) -> Self
    where
        R: DeviceRegistry + 'static,
        P: PermissionBroker + ?Sized + 'static,
        S: ReadingSink + 'static,
        K: Clock + Send + 'static,
    {
        let (handle, signal) = stop::pair();
        let mut controller = Controller::new(registry, broker, sink, cfg, signal, clock);
        let phase = controller.phase_cell();

        let join_handle = std::thread::spawn(move || {
            tracing::debug!("reader worker started");
            match panic::catch_unwind(AssertUnwindSafe(|| controller.run())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => controller.fail(e.to_string()),
                Err(payload) => controller.fail(panic_message(&*payload)),
            }
            tracing::trace!("reader worker exiting cleanly");
        });

        Self {
            stop: handle,
            phase,
            join_handle: Some(join_handle),
        }
    }

    /// False once stopped from either side.
    pub fn is_running(&self) -> bool {
        self.stop.is_running()
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// Signal the worker and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        self.stop.stop();
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("reader worker joined"),
                // Panics inside the worker are caught there; this is a panic in `fail` itself.
                Err(e) => tracing::warn!(?e, "reader worker panicked during shutdown"),
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}
