//! Cancellation shared between the control thread and the reader worker.
//!
//! The worker polls an atomic running flag at every loop boundary and waits
//! out its backoffs on a channel that the control side disconnects on stop,
//! so a sleeping worker wakes immediately instead of finishing its interval.

use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Create a connected control/worker pair in the running state.
pub fn pair() -> (StopHandle, StopSignal) {
    let running = Arc::new(AtomicBool::new(true));
    let (tx, rx) = xch::bounded::<()>(0);
    (
        StopHandle {
            running: running.clone(),
            wake: Some(tx),
        },
        StopSignal { running, wake: rx },
    )
}

/// Control side.
#[derive(Debug)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
    wake: Option<xch::Sender<()>>,
}

impl StopHandle {
    /// Clear the running flag and wake any pending wait. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        // Dropping the only sender disconnects the worker's receiver.
        self.wake.take();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// Worker side.
#[derive(Debug)]
pub struct StopSignal {
    running: Arc<AtomicBool>,
    wake: xch::Receiver<()>,
}

impl StopSignal {
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Worker-initiated stop (fatal error, sink gone).
    pub fn halt(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Sleep for `d` unless stopped first. Returns whether still running.
    pub fn wait(&self, d: Duration) -> bool {
        if !self.is_running() {
            return false;
        }
        match self.wake.recv_timeout(d) {
            Err(xch::RecvTimeoutError::Timeout) => self.is_running(),
            Ok(()) | Err(xch::RecvTimeoutError::Disconnected) => false,
        }
    }
}
