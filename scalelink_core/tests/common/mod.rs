#![allow(dead_code)]

use crossbeam_channel::Receiver;
use scalelink_core::config::{BackoffCfg, ReaderCfg, Timeouts};
use scalelink_core::ScaleEvent;
use std::time::{Duration, Instant};

/// Reader config with millisecond backoffs so scenarios run quickly.
pub fn fast_cfg() -> ReaderCfg {
    ReaderCfg {
        timeouts: Timeouts {
            read_ms: 20,
            control_ms: 20,
        },
        backoff: BackoffCfg {
            no_device_ms: 5,
            permission_ms: 5,
            connect_retry_ms: 5,
        },
        ..ReaderCfg::default()
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Collect events until `n` readings have arrived (or give up after `timeout`).
pub fn collect_readings(rx: &Receiver<ScaleEvent>, n: usize, timeout: Duration) -> Vec<ScaleEvent> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::new();
    let mut readings = 0;
    while readings < n {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(ev) => {
                if matches!(ev, ScaleEvent::Reading(_)) {
                    readings += 1;
                }
                out.push(ev);
            }
            Err(_) => break,
        }
    }
    out
}

pub fn values(events: &[ScaleEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ScaleEvent::Reading(r) => Some(r.value.clone()),
            _ => None,
        })
        .collect()
}
