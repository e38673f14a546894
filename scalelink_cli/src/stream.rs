//! `stream` command: subscribe and print readings until a stop condition.

use crate::error_fmt::CliError;
use crossbeam_channel::RecvTimeoutError;
use scalelink_core::{ReaderCfg, ScaleEvent, ScaleReader};
use scalelink_traits::{DeviceRegistry, PermissionBroker, Reading};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

// Granularity at which Ctrl-C and the deadline are noticed.
const POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamOpts {
    pub count: Option<usize>,
    pub duration: Option<Duration>,
    pub show_absent: bool,
    pub json: bool,
}

/// Stream until `count` readings, the deadline, Ctrl-C or a terminal error.
///
/// Returns the number of readings printed.
pub fn run_stream<B>(
    backend: Arc<B>,
    cfg: ReaderCfg,
    opts: StreamOpts,
    shutdown: &AtomicBool,
) -> eyre::Result<usize>
where
    B: DeviceRegistry + PermissionBroker + 'static,
{
    let mut reader = ScaleReader::builder()
        .with_backend(backend)
        .with_config(cfg)
        .build()?;
    let rx = reader.subscribe_channel();
    let deadline = opts.duration.map(|d| Instant::now() + d);
    tracing::info!(count = ?opts.count, duration = ?opts.duration, "stream start");

    let mut out = std::io::stdout().lock();
    let mut readings = 0usize;
    let mut absent = 0u64;
    let result = loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("interrupted");
            break Ok(());
        }
        if opts.count.is_some_and(|n| readings >= n) {
            break Ok(());
        }
        let wait = match deadline {
            Some(d) => {
                let left = d.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    break Ok(());
                }
                left.min(POLL)
            }
            None => POLL,
        };
        match rx.recv_timeout(wait) {
            Ok(ScaleEvent::Reading(r)) => {
                readings += 1;
                if let Err(e) = print_reading(&mut out, &r, opts.json) {
                    break Err(e.into());
                }
            }
            Ok(ScaleEvent::Absent) => {
                absent += 1;
                if opts.show_absent
                    && let Err(e) = print_absent(&mut out, opts.json)
                {
                    break Err(e.into());
                }
            }
            Ok(ScaleEvent::Error { code, message }) => {
                break Err(CliError::Device { code, message }.into());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break Ok(()),
        }
    };
    reader.unsubscribe();
    tracing::info!(readings, absent, "stream finished");
    result.map(|()| readings)
}

fn print_reading(out: &mut impl Write, r: &Reading, json: bool) -> std::io::Result<()> {
    if json {
        let line = json!({ "event": "reading", "value": r.value, "at_ms": r.at_ms });
        writeln!(out, "{line}")?;
    } else {
        writeln!(out, "{:>8} ms  {}", r.at_ms, r.value)?;
    }
    out.flush()
}

fn print_absent(out: &mut impl Write, json: bool) -> std::io::Result<()> {
    if json {
        writeln!(out, "{}", json!({ "event": "absent" }))?;
    } else {
        writeln!(out, "absent")?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalelink_core::mocks::{FakeBus, FakeRead};

    fn fast_cfg() -> ReaderCfg {
        let mut cfg = ReaderCfg::default();
        cfg.backoff.no_device_ms = 5;
        cfg.backoff.permission_ms = 5;
        cfg.backoff.connect_retry_ms = 5;
        cfg.timeouts.read_ms = 20;
        cfg
    }

    #[test]
    fn stops_after_count() {
        let bus = FakeBus::with_device(FakeBus::ch340(1));
        bus.push_frames(&["1.0", "2.0", "3.0", "4.0"]);
        let opts = StreamOpts {
            count: Some(2),
            ..StreamOpts::default()
        };
        let n = run_stream(Arc::new(bus.clone()), fast_cfg(), opts, &AtomicBool::new(false)).unwrap();
        assert_eq!(n, 2);
        assert_eq!(bus.open_now(), 0);
    }

    #[test]
    fn terminal_error_becomes_device_error() {
        let bus = FakeBus::with_device(FakeBus::ch340(1));
        bus.push_read(FakeRead::Fatal("controller reset".into()));
        let opts = StreamOpts {
            duration: Some(Duration::from_secs(5)),
            ..StreamOpts::default()
        };
        let err = run_stream(Arc::new(bus), fast_cfg(), opts, &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::Device { code, .. }) if code == "USB_ERROR"
        ));
    }

    #[test]
    fn preset_shutdown_returns_immediately() {
        let bus = FakeBus::new();
        let n = run_stream(
            Arc::new(bus),
            fast_cfg(),
            StreamOpts::default(),
            &AtomicBool::new(true),
        )
        .unwrap();
        assert_eq!(n, 0);
    }
}
