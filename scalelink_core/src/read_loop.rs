//! Bulk read / parse cycle over an open link.

use crate::error::LinkError;
use crate::link::Link;
use crate::parser;
use crate::stop::StopSignal;
use crate::usb_error::map_usb_error;
use scalelink_traits::{Clock, Connection, Reading, ReadingSink, ScaleEvent};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Why the read loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// Running flag cleared.
    Stopped,
    /// Consumer went away.
    SinkClosed,
    /// Transient I/O failure; reconnect.
    Failed(LinkError),
    /// Backend unusable; end the subscription.
    Fatal(LinkError),
}

pub struct ReadParams<'a, K: Clock> {
    pub endpoint: u8,
    pub buffer_size: usize,
    pub timeout: Duration,
    pub clock: &'a K,
    pub epoch: Instant,
}

/// Read until stopped or until the link fails.
///
/// Zero-length reads and timeouts are skipped. Frames without a weight token
/// produce nothing.
pub fn run<C, S, K>(
    link: &mut Link<C>,
    sink: &mut S,
    stop: &StopSignal,
    params: &ReadParams<'_, K>,
) -> LoopExit
where
    C: Connection,
    S: ReadingSink + ?Sized,
    K: Clock,
{
    let mut buf = vec![0u8; params.buffer_size];
    while stop.is_running() {
        let n = match link.read(params.endpoint, &mut buf, params.timeout) {
            Ok(0) => continue,
            Ok(n) => n.min(buf.len()),
            Err(e) => match map_usb_error(&*e) {
                LinkError::Timeout => continue,
                err if err.is_fatal() => return LoopExit::Fatal(err),
                err => return LoopExit::Failed(err),
            },
        };
        let frame = &buf[..n];
        trace!(bytes = n, text = %parser::decode(frame), "received");
        let Some(value) = parser::extract_reading(frame) else {
            continue;
        };
        let reading = Reading {
            value: value.to_owned(),
            at_ms: params.clock.ms_since(params.epoch),
        };
        if sink.emit(ScaleEvent::Reading(reading)).is_err() {
            debug!("reading sink closed; leaving read loop");
            return LoopExit::SinkClosed;
        }
    }
    LoopExit::Stopped
}
