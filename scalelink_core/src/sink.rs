//! Channel-backed `ReadingSink`.

use crossbeam_channel as xch;
use scalelink_traits::{ReadingSink, ScaleEvent, SinkClosed};
use std::time::Duration;

/// How long a terminal error may wait for room in a full channel.
pub const ERROR_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Forwards events into a crossbeam channel.
///
/// Emission never blocks the worker indefinitely. When a bounded channel is
/// full, readings and absent signals are dropped (and counted); a terminal
/// error waits at most `ERROR_SEND_TIMEOUT`. Emission fails once every
/// receiver is dropped, which the worker takes as an unsubscribe.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: xch::Sender<ScaleEvent>,
    dropped: u64,
}

impl ChannelSink {
    pub fn new(tx: xch::Sender<ScaleEvent>) -> Self {
        Self { tx, dropped: 0 }
    }

    pub fn unbounded() -> (Self, xch::Receiver<ScaleEvent>) {
        let (tx, rx) = xch::unbounded();
        (Self::new(tx), rx)
    }

    /// Bounded variant; events that find the channel full are dropped.
    pub fn bounded(cap: usize) -> (Self, xch::Receiver<ScaleEvent>) {
        let (tx, rx) = xch::bounded(cap);
        (Self::new(tx), rx)
    }

    /// Events discarded because the consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl ReadingSink for ChannelSink {
    fn emit(&mut self, event: ScaleEvent) -> Result<(), SinkClosed> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(xch::TrySendError::Disconnected(_)) => Err(SinkClosed),
            Err(xch::TrySendError::Full(event @ ScaleEvent::Error { .. })) => {
                match self.tx.send_timeout(event, ERROR_SEND_TIMEOUT) {
                    Ok(()) => Ok(()),
                    Err(xch::SendTimeoutError::Disconnected(_)) => Err(SinkClosed),
                    Err(xch::SendTimeoutError::Timeout(_)) => {
                        tracing::warn!("consumer not draining; terminal error dropped");
                        self.dropped += 1;
                        Ok(())
                    }
                }
            }
            Err(xch::TrySendError::Full(_)) => {
                self.dropped += 1;
                tracing::trace!(dropped = self.dropped, "reading sink full; event dropped");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalelink_traits::Reading;

    fn reading(v: &str) -> ScaleEvent {
        ScaleEvent::Reading(Reading {
            value: v.into(),
            at_ms: 0,
        })
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (mut sink, rx) = ChannelSink::bounded(1);
        sink.emit(reading("1.0")).unwrap();
        sink.emit(reading("2.0")).unwrap();
        sink.emit(ScaleEvent::Absent).unwrap();
        assert_eq!(sink.dropped(), 2);
        assert_eq!(rx.try_recv().unwrap(), reading("1.0"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn error_waits_for_room_then_gives_up() {
        let (mut sink, rx) = ChannelSink::bounded(1);
        sink.emit(ScaleEvent::Absent).unwrap();
        let start = std::time::Instant::now();
        let err = ScaleEvent::Error {
            code: "USB_ERROR".into(),
            message: "gone".into(),
        };
        sink.emit(err).unwrap();
        assert!(start.elapsed() >= ERROR_SEND_TIMEOUT);
        assert_eq!(sink.dropped(), 1);
        drop(rx);
    }

    #[test]
    fn dropped_receiver_closes_sink() {
        let (mut sink, rx) = ChannelSink::bounded(1);
        drop(rx);
        assert_eq!(sink.emit(ScaleEvent::Absent), Err(SinkClosed));
    }
}
