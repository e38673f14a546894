//! Public entry point: subscribe a sink to a scale.

use crate::builder::ScaleReaderBuilder;
use crate::config::ReaderCfg;
use crate::controller::Phase;
use crate::sink::ChannelSink;
use crate::subscription::Subscription;
use crossbeam_channel as xch;
use scalelink_traits::{
    Clock, DeviceRegistry, MonotonicClock, PermissionBroker, ReadingSink, ScaleEvent,
};
use std::sync::Arc;

/// Owns the backend handles and at most one running subscription.
pub struct ScaleReader<R, P: ?Sized, K = MonotonicClock> {
    registry: Arc<R>,
    broker: Arc<P>,
    cfg: ReaderCfg,
    clock: K,
    current: Option<Subscription>,
}

impl<R, P> ScaleReader<R, P>
where
    R: DeviceRegistry + 'static,
    P: PermissionBroker + ?Sized + 'static,
{
    pub fn new(registry: Arc<R>, broker: Arc<P>, cfg: ReaderCfg) -> Self {
        Self::with_clock(registry, broker, cfg, MonotonicClock::new())
    }

    pub fn builder() -> ScaleReaderBuilder<R, P> {
        ScaleReaderBuilder::new()
    }
}

impl<B> ScaleReader<B, B>
where
    B: DeviceRegistry + PermissionBroker + 'static,
{
    /// One object serving as registry and broker (the usual case for a backend).
    pub fn with_backend(backend: Arc<B>, cfg: ReaderCfg) -> Self {
        Self::new(backend.clone(), backend, cfg)
    }
}

impl<R, P, K> ScaleReader<R, P, K>
where
    R: DeviceRegistry + 'static,
    P: PermissionBroker + ?Sized + 'static,
    K: Clock + Clone + Send + 'static,
{
    pub fn with_clock(registry: Arc<R>, broker: Arc<P>, cfg: ReaderCfg, clock: K) -> Self {
        Self {
            registry,
            broker,
            cfg,
            clock,
            current: None,
        }
    }

    /// Start streaming into `sink`.
    ///
    /// An active subscription is stopped and joined first, so two workers
    /// never run at once.
    pub fn subscribe<S: ReadingSink + 'static>(&mut self, sink: S) {
        self.unsubscribe();
        tracing::debug!("subscribing");
        self.current = Some(Subscription::spawn(
            self.registry.clone(),
            self.broker.clone(),
            sink,
            self.cfg.clone(),
            self.clock.clone(),
        ));
    }

    /// Subscribe with an unbounded channel and hand back its receiver.
    pub fn subscribe_channel(&mut self) -> xch::Receiver<ScaleEvent> {
        let (sink, rx) = ChannelSink::unbounded();
        self.subscribe(sink);
        rx
    }

    /// Stop the worker, release the device and wait for the thread. No-op when idle.
    pub fn unsubscribe(&mut self) {
        if let Some(mut sub) = self.current.take() {
            sub.stop();
            tracing::debug!("unsubscribed");
        }
    }

    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(Subscription::is_running)
    }

    pub fn phase(&self) -> Phase {
        self.current
            .as_ref()
            .map_or(Phase::Idle, Subscription::phase)
    }

    pub fn config(&self) -> &ReaderCfg {
        &self.cfg
    }
}

impl<R, P: ?Sized, K> Drop for ScaleReader<R, P, K> {
    fn drop(&mut self) {
        // Subscription's own Drop stops and joins.
        self.current.take();
    }
}
