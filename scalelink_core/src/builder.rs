//! Builder for `ScaleReader`.
//!
//! Registry and broker are required; config defaults to the CH340 scale
//! constants and the clock to `MonotonicClock`. `build()` validates both.

use crate::config::ReaderCfg;
use crate::error::BuildError;
use crate::reader::ScaleReader;
use scalelink_traits::{Clock, DeviceRegistry, MonotonicClock, PermissionBroker};
use std::sync::Arc;

pub struct ScaleReaderBuilder<R, P: ?Sized, K = MonotonicClock> {
    registry: Option<Arc<R>>,
    broker: Option<Arc<P>>,
    cfg: ReaderCfg,
    clock: K,
}

impl<R, P: ?Sized> ScaleReaderBuilder<R, P> {
    pub fn new() -> Self {
        Self {
            registry: None,
            broker: None,
            cfg: ReaderCfg::default(),
            clock: MonotonicClock::new(),
        }
    }
}

impl<R, P: ?Sized> Default for ScaleReaderBuilder<R, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> ScaleReaderBuilder<B, B> {
    /// Use one object as both registry and broker.
    pub fn with_backend(mut self, backend: Arc<B>) -> Self {
        self.registry = Some(backend.clone());
        self.broker = Some(backend);
        self
    }
}

impl<R, P: ?Sized, K> ScaleReaderBuilder<R, P, K> {
    pub fn with_registry(mut self, registry: Arc<R>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_broker(mut self, broker: Arc<P>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn with_config(mut self, cfg: ReaderCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn with_clock<K2>(self, clock: K2) -> ScaleReaderBuilder<R, P, K2> {
        ScaleReaderBuilder {
            registry: self.registry,
            broker: self.broker,
            cfg: self.cfg,
            clock,
        }
    }
}

impl<R, P, K> ScaleReaderBuilder<R, P, K>
where
    R: DeviceRegistry + 'static,
    P: PermissionBroker + ?Sized + 'static,
    K: Clock + Clone + Send + 'static,
{
    pub fn build(self) -> Result<ScaleReader<R, P, K>, BuildError> {
        let registry = self.registry.ok_or(BuildError::MissingRegistry)?;
        let broker = self.broker.ok_or(BuildError::MissingBroker)?;
        self.cfg.validate()?;
        Ok(ScaleReader::with_clock(registry, broker, self.cfg, self.clock))
    }
}
