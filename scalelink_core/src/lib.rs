#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Scale acquisition and read loop (backend-agnostic).
//!
//! This crate finds a CH340 serial adapter, gets access to it, programs the
//! serial line and streams decimal weight readings to a sink. All USB access
//! goes through the `scalelink_traits` capability traits.
//!
//! ## Architecture
//!
//! - **Matching**: first device with the configured VID and an accepted PID (`matcher`)
//! - **Access**: out-of-band permission requests, re-polled (`permission`)
//! - **Link**: open, force-claim, SET_CONTROL_LINE_STATE, SET_LINE_CODING (`link`)
//! - **Endpoint**: first bulk-IN endpoint of the claimed interface (`endpoint`)
//! - **Reading**: bounded bulk reads, `digits.digits` token extraction (`read_loop`, `parser`)
//! - **Control**: explicit state machine with fixed backoffs (`controller`)
//! - **Lifecycle**: one worker thread per subscription, joined on stop (`subscription`, `reader`)
//!
//! ## Example
//!
//! ```no_run
//! use scalelink_core::{ReaderCfg, ScaleReader};
//! use scalelink_core::mocks::FakeBus;
//! use std::sync::Arc;
//!
//! let bus = Arc::new(FakeBus::with_device(FakeBus::ch340(1)));
//! let mut reader = ScaleReader::with_backend(bus, ReaderCfg::default());
//! let events = reader.subscribe_channel();
//! for event in events.iter().take(3) {
//!     println!("{event:?}");
//! }
//! reader.unsubscribe();
//! ```

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod endpoint;
pub mod error;
pub mod link;
pub mod matcher;
pub mod mocks;
pub mod parser;
pub mod permission;
pub mod read_loop;
pub mod reader;
pub mod sink;
pub mod stop;
pub mod subscription;
pub mod usb_error;

pub use builder::ScaleReaderBuilder;
pub use config::{
    BackoffCfg, ControlLines, DeviceFilter, LineCoding, Parity, ReaderCfg, StopBits, Timeouts,
};
pub use controller::{Phase, State};
pub use error::{BuildError, LinkError, USB_ERROR_CODE};
pub use parser::extract_reading;
pub use reader::ScaleReader;
pub use sink::ChannelSink;
pub use usb_error::map_usb_error;

pub use scalelink_traits::{Reading, ReadingSink, ScaleEvent, SinkClosed};
