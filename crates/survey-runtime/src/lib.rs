#![allow(missing_docs)]

pub mod config;
pub mod context;
pub mod device;
pub mod runner;
pub mod sink;

pub use config::{ConfigError, RuntimeConfig};
pub use context::{ContextError, ContextProvider, FixedContext, UnavailableContext, capture_context};
pub use device::{DeviceIdentity, FileDeviceStore, StaticDevice};
pub use runner::SurveyRunner;
pub use sink::{ExportSink, JsonLinesSink, MemorySink, SinkError};
