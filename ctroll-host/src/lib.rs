//! # ctroll-host: streaming host
//!
//! Drives a remote handheld as a second screen and controller: each tick
//! the current frame goes out over the outbound channel and the newest
//! control record comes back over the inbound one.
//!
//! ## Modules
//!
//! - **config**: TOML-backed `HostConfig`.
//! - **source**: `FrameSource` and the built-in `TestPattern`.
//! - **sink**: `ControlSink` and the logging `LogSink`.
//! - **service**: `HostService`, the tick loop.

pub mod config;
pub mod service;
pub mod sink;
pub mod source;
