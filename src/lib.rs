#![forbid(unsafe_code)]

//! Media Scan Router (msr) — daemon that turns system events into media
//! scan requests.
//!
//! The router listens for boot, volume-mount, and file-change events and
//! decides, per event, whether to kick off a media scan, show a consent
//! prompt, or do nothing. The decision core is a pure function; all side
//! effects (scanner invocation, prompt registration, logging) live behind
//! trait seams.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use media_scan_router::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use media_scan_router::core::config::Config;
//! use media_scan_router::router::policy::ScanRequestRouter;
//! ```

pub mod prelude;

pub mod core;
pub mod daemon;
pub mod dispatch;
pub mod logger;
pub mod router;
pub mod settings;
