//! appshelf: a cached, filterable catalog of installed applications.
//!
//! - `source`: enumerates installed apps (XDG desktop entries)
//! - `icon`: materializes icon handles into fixed-size images
//! - `catalog`: single-flight, snapshot-swapping catalog cache
//! - `query`: filter and sort over a catalog snapshot
//! - `state`: loading/success/error projection with latest-wins cancellation
//! - `service`: the installed-apps list and details streams

pub mod app;
pub mod catalog;
pub mod error;
pub mod icon;
pub mod query;
pub mod service;
pub mod source;
pub mod state;
