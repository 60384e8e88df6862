//! Core types and utilities shared by the Overture crates.
//!
//! Overture serves the JSON index documents the Composer client protocol needs
//! (`packages.json`, `p/<vendor>/<project>.json`, `p2/<vendor>/<project>.json`)
//! for hosted, proxy and group repositories. This crate holds the pieces every
//! layer agrees on:
//!
//! - [`PackageName`]: the `vendor/project` coordinate.
//! - [`json`]: the ordered document value and the sonic-rs codec.
//! - [`hash`]: deterministic version `uid`s, provider digests and content hashes.
//! - [`path`]: canonical logical paths and URL templates.
//! - [`time`]: the UTC timestamp format used in version entries.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod hash;
pub mod json;
pub mod package;
pub mod path;
pub mod time;

pub use error::{Error, Result};
pub use hash::{ContentHash, provider_digest, version_uid};
pub use json::{JsonMap, Value};
pub use package::{PackageName, is_dev_version};
pub use time::format_utc;

pub use chrono::{DateTime, Utc};
