#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod body;
mod client;
mod config;
mod interceptor;

pub use crate::client::ReqwestTransport;
pub use crate::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS, ReqwestConfig};

/// Tracing target for reqwest transport operations.
pub const TRACING_TARGET: &str = "eazy_reqwest::client";
