//! HTTP client for the remote election service.
//!
//! The service owns all authoritative state: users, positions, candidates,
//! votes and the election schedule. This crate only knows how to call it.

mod client;
mod result;

pub use client::Client;
pub use result::{Error, ErrorKind, Result};
