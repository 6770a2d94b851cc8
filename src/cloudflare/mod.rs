//! HTTP plumbing for the measurement endpoint.

pub mod client;
pub mod requests;

pub use client::{Client, DEFAULT_BASE_URL};
