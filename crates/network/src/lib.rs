// crates/network/src/lib.rs
//! HTTP access to the audiobook API

mod api;
mod client;
mod error;

pub use api::ApiClient;
pub use client::{Client, ClientConfig};
pub use error::{NetworkError, NetworkResult};
