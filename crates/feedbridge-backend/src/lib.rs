//! # feedbridge-backend
//!
//! Client for the social-feed backend's REST API.
//!
//! [`Backend`] is the seam the rest of the bridge depends on;
//! [`BackendClient`] implements it over `reqwest`. [`wire`] holds the JSON
//! shapes, which the realtime crate reuses to decode push payloads.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod traits;
pub mod wire;

pub use client::{BackendClient, ClientConfig};
pub use errors::{BackendError, Result};
pub use traits::Backend;
