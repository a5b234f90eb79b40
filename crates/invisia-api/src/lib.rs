// invisia-api: Async Rust client for the Invisia cockpit API

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod response;
pub mod transport;

pub use auth::{Credentials, TokenManager};
pub use client::InvisiaClient;
pub use endpoints::EndpointRequest;
pub use error::Error;
pub use response::RawResponse;
pub use transport::{TlsMode, TransportConfig};

/// Production host of the vendor backend.
pub const DEFAULT_BASE_URL: &str = "https://app.invisia.ch";
