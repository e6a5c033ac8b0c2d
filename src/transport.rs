//! HTTP transport for the booking API.

pub mod http;

pub use http::{HttpTransport, TransportError};
