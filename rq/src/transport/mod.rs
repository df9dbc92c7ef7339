//! Transport seam
//!
//! The scheduler never performs network I/O itself. A [`Transport`] turns an
//! opaque request into an opaque response, and classifies failures through
//! [`TransportError`]: the scheduler only needs to know whether a failure was
//! a rate-limit rejection and whether the server suggested a delay.

mod error;
mod http;
mod simulated;

pub use error::TransportError;
pub use http::{HttpRequest, HttpResponse, HttpTransport, HttpTransportConfig};
pub use simulated::{SimulatedConfig, SimulatedTransport};

use async_trait::async_trait;

/// Performs the actual outbound call for a request descriptor
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opaque request payload carried by a descriptor
    type Request: Send + Sync + 'static;

    /// Opaque result; cloned when served from the cache
    type Response: Clone + Send + Sync + 'static;

    /// Dispatch one request
    ///
    /// Called at most once at a time per scheduler. A rate-limit rejection
    /// must be reported as [`TransportError::RateLimited`] to be retried.
    async fn dispatch(&self, request: &Self::Request) -> Result<Self::Response, TransportError>;
}
