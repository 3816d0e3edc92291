//! Backend integration: HTTP client, wire envelopes and the request worker.

mod client;
mod wire;
mod worker;

pub use client::BackendClient;
pub use worker::BackgroundDispatcher;

/// Returns the backend module name for smoke checks.
pub fn module_name() -> &'static str {
    "backend"
}
