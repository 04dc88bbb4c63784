//! Networking: REST paths, the authenticated client and its error type.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` owns bearer attachment and the refresh-on-401 cycle, `endpoints`
//! names every backend path, and `error` defines the one error value every
//! layer above surfaces to callers.

pub mod api;
pub mod endpoints;
pub mod error;

pub use api::{ApiClient, AuthSignal};
pub use error::ApiError;
