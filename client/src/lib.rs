//! # client
//!
//! Typed SDK for the BasketEasy team-management backend.
//!
//! Layers, bottom up: a persistent credential [`storage`], the authenticated
//! HTTP client in [`net`] (bearer header, one refresh-and-retry on 401), the
//! [`session`] state machine, the keyed read cache in [`query`], and the
//! [`resources`] bindings for auth, teams and users. [`app::App`] owns one of
//! each and is the entry point for front ends.

pub mod app;
pub mod config;
pub mod feedback;
pub mod net;
pub mod query;
pub mod resources;
pub mod session;
pub mod storage;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use app::App;
pub use config::ClientConfig;
pub use net::ApiError;
