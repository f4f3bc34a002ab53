//! HTTP request handlers for the gateway
//!
//! One handler per route kind. Each returns a response value; none of them
//! share mutable state.

pub mod dispatch;
pub mod health;
pub mod proxy;
