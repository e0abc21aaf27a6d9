//! Cached, role-gated data access for a construction back office.
//!
//! Reads flow through [`cache::CacheLayer`], which fronts the remote API and
//! a local fallback store. A [`session::Session`] pairs the cache with the
//! [`access::AccessGate`] of the signed-in role so that nothing is fetched
//! for a page the role may not open.

pub mod access;
pub mod cache;
pub mod domain;
pub mod error;
pub mod navigation;
pub mod remote;
pub mod render;
pub mod session;
pub mod store;
