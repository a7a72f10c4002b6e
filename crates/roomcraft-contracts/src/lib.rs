//! Shared request, response, and record shapes for the roomcraft functions.
//!
//! Nothing in this crate talks to the network. The engine crate owns the
//! gateway and backend clients; everything here is data plus pure functions
//! so it can be exercised without a running upstream.

pub mod design;
pub mod envelope;
pub mod models;
pub mod recommendations;
pub mod records;
pub mod session;
