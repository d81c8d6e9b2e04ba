//! Request domain: the read-only view of a host request that log variables
//! draw from.

pub mod domain;

pub use domain::{Field, OwnedRequest, RequestView};
