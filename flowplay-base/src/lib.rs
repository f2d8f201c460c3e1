//! Base layer for flowplay.
//!
//! Holds the pieces every other crate builds on: the [`FlowKey`] codec that
//! addresses a running flow, the [`LookupKey`] that indexes the session model
//! store, and the merge strategies used when applying host responses.

mod errors;
pub use errors::KeyError;

mod flow_key;
pub use flow_key::{FlowKey, LookupKey};

mod merge;
pub use merge::{extend_deep, extend_object_data, extend_shallow};

/// `true` when the value is absent, empty, or whitespace-only.
pub fn is_blank(value: Option<&str>) -> bool {
  match value {
    None => true,
    Some(s) => s.trim().is_empty(),
  }
}
