//! Response normalizer for flowplay.
//!
//! Turns raw host responses into session model updates: flattening the
//! nested container tree, merging structural items with their data records,
//! decoding HTML entities, recomputing container visibility and applying
//! the result to the [`ModelStore`](flowplay_model::ModelStore).

mod errors;
pub use errors::Error;

mod wire;
pub use wire::{
  InvokeResponse, MapElementInvokeResponse, NavigationReference, NavigationResponse,
  ObjectDataPage, PageResponse,
};

mod flatten;
pub use flatten::{flatten_tree, merge_with_data, DEFAULT_NESTED_PROPERTY};

mod decode;
pub use decode::{decode_component, HtmlTextDecoder, NoopTextDecoder, TextDecoder};

mod prune;
pub use prune::prune_visibility;

mod apply;
pub use apply::{apply_invoke_response, apply_navigation_response, apply_sync_response};
