// include commonly used traits
pub mod prelude {
  pub use flowplay_engine::{NetworkClient, RenderHook};
  pub use flowplay_response::TextDecoder;
}

pub mod key {
  pub use flowplay_base::{FlowKey, KeyError, LookupKey};
}

pub mod merge {
  pub use flowplay_base::{extend_deep, extend_object_data, extend_shallow};
}

pub mod model {
  pub use flowplay_model::{
    record_forward_step, record_selected_outcome, rollback_to, Child, Component, Container, Error,
    Fault, HistoryEntry, HistoryStep, InvokeType, ItemProperty, Loading, ModelStore, Navigation,
    NavigationItem, Notification, ObjectDataItem, Outcome, OutcomeSummary, Session,
  };
}

pub mod response {
  pub use flowplay_response::{
    apply_invoke_response, apply_navigation_response, apply_sync_response, decode_component,
    flatten_tree, merge_with_data, prune_visibility, HtmlTextDecoder, InvokeResponse,
    NavigationResponse, NoopTextDecoder, ObjectDataPage, PageResponse, DEFAULT_NESTED_PROPERTY,
  };
}

pub use flowplay_engine::{paths, Method, NetworkError, RequestHeaders};
pub use flowplay_engine::{Engine, EngineError, EngineOptions, NoopRenderHook};
