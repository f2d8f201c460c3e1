//! Session model store for flowplay.
//!
//! One [`Session`] per [`LookupKey`](flowplay_base::LookupKey) holds the
//! normalized entity tree currently on screen: containers, components,
//! outcomes, navigation, history, notifications and faults. All mutation
//! goes through the [`ModelStore`] so concurrently in-flight requests never
//! observe a half-applied update.

mod errors;
pub use errors::Error;

mod entity;
pub use entity::{
  Component, Container, Fault, InvokeType, ItemProperty, Loading, Navigation, NavigationItem,
  Notification, ObjectDataItem, Outcome, OutcomeSummary,
};

mod session;
pub use session::{HistoryEntry, Session};

mod store;
pub use store::{Child, ModelStore};

mod history;
pub use history::{record_forward_step, record_selected_outcome, rollback_to, HistoryStep};
