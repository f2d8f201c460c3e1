use std::collections::HashMap;

use crate::entity::{
  Component, Container, Fault, InvokeType, Loading, Navigation, Notification, Outcome,
  OutcomeSummary,
};

/// One visited step in the session's journey, recorded while moving forward.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct HistoryEntry {
  pub id: String,
  pub name: Option<String>,
  pub label: Option<String>,
  pub content: String,
  pub outcomes: Vec<OutcomeSummary>,
  pub selected_outcome: Option<Outcome>,
}

/// All client-side state for one running flow instance.
///
/// Entity maps hold whatever the latest applied response put on screen;
/// `outcomes` is keyed by lower-cased id. `loading` is keyed by the element
/// id owning the spinner, with "" meaning the whole page.
#[derive(Debug, Default)]
pub struct Session {
  pub containers: HashMap<String, Container>,
  pub components: HashMap<String, Component>,
  pub outcomes: HashMap<String, Outcome>,
  pub navigation: HashMap<String, Navigation>,

  pub history: Vec<HistoryEntry>,
  pub notifications: Vec<Notification>,
  pub root_faults: Vec<Fault>,

  pub state_values: Option<serde_json::Value>,
  pub pre_commit_state_values: Option<serde_json::Value>,
  pub attributes: Option<serde_json::Value>,

  pub label: Option<String>,
  pub wait_message: Option<String>,
  pub parent_state_id: Option<String>,
  pub vote: Option<serde_json::Value>,
  pub modal: Option<serde_json::Value>,

  pub invoke_type: Option<InvokeType>,
  /// The invoke type of the last request this client sent, driving whether
  /// history keeps growing. `None` until the first selection, which history
  /// recording treats the same as a forward move.
  pub last_invoke: Option<InvokeType>,
  pub selected_navigation: Option<String>,

  pub state_id: Option<String>,
  pub state_token: Option<String>,
  pub current_map_element_id: Option<String>,

  pub loading: HashMap<String, Loading>,

  invoke_seq: u64,
}

impl Session {
  pub fn new() -> Self {
    Session::default()
  }

  /// Fence a new outbound invoke: bumps the sequence and returns the token
  /// the eventual response must present to be applied.
  pub fn begin_invoke(&mut self) -> u64 {
    self.invoke_seq += 1;
    self.invoke_seq
  }

  /// True only for the most recently issued invoke token. Stale responses
  /// carry older tokens and must be discarded.
  pub fn is_current_invoke(&self, token: u64) -> bool {
    self.invoke_seq == token
  }

  /// Drop everything tied to the previous screen before a new one lands.
  /// History, navigation and identity survive.
  pub fn clear_screen(&mut self) {
    self.containers.clear();
    self.components.clear();
    self.outcomes.clear();
    self.root_faults.clear();
    self.label = None;
    self.state_values = None;
    self.pre_commit_state_values = None;
  }

  pub fn is_loading(&self) -> bool {
    !self.loading.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::Session;

  #[test]
  fn invoke_fencing_discards_stale_tokens() {
    let mut session = Session::new();
    let first = session.begin_invoke();
    assert!(session.is_current_invoke(first));

    let second = session.begin_invoke();
    assert!(!session.is_current_invoke(first));
    assert!(session.is_current_invoke(second));
  }

  #[test]
  fn clear_screen_keeps_history_and_identity() {
    let mut session = Session::new();
    session.state_id = Some("state1".to_owned());
    session.label = Some("Step one".to_owned());
    session.history.push(super::HistoryEntry::default());
    session.containers.insert("c1".to_owned(), Default::default());

    session.clear_screen();

    assert_eq!(session.state_id.as_deref(), Some("state1"));
    assert_eq!(session.history.len(), 1);
    assert_eq!(session.label, None);
    assert!(session.containers.is_empty());
  }
}
