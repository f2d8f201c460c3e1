//! Journey history: an append-only trail of forward moves with rollback.

use crate::entity::{InvokeType, Outcome, OutcomeSummary};
use crate::session::{HistoryEntry, Session};

/// The bits of a screen worth remembering in the journey trail.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryStep {
  pub id: String,
  pub name: Option<String>,
  pub label: Option<String>,
  pub content: String,
  pub outcomes: Vec<OutcomeSummary>,
}

/// Record a newly rendered screen at the end of the trail. Only forward
/// moves grow history; any other last invoke leaves it untouched. If the
/// tail entry is a placeholder left by an early outcome selection, the step
/// merges into it instead of appending.
pub fn record_forward_step(session: &mut Session, step: HistoryStep) {
  match &session.last_invoke {
    Some(InvokeType::Forward) | None => {}
    Some(_) => return,
  }

  let merge_into_placeholder =
    matches!(session.history.last(), Some(entry) if entry.id.is_empty());
  if !merge_into_placeholder {
    session.history.push(HistoryEntry::default());
  }
  if let Some(entry) = session.history.last_mut() {
    entry.id = step.id;
    entry.name = step.name;
    entry.label = step.label;
    entry.content = step.content;
    entry.outcomes = step.outcomes;
  }
}

/// Remember which outcome the user picked on the current screen and the
/// invoke type it was sent with. Selecting before any step was recorded
/// creates a placeholder entry for the next forward step to fill in.
pub fn record_selected_outcome(
  session: &mut Session,
  outcome: Option<&Outcome>,
  invoke_type: InvokeType,
) {
  if session.history.is_empty() {
    session.history.push(HistoryEntry::default());
  }
  if let Some(entry) = session.history.last_mut() {
    entry.selected_outcome = outcome.cloned();
  }
  session.last_invoke = Some(invoke_type);
}

/// Rewind the trail so the entry for `map_element_id` is the newest one.
/// An id that never appears drains the trail completely.
pub fn rollback_to(session: &mut Session, map_element_id: &str) {
  while let Some(entry) = session.history.last() {
    if entry.id == map_element_id {
      return;
    }
    session.history.pop();
  }
}
