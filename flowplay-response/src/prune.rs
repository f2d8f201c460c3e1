use std::collections::HashMap;

use flowplay_base::is_blank;
use flowplay_model::Session;

/// Recompute container visibility bottom-up over the flat entity maps.
///
/// A container is visible iff it has at least one visible child component,
/// at least one outcome bound to it, at least one visible child container,
/// or a non-blank label. Child containers are settled before their parents,
/// so the pass is a single explicit depth-first traversal. Running it twice
/// yields the same flags as running it once.
pub fn prune_visibility(session: &mut Session) {
  let mut children: HashMap<String, Vec<String>> = HashMap::new();
  let mut roots: Vec<String> = Vec::new();
  for container in session.containers.values() {
    match &container.parent {
      Some(parent) => children.entry(parent.clone()).or_default().push(container.id.clone()),
      None => roots.push(container.id.clone()),
    }
  }
  for root in &roots {
    prune_container(session, &children, root);
  }
}

fn prune_container(
  session: &mut Session,
  children: &HashMap<String, Vec<String>>,
  container_id: &str,
) -> bool {
  let mut any_visible_child_container = false;
  if let Some(child_ids) = children.get(container_id) {
    for child_id in child_ids.clone() {
      if prune_container(session, children, &child_id) {
        any_visible_child_container = true;
      }
    }
  }

  let any_visible_component = session
    .components
    .values()
    .any(|component| component.page_container_id == container_id && component.is_visible);
  let any_bound_outcome = session
    .outcomes
    .values()
    .any(|outcome| outcome.page_container_id.as_deref() == Some(container_id));
  let has_label = session
    .containers
    .get(container_id)
    .map(|container| !is_blank(container.label.as_deref()))
    .unwrap_or(false);

  let visible =
    any_visible_child_container || any_visible_component || any_bound_outcome || has_label;
  if let Some(container) = session.containers.get_mut(container_id) {
    container.is_visible = visible;
  }
  visible
}
