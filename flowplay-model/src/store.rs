use std::collections::HashMap;

use flowplay_base::{extend_shallow, is_blank, LookupKey};
use serde_json::Value;
use tracing::debug;

use crate::entity::{
  Component, Container, InvokeType, Loading, Navigation, Notification, Outcome,
};
use crate::errors::Error;
use crate::session::Session;

/// Called with the lookup key of any session whose notification or modal
/// state changed, so a host can re-render without polling.
pub type ChangeObserver = Box<dyn Fn(&LookupKey) + Send + Sync>;

/// A child of a container, in render order.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
  Container(Container),
  Component(Component),
}

impl Child {
  fn order(&self) -> i64 {
    match self {
      Child::Container(container) => container.order,
      Child::Component(component) => component.order,
    }
  }
}

/// Owner of every live [`Session`], keyed by lookup key. All reads and
/// writes go through here.
#[derive(Default)]
pub struct ModelStore {
  sessions: HashMap<LookupKey, Session>,
  observer: Option<ChangeObserver>,
}

impl ModelStore {
  pub fn new() -> Self {
    ModelStore::default()
  }

  pub fn set_observer(&mut self, observer: ChangeObserver) {
    self.observer = Some(observer);
  }

  fn notify(&self, key: &LookupKey) {
    if let Some(observer) = &self.observer {
      observer(key);
    }
  }

  /// Create an empty session under `key`. Idempotent: an existing session
  /// is left untouched.
  pub fn add_session(&mut self, key: &LookupKey) {
    if !self.sessions.contains_key(key) {
      debug!(key = %key, "creating session");
      self.sessions.insert(key.clone(), Session::new());
    }
  }

  pub fn remove_session(&mut self, key: &LookupKey) -> Option<Session> {
    self.sessions.remove(key)
  }

  /// Re-key a session once the host has assigned its real state id.
  pub fn rename_session(&mut self, from: &LookupKey, to: &LookupKey) -> Result<(), Error> {
    if from == to {
      return Ok(());
    }
    let session = self
      .sessions
      .remove(from)
      .ok_or_else(|| Error::SessionMissing(from.clone()))?;
    self.sessions.insert(to.clone(), session);
    Ok(())
  }

  pub fn contains(&self, key: &LookupKey) -> bool {
    self.sessions.contains_key(key)
  }

  pub fn session(&self, key: &LookupKey) -> Result<&Session, Error> {
    self
      .sessions
      .get(key)
      .ok_or_else(|| Error::SessionMissing(key.clone()))
  }

  pub fn session_mut(&mut self, key: &LookupKey) -> Result<&mut Session, Error> {
    self
      .sessions
      .get_mut(key)
      .ok_or_else(|| Error::SessionMissing(key.clone()))
  }

  /// Install a freshly normalized container set, replacing whatever was on
  /// screen. Child counts start from the incoming values and are corrected
  /// as components attach.
  pub fn replace_containers(
    &mut self,
    key: &LookupKey,
    containers: Vec<Container>,
  ) -> Result<(), Error> {
    let session = self.session_mut(key)?;
    session.containers = containers
      .into_iter()
      .map(|container| (container.id.clone(), container))
      .collect();
    Ok(())
  }

  /// Install a freshly normalized component set. Each component bumps its
  /// parent container's child count; a parent whose count was never set by
  /// the flattener starts from zero.
  pub fn replace_components(
    &mut self,
    key: &LookupKey,
    components: Vec<Component>,
  ) -> Result<(), Error> {
    let session = self.session_mut(key)?;
    session.components.clear();
    for component in components {
      if let Some(parent) = session.containers.get_mut(&component.page_container_id) {
        parent.child_count += 1;
      }
      session.components.insert(component.id.clone(), component);
    }
    Ok(())
  }

  pub fn replace_outcomes(&mut self, key: &LookupKey, outcomes: Vec<Outcome>) -> Result<(), Error> {
    let session = self.session_mut(key)?;
    session.outcomes = outcomes
      .into_iter()
      .map(|outcome| (outcome.id.to_lowercase(), outcome))
      .collect();
    Ok(())
  }

  /// Shallow-merge a partial update into one component: provided top-level
  /// fields overwrite, absent fields survive. A previously invalid required
  /// component becomes valid again as soon as the update gives it content.
  pub fn update_component(
    &mut self,
    key: &LookupKey,
    component_id: &str,
    update: &Value,
  ) -> Result<(), Error> {
    let session = self.session_mut(key)?;
    let component = session
      .components
      .get_mut(component_id)
      .ok_or_else(|| Error::ComponentMissing(component_id.to_owned()))?;

    let explicit_validity = update.get("isValid").map(|v| !v.is_null()).unwrap_or(false);

    let mut merged = serde_json::to_value(&component)
      .map_err(|err| Error::InvalidShape(err.to_string()))?;
    extend_shallow(&mut merged, update);
    *component =
      serde_json::from_value(merged).map_err(|err| Error::InvalidShape(err.to_string()))?;

    if !explicit_validity && component.is_valid == Some(false) && component_has_content(component) {
      component.is_valid = Some(true);
      component.validation_message = None;
    }
    Ok(())
  }

  /// Reset every component's local state to what the screen last showed:
  /// data lists drop unselected entries, spinners and fetch errors clear.
  /// Validation is layered on unless this reset is for a background sync.
  pub fn reset_components(&mut self, key: &LookupKey, invoke_type: &InvokeType) -> Result<(), Error> {
    let session = self.session_mut(key)?;
    let validate = *invoke_type != InvokeType::Sync;
    for component in session.components.values_mut() {
      if let Some(object_data) = component.object_data.as_mut() {
        object_data.retain(|item| item.is_selected);
      }
      component.error = None;
      if validate && component.is_required {
        if component_has_content(component) {
          component.is_valid = Some(true);
          component.validation_message = None;
        } else {
          component.is_valid = Some(false);
          component.validation_message = Some("This field is required".to_owned());
        }
      }
      session.loading.remove(&component.id);
    }
    Ok(())
  }

  pub fn get_component(&self, key: &LookupKey, component_id: &str) -> Option<&Component> {
    self.sessions.get(key)?.components.get(component_id)
  }

  /// Case-insensitive lookup by developer name.
  pub fn get_component_by_name(&self, key: &LookupKey, name: &str) -> Option<&Component> {
    self.sessions.get(key)?.components.values().find(|component| {
      component
        .developer_name
        .as_deref()
        .map(|candidate| candidate.eq_ignore_ascii_case(name))
        .unwrap_or(false)
    })
  }

  pub fn get_container(&self, key: &LookupKey, container_id: &str) -> Option<&Container> {
    self.sessions.get(key)?.containers.get(container_id)
  }

  /// Outcome ids compare case-insensitively.
  pub fn get_outcome(&self, key: &LookupKey, outcome_id: &str) -> Option<&Outcome> {
    self.sessions.get(key)?.outcomes.get(&outcome_id.to_lowercase())
  }

  /// Outcomes bound to one element via its page object binding, ordered by
  /// their `order` field. With no element id, returns the unbound outcomes.
  pub fn get_outcomes(&self, key: &LookupKey, element_id: Option<&str>) -> Vec<&Outcome> {
    let session = match self.sessions.get(key) {
      Some(session) => session,
      None => return Vec::new(),
    };
    let mut outcomes: Vec<&Outcome> = session
      .outcomes
      .values()
      .filter(|outcome| match element_id {
        Some(element_id) => outcome.page_object_binding_id.as_deref() == Some(element_id),
        None => is_blank(outcome.page_object_binding_id.as_deref()),
      })
      .collect();
    outcomes.sort_by_key(|outcome| outcome.order);
    outcomes
  }

  /// Children of one container in render order. `"root"` selects the
  /// parentless containers that anchor the tree.
  pub fn get_children(&self, key: &LookupKey, container_id: &str) -> Vec<Child> {
    let session = match self.sessions.get(key) {
      Some(session) => session,
      None => return Vec::new(),
    };

    let mut children: Vec<Child> = if container_id == "root" {
      session
        .containers
        .values()
        .filter(|container| container.parent.is_none())
        .cloned()
        .map(Child::Container)
        .collect()
    } else {
      let mut children: Vec<Child> = session
        .containers
        .values()
        .filter(|container| container.parent.as_deref() == Some(container_id))
        .cloned()
        .map(Child::Container)
        .collect();
      children.extend(
        session
          .components
          .values()
          .filter(|component| component.page_container_id == container_id)
          .cloned()
          .map(Child::Component),
      );
      children
    };

    children.sort_by_key(Child::order);
    children
  }

  pub fn get_notifications(&self, key: &LookupKey, position: &str) -> Vec<Notification> {
    match self.sessions.get(key) {
      Some(session) => session
        .notifications
        .iter()
        .filter(|notification| notification.position.eq_ignore_ascii_case(position))
        .cloned()
        .collect(),
      None => Vec::new(),
    }
  }

  pub fn add_notification(&mut self, key: &LookupKey, notification: Notification) -> Result<(), Error> {
    self.session_mut(key)?.notifications.push(notification);
    self.notify(key);
    Ok(())
  }

  /// Remove one matching notification; duplicates each need their own
  /// removal.
  pub fn remove_notification(
    &mut self,
    key: &LookupKey,
    notification: &Notification,
  ) -> Result<(), Error> {
    let notifications = &mut self.session_mut(key)?.notifications;
    if let Some(index) = notifications.iter().position(|candidate| candidate == notification) {
      notifications.remove(index);
    }
    self.notify(key);
    Ok(())
  }

  pub fn get_navigation(&self, key: &LookupKey, navigation_id: &str) -> Option<&Navigation> {
    self.sessions.get(key)?.navigation.get(navigation_id)
  }

  /// The id of the first navigation configured for the session, if any.
  pub fn get_default_navigation_id(&self, key: &LookupKey) -> Option<String> {
    self.sessions.get(key)?.navigation.keys().next().cloned()
  }

  pub fn set_selected_navigation(&mut self, key: &LookupKey, navigation_id: &str) -> Result<(), Error> {
    self.session_mut(key)?.selected_navigation = Some(navigation_id.to_owned());
    self.notify(key);
    Ok(())
  }

  pub fn set_modal(&mut self, key: &LookupKey, modal: Option<Value>) -> Result<(), Error> {
    self.session_mut(key)?.modal = modal;
    self.notify(key);
    Ok(())
  }

  pub fn get_label(&self, key: &LookupKey) -> Option<String> {
    self.sessions.get(key)?.label.clone()
  }

  pub fn get_invoke_type(&self, key: &LookupKey) -> Option<InvokeType> {
    self.sessions.get(key)?.invoke_type.clone()
  }

  /// Set or clear the spinner for one element. "" marks the whole page.
  pub fn set_loading(
    &mut self,
    key: &LookupKey,
    element_id: &str,
    loading: Option<Loading>,
  ) -> Result<(), Error> {
    let session = self.session_mut(key)?;
    match loading {
      Some(loading) => {
        session.loading.insert(element_id.to_owned(), loading);
      }
      None => {
        session.loading.remove(element_id);
      }
    }
    Ok(())
  }

  /// Record or clear a component's paginated-fetch failure.
  pub fn set_component_error(
    &mut self,
    key: &LookupKey,
    component_id: &str,
    error: Option<String>,
  ) -> Result<(), Error> {
    let session = self.session_mut(key)?;
    let component = session
      .components
      .get_mut(component_id)
      .ok_or_else(|| Error::ComponentMissing(component_id.to_owned()))?;
    component.error = error;
    Ok(())
  }
}

/// A required component counts as filled when it has non-whitespace content
/// or at least one selected data item.
fn component_has_content(component: &Component) -> bool {
  if !is_blank(component.content_value.as_deref()) {
    return true;
  }
  component
    .object_data
    .as_ref()
    .map(|items| items.iter().any(|item| item.is_selected))
    .unwrap_or(false)
}
