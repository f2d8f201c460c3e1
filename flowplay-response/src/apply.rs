//! Application of host responses to the session model.

use flowplay_base::{extend_shallow, is_blank, LookupKey};
use flowplay_model::{
  record_forward_step, Component, Container, Fault, HistoryStep, InvokeType, Loading, ModelStore,
  Navigation, NavigationItem, Notification, Outcome, OutcomeSummary,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::decode::{decode_component, TextDecoder};
use crate::errors::Error;
use crate::flatten::{flatten_tree, merge_with_data, DEFAULT_NESTED_PROPERTY};
use crate::prune::prune_visibility;
use crate::wire::{InvokeResponse, NavigationResponse};

const DEFAULT_WAIT_MESSAGE: &str = "Just a moment...";
const DEFAULT_NOT_AUTHORIZED_MESSAGE: &str = "You are not authorized to view this content.";
const PRESENTATION_COMPONENT: &str = "PRESENTATION";

fn shape_err(err: serde_json::Error) -> Error {
  Error::MalformedResponse(err.to_string())
}

/// Apply a full-page invoke response: replaces the on-screen entity tree,
/// re-prunes visibility, surfaces faults and records history for forward
/// moves.
pub fn apply_invoke_response(
  store: &mut ModelStore,
  key: &LookupKey,
  response: &InvokeResponse,
  decoder: &dyn TextDecoder,
  record_history: bool,
) -> Result<(), Error> {
  let map_element = response.map_element_invoke_responses.get(0);

  let mut containers: Vec<Container> = Vec::new();
  let mut components: Vec<Component> = Vec::new();
  let mut outcomes: Vec<Outcome> = Vec::new();
  let mut label = None;
  let mut attributes = None;
  if let Some(map_element) = map_element {
    outcomes = map_element.outcome_responses.clone();
    if let Some(page) = &map_element.page_response {
      label = page.label.clone();
      attributes = page.attributes.clone();

      let flat = flatten_tree(&page.page_container_responses, None, DEFAULT_NESTED_PROPERTY);
      for value in merge_with_data(&flat, &page.page_container_data_responses, "pageContainerId") {
        containers.push(serde_json::from_value(value).map_err(shape_err)?);
      }
      for value in merge_with_data(
        &page.page_component_responses,
        &page.page_component_data_responses,
        "pageComponentId",
      ) {
        let mut component: Component = serde_json::from_value(value).map_err(shape_err)?;
        decode_component(&mut component, decoder);
        components.push(component);
      }
    }
  }

  let step_name = map_element.and_then(|m| m.developer_name.clone());
  let step_id = response
    .current_map_element_id
    .clone()
    .or_else(|| map_element.and_then(|m| m.map_element_id.clone()))
    .unwrap_or_default();
  let step_content = components
    .iter()
    .find(|component| component.component_type.as_deref() == Some(PRESENTATION_COMPONENT))
    .and_then(|component| component.content_value.clone())
    .unwrap_or_default();

  let mut faults: Vec<Fault> = Vec::new();
  collect_faults(&mut faults, response.root_faults.as_ref());
  collect_faults(&mut faults, map_element.and_then(|m| m.root_faults.as_ref()));

  debug!(
    key = %key,
    invoke_type = ?response.invoke_type,
    containers = containers.len(),
    components = components.len(),
    "applying invoke response"
  );

  {
    let session = store.session_mut(key)?;
    session.clear_screen();
    session.notifications.clear();
    session.parent_state_id = response.parent_state_id.clone();
    session.invoke_type = response.invoke_type.clone();
    session.wait_message = response
      .not_authorized_message
      .clone()
      .filter(|message| !is_blank(Some(message.as_str())))
      .or_else(|| response.wait_message.clone());
    session.vote = response.vote_response.clone();
    session.state_values = response.state_values.clone();
    session.pre_commit_state_values = response.pre_commit_state_values.clone();
    session.attributes = attributes;
    session.label = label.clone();
  }
  store.replace_containers(key, containers)?;
  store.replace_components(key, components)?;
  store.replace_outcomes(key, outcomes.clone())?;
  prune_visibility(store.session_mut(key)?);

  if !faults.is_empty() {
    let session = store.session_mut(key)?;
    session.loading.remove("");
    session.root_faults = faults.clone();
    for fault in &faults {
      warn!(key = %key, fault = %fault.message.as_deref().unwrap_or("unknown"), "host fault");
    }
    for fault in faults {
      let message = fault.message.unwrap_or_else(|| "An unknown fault occurred".to_owned());
      store.add_notification(key, Notification::danger(&message, true))?;
    }
  }

  match response.invoke_type {
    Some(InvokeType::Forward) => {
      if record_history {
        let step = HistoryStep {
          id: step_id,
          name: step_name,
          label,
          content: step_content,
          outcomes: outcomes
            .iter()
            .map(|outcome| OutcomeSummary {
              id: outcome.id.clone(),
              name: outcome.developer_name.clone(),
              label: outcome.label.clone(),
              order: outcome.order,
            })
            .collect(),
        };
        record_forward_step(store.session_mut(key)?, step);
      }
    }
    Some(InvokeType::NotAllowed) => {
      let message = response
        .not_authorized_message
        .clone()
        .filter(|message| !is_blank(Some(message.as_str())))
        .unwrap_or_else(|| DEFAULT_NOT_AUTHORIZED_MESSAGE.to_owned());
      store.add_notification(
        key,
        Notification {
          message,
          position: "center".to_owned(),
          kind: "danger".to_owned(),
          timeout: "0".to_owned(),
          dismissible: false,
        },
      )?;
    }
    Some(InvokeType::Wait) => {
      let message = response
        .wait_message
        .clone()
        .filter(|message| !is_blank(Some(message.as_str())))
        .unwrap_or_else(|| DEFAULT_WAIT_MESSAGE.to_owned());
      store
        .session_mut(key)?
        .loading
        .insert(String::new(), Loading::new(&message));
    }
    _ => {}
  }

  Ok(())
}

fn collect_faults(faults: &mut Vec<Fault>, raw: Option<&serde_json::Map<String, Value>>) {
  if let Some(raw) = raw {
    for (name, value) in raw {
      let fault = match value {
        Value::String(text) => Fault::parse(name, text),
        other => {
          let mut fault = serde_json::from_value::<Fault>(other.clone()).unwrap_or_default();
          if fault.message.is_none() {
            fault.message = Some(other.to_string());
          }
          fault.name = Some(name.clone());
          fault
        }
      };
      faults.push(fault);
    }
  }
}

/// Apply a sync response: data-only merges onto the entities already on
/// screen, then a re-prune. The structural tree is not replaced.
///
/// A step only ever has one container and the host reports it under the
/// step's own id, so for step elements data lands on the root container.
pub fn apply_sync_response(
  store: &mut ModelStore,
  key: &LookupKey,
  response: &InvokeResponse,
  decoder: &dyn TextDecoder,
) -> Result<(), Error> {
  let map_element = match response.map_element_invoke_responses.get(0) {
    Some(map_element) => map_element,
    None => return Ok(()),
  };
  let is_step = map_element
    .developer_name
    .as_deref()
    .map(|name| name.eq_ignore_ascii_case("step"))
    .unwrap_or(false);
  let page = match &map_element.page_response {
    Some(page) => page,
    None => return Ok(()),
  };

  let session = store.session_mut(key)?;
  let root_container_id = session
    .containers
    .values()
    .find(|container| container.parent.is_none())
    .map(|container| container.id.clone());

  for data in &page.page_container_data_responses {
    let target = if is_step {
      root_container_id.clone()
    } else {
      data.get("pageContainerId").and_then(Value::as_str).map(str::to_owned)
    };
    if let Some(target) = target {
      if let Some(container) = session.containers.get_mut(&target) {
        merge_entity(container, data)?;
      }
    }
  }

  for data in &page.page_component_data_responses {
    if let Some(id) = data.get("pageComponentId").and_then(Value::as_str) {
      if let Some(component) = session.components.get_mut(id) {
        merge_entity(component, data)?;
        decode_component(component, decoder);
      }
    }
  }

  prune_visibility(session);
  Ok(())
}

fn merge_entity<T>(entity: &mut T, data: &Value) -> Result<(), Error>
where
  T: serde::Serialize + serde::de::DeserializeOwned,
{
  let mut merged = serde_json::to_value(&*entity).map_err(shape_err)?;
  extend_shallow(&mut merged, data);
  *entity = serde_json::from_value(merged).map_err(shape_err)?;
  Ok(())
}

/// Rebuild one navigation entry from its fetch response. Items merge with
/// their data records by id and nest recursively; the current item is
/// whichever the data marked, falling back to matching the session's
/// current map element.
pub fn apply_navigation_response(
  store: &mut ModelStore,
  key: &LookupKey,
  navigation_id: &str,
  response: &NavigationResponse,
  current_map_element_id: Option<&str>,
) -> Result<(), Error> {
  let mut items = build_navigation_items(
    &response.navigation_item_responses,
    &response.navigation_item_data_responses,
  )?;
  if let Some(current) = current_map_element_id {
    mark_current(&mut items, current);
  }

  let navigation = Navigation {
    id: navigation_id.to_owned(),
    developer_name: response.developer_name.clone(),
    label: response.label.clone(),
    culture: response.culture.clone(),
    tags: response.tags.clone(),
    is_visible: response.is_visible.unwrap_or(true),
    is_enabled: response.is_enabled.unwrap_or(true),
    items,
  };

  store
    .session_mut(key)?
    .navigation
    .insert(navigation_id.to_owned(), navigation);
  Ok(())
}

fn build_navigation_items(items: &[Value], data: &[Value]) -> Result<Vec<NavigationItem>, Error> {
  let mut built = Vec::new();
  for item in items {
    let mut merged = item.clone();
    if let Some(id) = item.get("id").and_then(Value::as_str) {
      let record = data
        .iter()
        .find(|record| record.get("navigationItemId").and_then(Value::as_str) == Some(id));
      if let Some(record) = record {
        extend_shallow(&mut merged, record);
      }
    }
    let children = match &mut merged {
      Value::Object(map) => map.remove("navigationItemResponses"),
      _ => None,
    };
    let mut built_item: NavigationItem = serde_json::from_value(merged).map_err(shape_err)?;
    if let Some(Value::Array(children)) = children {
      built_item.items = build_navigation_items(&children, data)?;
    }
    built.push(built_item);
  }
  built.sort_by_key(|item| item.order);
  Ok(built)
}

fn mark_current(items: &mut [NavigationItem], current_map_element_id: &str) {
  for item in items {
    if item.location_map_element_id.as_deref() == Some(current_map_element_id) {
      item.is_current = true;
    }
    mark_current(&mut item.items, current_map_element_id);
  }
}

#[cfg(test)]
mod tests {
  use flowplay_base::LookupKey;
  use flowplay_model::{InvokeType, ModelStore};
  use serde_json::json;

  use super::{apply_invoke_response, apply_navigation_response, apply_sync_response};
  use crate::decode::HtmlTextDecoder;
  use crate::wire::{InvokeResponse, NavigationResponse};

  fn store_with_session() -> (ModelStore, LookupKey) {
    let mut store = ModelStore::new();
    let key = LookupKey::from_raw("t1_s1");
    store.add_session(&key);
    (store, key)
  }

  fn page_invoke_response() -> InvokeResponse {
    serde_json::from_value(json!({
      "stateId": "s1",
      "currentMapElementId": "m1",
      "invokeType": "FORWARD",
      "mapElementInvokeResponses": [{
        "mapElementId": "m1",
        "developerName": "First Step",
        "pageResponse": {
          "label": "Step One",
          "pageContainerResponses": [{
            "id": "c1",
            "containerType": "VERTICAL_FLOW",
            "pageContainerResponses": [{ "id": "c2" }],
          }],
          "pageComponentResponses": [{
            "id": "x1",
            "pageContainerId": "c1",
            "componentType": "INPUT",
            "contentType": null,
          }],
          "pageComponentDataResponses": [{
            "pageComponentId": "x1",
            "contentValue": "Fish &amp; Chips",
            "isVisible": true,
          }],
        },
        "outcomeResponses": [
          { "id": "OUT-1", "developerName": "Next", "order": 1 },
        ],
      }],
    }))
    .unwrap()
  }

  #[test]
  fn invoke_response_populates_and_prunes_the_session() {
    let (mut store, key) = store_with_session();
    apply_invoke_response(&mut store, &key, &page_invoke_response(), &HtmlTextDecoder, true)
      .unwrap();

    let session = store.session(&key).unwrap();
    assert_eq!(session.containers.len(), 2);
    assert_eq!(session.components.len(), 1);
    assert_eq!(session.outcomes.len(), 1);
    assert_eq!(session.label.as_deref(), Some("Step One"));
    assert_eq!(session.invoke_type, Some(InvokeType::Forward));

    // Data merged, entities decoded, null contentType canonicalized.
    let component = store.get_component(&key, "x1").unwrap();
    assert_eq!(component.content_value.as_deref(), Some("Fish & Chips"));
    assert_eq!(component.content_type.as_deref(), Some("ContentString"));

    // c1 holds a visible component, its empty child goes invisible.
    assert!(store.get_container(&key, "c1").unwrap().is_visible);
    assert!(!store.get_container(&key, "c2").unwrap().is_visible);

    // Case-insensitive outcome lookup over the replaced set.
    assert!(store.get_outcome(&key, "out-1").is_some());
  }

  #[test]
  fn forward_invoke_appends_history() {
    let (mut store, key) = store_with_session();
    apply_invoke_response(&mut store, &key, &page_invoke_response(), &HtmlTextDecoder, true)
      .unwrap();

    let session = store.session(&key).unwrap();
    assert_eq!(session.history.len(), 1);
    assert_eq!(session.history[0].id, "m1");
    assert_eq!(session.history[0].outcomes.len(), 1);
    assert_eq!(session.history[0].outcomes[0].name.as_deref(), Some("Next"));
  }

  #[test]
  fn history_can_be_disabled() {
    let (mut store, key) = store_with_session();
    apply_invoke_response(&mut store, &key, &page_invoke_response(), &HtmlTextDecoder, false)
      .unwrap();
    assert!(store.session(&key).unwrap().history.is_empty());
  }

  #[test]
  fn root_faults_surface_as_danger_notifications() {
    let (mut store, key) = store_with_session();
    let response: InvokeResponse = serde_json::from_value(json!({
      "invokeType": "FORWARD",
      "rootFaults": {
        "fault1": "plain broken",
        "fault2": "{\"message\": \"structured broken\", \"responseCode\": 500}",
      },
    }))
    .unwrap();

    apply_invoke_response(&mut store, &key, &response, &HtmlTextDecoder, false).unwrap();

    let session = store.session(&key).unwrap();
    assert_eq!(session.root_faults.len(), 2);
    let notifications = store.get_notifications(&key, "center");
    assert_eq!(notifications.len(), 2);
    assert!(notifications.iter().all(|n| n.kind == "danger" && n.dismissible));
    assert!(notifications.iter().any(|n| n.message == "structured broken"));
  }

  #[test]
  fn not_allowed_pushes_a_non_dismissible_notification() {
    let (mut store, key) = store_with_session();
    let response: InvokeResponse =
      serde_json::from_value(json!({ "invokeType": "NOT_ALLOWED" })).unwrap();
    apply_invoke_response(&mut store, &key, &response, &HtmlTextDecoder, false).unwrap();

    let notifications = store.get_notifications(&key, "center");
    assert_eq!(notifications.len(), 1);
    assert!(!notifications[0].dismissible);
  }

  #[test]
  fn wait_sets_the_page_loading_marker() {
    let (mut store, key) = store_with_session();
    let response: InvokeResponse = serde_json::from_value(json!({
      "invokeType": "WAIT",
      "waitMessage": "Crunching numbers",
    }))
    .unwrap();
    apply_invoke_response(&mut store, &key, &response, &HtmlTextDecoder, false).unwrap();

    let session = store.session(&key).unwrap();
    assert_eq!(session.loading.get("").map(|l| l.message.as_str()), Some("Crunching numbers"));
  }

  #[test]
  fn not_authorized_message_overrides_the_wait_message() {
    let (mut store, key) = store_with_session();
    let response: InvokeResponse = serde_json::from_value(json!({
      "invokeType": "WAIT",
      "waitMessage": "Crunching numbers",
      "notAuthorizedMessage": "Authorize first",
    }))
    .unwrap();
    apply_invoke_response(&mut store, &key, &response, &HtmlTextDecoder, false).unwrap();

    let session = store.session(&key).unwrap();
    assert_eq!(session.wait_message.as_deref(), Some("Authorize first"));
  }

  #[test]
  fn sync_merges_data_without_replacing_structure() {
    let (mut store, key) = store_with_session();
    apply_invoke_response(&mut store, &key, &page_invoke_response(), &HtmlTextDecoder, true)
      .unwrap();

    let sync: InvokeResponse = serde_json::from_value(json!({
      "invokeType": "SYNC",
      "mapElementInvokeResponses": [{
        "developerName": "First Step",
        "pageResponse": {
          "pageComponentDataResponses": [{
            "pageComponentId": "x1",
            "contentValue": "updated",
          }],
        },
      }],
    }))
    .unwrap();
    apply_sync_response(&mut store, &key, &sync, &HtmlTextDecoder).unwrap();

    let component = store.get_component(&key, "x1").unwrap();
    assert_eq!(component.content_value.as_deref(), Some("updated"));
    assert_eq!(store.session(&key).unwrap().containers.len(), 2);
  }

  #[test]
  fn sync_step_data_lands_on_the_root_container() {
    let (mut store, key) = store_with_session();
    apply_invoke_response(&mut store, &key, &page_invoke_response(), &HtmlTextDecoder, true)
      .unwrap();

    let sync: InvokeResponse = serde_json::from_value(json!({
      "invokeType": "SYNC",
      "mapElementInvokeResponses": [{
        "developerName": "step",
        "pageResponse": {
          "pageContainerDataResponses": [{
            "pageContainerId": "not-a-model-id",
            "label": "Step Label",
          }],
        },
      }],
    }))
    .unwrap();
    apply_sync_response(&mut store, &key, &sync, &HtmlTextDecoder).unwrap();

    assert_eq!(store.get_container(&key, "c1").unwrap().label.as_deref(), Some("Step Label"));
  }

  #[test]
  fn navigation_response_builds_nested_marked_items() {
    let (mut store, key) = store_with_session();
    let response: NavigationResponse = serde_json::from_value(json!({
      "developerName": "Main Nav",
      "isEnabled": true,
      "navigationItemResponses": [
        {
          "id": "n2",
          "developerName": "Second",
          "order": 2,
          "navigationItemResponses": [{
            "id": "n2a",
            "locationMapElementId": "m1",
            "order": 1,
          }],
        },
        { "id": "n1", "developerName": "First", "order": 1 },
      ],
      "navigationItemDataResponses": [
        { "navigationItemId": "n1", "isEnabled": false },
      ],
    }))
    .unwrap();

    apply_navigation_response(&mut store, &key, "nav1", &response, Some("m1")).unwrap();

    let navigation = store.get_navigation(&key, "nav1").unwrap();
    assert_eq!(navigation.items.len(), 2);
    assert_eq!(navigation.items[0].id, "n1");
    assert!(!navigation.items[0].is_enabled);
    assert!(navigation.items[1].items[0].is_current);
  }
}
