//! Wire shapes of host responses. Structural trees stay as raw JSON values
//! until the flattener and data merger have run; only then do entities take
//! their typed form.

use flowplay_model::{InvokeType, ObjectDataItem, Outcome};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope of initialize, invoke, join and sync calls.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvokeResponse {
  pub state_id: Option<String>,
  pub state_token: Option<String>,
  pub current_map_element_id: Option<String>,
  pub parent_state_id: Option<String>,
  pub invoke_type: Option<InvokeType>,
  pub wait_message: Option<String>,
  pub not_authorized_message: Option<String>,
  pub vote_response: Option<Value>,
  #[serde(deserialize_with = "null_default")]
  pub map_element_invoke_responses: Vec<MapElementInvokeResponse>,
  #[serde(deserialize_with = "null_default")]
  pub navigation_element_references: Vec<NavigationReference>,
  pub state_values: Option<Value>,
  pub pre_commit_state_values: Option<Value>,
  /// Fault payloads keyed by fault name; each value is either a structured
  /// fault object, a JSON-encoded string of one, or a plain message.
  pub root_faults: Option<Map<String, Value>>,
  pub status_code: Option<String>,
  pub join_flow_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapElementInvokeResponse {
  pub map_element_id: Option<String>,
  pub developer_name: Option<String>,
  pub page_response: Option<PageResponse>,
  #[serde(deserialize_with = "null_default")]
  pub outcome_responses: Vec<Outcome>,
  pub root_faults: Option<Map<String, Value>>,
}

/// One screen: structural trees plus their companion data records.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageResponse {
  pub label: Option<String>,
  pub attributes: Option<Value>,
  #[serde(deserialize_with = "null_default")]
  pub page_container_responses: Vec<Value>,
  #[serde(deserialize_with = "null_default")]
  pub page_component_responses: Vec<Value>,
  #[serde(deserialize_with = "null_default")]
  pub page_container_data_responses: Vec<Value>,
  #[serde(deserialize_with = "null_default")]
  pub page_component_data_responses: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationReference {
  pub id: Option<String>,
  pub developer_name: Option<String>,
}

/// Envelope of a navigation fetch.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationResponse {
  pub developer_name: Option<String>,
  pub label: Option<String>,
  pub culture: Option<Value>,
  pub tags: Option<Value>,
  pub is_visible: Option<bool>,
  pub is_enabled: Option<bool>,
  #[serde(deserialize_with = "null_default")]
  pub navigation_item_responses: Vec<Value>,
  #[serde(deserialize_with = "null_default")]
  pub navigation_item_data_responses: Vec<Value>,
}

/// One page of a paginated object or file data fetch.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectDataPage {
  pub object_data: Option<Vec<ObjectDataItem>>,
  #[serde(deserialize_with = "null_default")]
  pub has_more_results: bool,
}

#[cfg(test)]
mod tests {
  use super::InvokeResponse;
  use flowplay_model::InvokeType;
  use serde_json::json;

  #[test]
  fn invoke_response_tolerates_sparse_payloads() {
    let response: InvokeResponse = serde_json::from_value(json!({
      "stateId": "s1",
      "invokeType": "forward",
      "mapElementInvokeResponses": null,
    }))
    .unwrap();

    assert_eq!(response.state_id.as_deref(), Some("s1"));
    assert_eq!(response.invoke_type, Some(InvokeType::Forward));
    assert!(response.map_element_invoke_responses.is_empty());
  }

  #[test]
  fn page_response_splits_structure_from_data() {
    let response: InvokeResponse = serde_json::from_value(json!({
      "mapElementInvokeResponses": [{
        "mapElementId": "m1",
        "developerName": "page",
        "pageResponse": {
          "label": "Step 1",
          "pageContainerResponses": [{ "id": "c1" }],
          "pageComponentResponses": [{ "id": "x1", "pageContainerId": "c1" }],
          "pageComponentDataResponses": [{ "pageComponentId": "x1", "contentValue": "v" }],
        },
        "outcomeResponses": [{ "id": "o1", "developerName": "Next" }],
      }],
    }))
    .unwrap();

    let map_element = &response.map_element_invoke_responses[0];
    let page = map_element.page_response.as_ref().unwrap();
    assert_eq!(page.page_container_responses.len(), 1);
    assert_eq!(page.page_component_data_responses.len(), 1);
    assert_eq!(map_element.outcome_responses[0].id, "o1");
  }
}
