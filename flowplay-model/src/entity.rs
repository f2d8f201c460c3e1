use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

fn default_true() -> bool {
  true
}

/// How the host advanced (or refused to advance) the session on the last
/// invoke. `Wait` means the result is not ready and the client must poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeType {
  Forward,
  Backward,
  Sync,
  Wait,
  Done,
  NotAllowed,
  Unknown(String),
}

impl InvokeType {
  /// Wire values compare case-insensitively.
  pub fn from_name(name: &str) -> Self {
    match name.to_ascii_lowercase().as_str() {
      "forward" => InvokeType::Forward,
      "backward" => InvokeType::Backward,
      "sync" => InvokeType::Sync,
      "wait" => InvokeType::Wait,
      "done" => InvokeType::Done,
      "not_allowed" => InvokeType::NotAllowed,
      _ => InvokeType::Unknown(name.to_owned()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      InvokeType::Forward => "FORWARD",
      InvokeType::Backward => "BACKWARD",
      InvokeType::Sync => "SYNC",
      InvokeType::Wait => "WAIT",
      InvokeType::Done => "DONE",
      InvokeType::NotAllowed => "NOT_ALLOWED",
      InvokeType::Unknown(name) => name,
    }
  }
}

impl std::fmt::Display for InvokeType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl Serialize for InvokeType {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for InvokeType {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let name = String::deserialize(deserializer)?;
    Ok(InvokeType::from_name(&name))
  }
}

/// A layout grouping node in the screen's structural tree.
///
/// `parent` references another container in the same session or is absent
/// for roots. `child_count` is recomputed whenever children are attached.
/// Server fields the client does not model are retained in `extra` so merge
/// operations cover them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
  pub id: String,
  pub parent: Option<String>,
  pub container_type: Option<String>,
  pub developer_name: Option<String>,
  pub label: Option<String>,
  #[serde(deserialize_with = "null_default")]
  pub order: i64,
  #[serde(deserialize_with = "null_default")]
  pub child_count: u32,
  #[serde(default = "default_true", deserialize_with = "null_true")]
  pub is_visible: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Default for Container {
  fn default() -> Self {
    Container {
      id: String::new(),
      parent: None,
      container_type: None,
      developer_name: None,
      label: None,
      order: 0,
      child_count: 0,
      is_visible: true,
      extra: Map::new(),
    }
  }
}

/// A leaf UI-bound data element attached to exactly one container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Component {
  pub id: String,
  pub developer_name: Option<String>,
  pub component_type: Option<String>,
  pub content_type: Option<String>,
  pub content_value: Option<String>,
  pub label: Option<String>,
  pub page_container_id: String,
  #[serde(deserialize_with = "null_default")]
  pub order: i64,
  #[serde(default = "default_true", deserialize_with = "null_true")]
  pub is_visible: bool,
  #[serde(deserialize_with = "null_default")]
  pub is_required: bool,
  pub is_valid: Option<bool>,
  pub validation_message: Option<String>,
  #[serde(deserialize_with = "null_default")]
  pub attributes: Map<String, Value>,
  pub object_data: Option<Vec<ObjectDataItem>>,
  pub object_data_request: Option<Value>,
  pub file_data_request: Option<Value>,
  #[serde(deserialize_with = "null_default")]
  pub has_more_results: bool,
  /// Client-side failure of the component's own paginated fetch; never part
  /// of the wire payload.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Default for Component {
  fn default() -> Self {
    Component {
      id: String::new(),
      developer_name: None,
      component_type: None,
      content_type: None,
      content_value: None,
      label: None,
      page_container_id: String::new(),
      order: 0,
      is_visible: true,
      is_required: false,
      is_valid: None,
      validation_message: None,
      attributes: Map::new(),
      object_data: None,
      object_data_request: None,
      file_data_request: None,
      has_more_results: false,
      error: None,
      extra: Map::new(),
    }
  }
}

/// One selectable record in a component's data list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectDataItem {
  pub internal_id: Option<String>,
  pub external_id: Option<String>,
  pub developer_name: Option<String>,
  #[serde(deserialize_with = "null_default")]
  pub is_selected: bool,
  #[serde(deserialize_with = "null_default")]
  pub properties: Vec<ItemProperty>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemProperty {
  pub developer_name: Option<String>,
  pub content_value: Option<String>,
  pub content_type: Option<String>,
  pub object_data: Option<Vec<ObjectDataItem>>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// A user-selectable transition action. Stored under its lower-cased id so
/// lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Outcome {
  pub id: String,
  pub developer_name: Option<String>,
  pub label: Option<String>,
  #[serde(deserialize_with = "null_default")]
  pub order: i64,
  pub page_object_binding_id: Option<String>,
  pub page_container_id: Option<String>,
  #[serde(deserialize_with = "null_default")]
  pub is_out: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Condensed outcome attached to a history entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutcomeSummary {
  pub id: String,
  pub name: Option<String>,
  pub label: Option<String>,
  pub order: i64,
}

/// A navigation configuration resolved for this session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Navigation {
  pub id: String,
  pub developer_name: Option<String>,
  pub label: Option<String>,
  pub culture: Option<Value>,
  pub tags: Option<Value>,
  #[serde(default = "default_true", deserialize_with = "null_true")]
  pub is_visible: bool,
  #[serde(default = "default_true", deserialize_with = "null_true")]
  pub is_enabled: bool,
  #[serde(deserialize_with = "null_default")]
  pub items: Vec<NavigationItem>,
}

impl Default for Navigation {
  fn default() -> Self {
    Navigation {
      id: String::new(),
      developer_name: None,
      label: None,
      culture: None,
      tags: None,
      is_visible: true,
      is_enabled: true,
      items: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationItem {
  pub id: String,
  pub developer_name: Option<String>,
  pub label: Option<String>,
  #[serde(deserialize_with = "null_default")]
  pub order: i64,
  #[serde(deserialize_with = "null_default")]
  pub is_current: bool,
  #[serde(default = "default_true", deserialize_with = "null_true")]
  pub is_enabled: bool,
  #[serde(default = "default_true", deserialize_with = "null_true")]
  pub is_visible: bool,
  pub location_map_element_id: Option<String>,
  #[serde(deserialize_with = "null_default")]
  pub items: Vec<NavigationItem>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Default for NavigationItem {
  fn default() -> Self {
    NavigationItem {
      id: String::new(),
      developer_name: None,
      label: None,
      order: 0,
      is_current: false,
      is_enabled: true,
      is_visible: true,
      location_map_element_id: None,
      items: Vec::new(),
      extra: Map::new(),
    }
  }
}

/// A user-facing message. Never deduplicated: every add produces a new
/// entry, every removal deletes exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  pub message: String,
  pub position: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub timeout: String,
  pub dismissible: bool,
}

impl Notification {
  /// Centered danger notification that never times out, as produced for
  /// host faults and transport failures.
  pub fn danger(message: &str, dismissible: bool) -> Self {
    Notification {
      message: message.to_owned(),
      position: "center".to_owned(),
      kind: "danger".to_owned(),
      timeout: "0".to_owned(),
      dismissible,
    }
  }
}

/// A structured fault reported by the host inside an otherwise-successful
/// response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fault {
  pub name: Option<String>,
  pub message: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Fault {
  /// Parse a raw fault payload: a structured JSON object when possible,
  /// falling back to treating the whole string as the message.
  pub fn parse(name: &str, raw: &str) -> Self {
    let mut fault = serde_json::from_str::<Fault>(raw).unwrap_or_else(|_| Fault {
      message: Some(raw.to_owned()),
      ..Fault::default()
    });
    fault.name = Some(name.to_owned());
    fault
  }
}

/// Loading marker for a component scope ("" is the whole page).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Loading {
  pub message: String,
}

impl Loading {
  pub fn new(message: &str) -> Self {
    Loading { message: message.to_owned() }
  }
}
