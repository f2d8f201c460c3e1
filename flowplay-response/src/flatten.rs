use flowplay_base::extend_shallow;
use serde_json::Value;

/// Property under which containers nest their children on the wire.
pub const DEFAULT_NESTED_PROPERTY: &str = "pageContainerResponses";

/// Recursive pre-order flatten of a nested node tree into a flat list.
///
/// Every node is annotated with the id of its immediate parent; internal
/// nodes get `childCount` set to their raw immediate-children count at
/// flatten time, before any visibility filtering happens.
pub fn flatten_tree(nodes: &[Value], parent: Option<&str>, nested_property: &str) -> Vec<Value> {
  let mut flat = Vec::new();
  for node in nodes {
    let mut current = node.clone();
    let children = match &mut current {
      Value::Object(map) => {
        if let Some(parent) = parent {
          map.insert("parent".to_owned(), Value::String(parent.to_owned()));
        }
        match map.remove(nested_property) {
          Some(Value::Array(children)) => {
            if !children.is_empty() {
              map.insert("childCount".to_owned(), Value::from(children.len()));
            }
            children
          }
          _ => Vec::new(),
        }
      }
      _ => Vec::new(),
    };
    let id = current.get("id").and_then(Value::as_str).map(str::to_owned);
    flat.push(current);
    if !children.is_empty() {
      flat.extend(flatten_tree(&children, id.as_deref(), nested_property));
    }
  }
  flat
}

/// Merge structural items with their companion data records.
///
/// A record matches when `record[match_key]` equals the item's `id`; its
/// fields then shallow-merge onto the item, data winning, and a merged item
/// whose `contentType` is still null gets the canonical string content type.
/// Items with no matching record pass through unchanged.
pub fn merge_with_data(structure: &[Value], data: &[Value], match_key: &str) -> Vec<Value> {
  structure
    .iter()
    .map(|item| {
      let mut merged = item.clone();
      let id = item.get("id").and_then(Value::as_str);
      let record = id.and_then(|id| {
        data
          .iter()
          .find(|record| record.get(match_key).and_then(Value::as_str) == Some(id))
      });
      if let Some(record) = record {
        extend_shallow(&mut merged, record);
        if let Value::Object(map) = &mut merged {
          if matches!(map.get("contentType"), Some(Value::Null)) {
            map.insert("contentType".to_owned(), Value::String("ContentString".to_owned()));
          }
        }
      }
      merged
    })
    .collect()
}
