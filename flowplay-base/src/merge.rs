use serde_json::Value;

/// Shallow merge: top-level keys of `source` overwrite keys of `target`
/// wholesale. Nested objects are replaced, not recursed into. No-op unless
/// both values are JSON objects.
pub fn extend_shallow(target: &mut Value, source: &Value) {
  if let (Value::Object(target_map), Value::Object(source_map)) = (target, source) {
    for (key, value) in source_map {
      target_map.insert(key.clone(), value.clone());
    }
  }
}

/// Deep merge: object values merge key-wise, everything else overwrites.
pub fn extend_deep(target: &mut Value, source: &Value) {
  match (target, source) {
    (Value::Object(target_map), Value::Object(source_map)) => {
      for (key, value) in source_map {
        match target_map.get_mut(key) {
          Some(existing) if existing.is_object() && value.is_object() => extend_deep(existing, value),
          _ => {
            target_map.insert(key.clone(), value.clone());
          }
        }
      }
    }
    (target, source) => *target = source.clone(),
  }
}

/// Merge two property lists keyed by `developerName`: entries of
/// `object_data` replace same-named entries of `merged`, preserving the
/// order of `merged`. A `None` second operand passes the first through.
pub fn extend_object_data(merged: Vec<Value>, object_data: Option<&[Value]>) -> Vec<Value> {
  let object_data = match object_data {
    Some(items) => items,
    None => return merged,
  };

  merged
    .into_iter()
    .map(|item| {
      let name = item.get("developerName").and_then(Value::as_str);
      match name.and_then(|name| {
        object_data
          .iter()
          .find(|candidate| candidate.get("developerName").and_then(Value::as_str) == Some(name))
      }) {
        Some(replacement) => replacement.clone(),
        None => item,
      }
    })
    .collect()
}
