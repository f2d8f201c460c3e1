use super::KeyError;

/// Composite identifier for one running flow.
///
/// Serialized as the five segments joined with `_`, with missing segments
/// rendered as the empty string. The string form is an external contract and
/// must stay bit-exact: `(None, "b", "c", "d", "e")` renders as `"_b_c_d_e"`.
/// Segments are never escaped, so ids containing `_` cannot be round-tripped.
///
/// # Examples
/// ```
/// # use flowplay_base::FlowKey;
/// let key = FlowKey::new(Some("tenant"), Some("flow"), Some("version"), Some("state"), None);
/// assert_eq!(key.to_string(), "tenant_flow_version_state_");
/// assert_eq!(key.lookup_key().as_str(), "tenant_state");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct FlowKey {
  tenant_id: String,
  flow_id: String,
  flow_version_id: String,
  state_id: String,
  element_id: String,
}

impl FlowKey {
  /// Build a flow key from its five segments. `None` becomes the empty
  /// segment. Segment contents are not validated.
  pub fn new(
    tenant_id: Option<&str>,
    flow_id: Option<&str>,
    flow_version_id: Option<&str>,
    state_id: Option<&str>,
    element_id: Option<&str>,
  ) -> Self {
    FlowKey {
      tenant_id: tenant_id.unwrap_or("").to_owned(),
      flow_id: flow_id.unwrap_or("").to_owned(),
      flow_version_id: flow_version_id.unwrap_or("").to_owned(),
      state_id: state_id.unwrap_or("").to_owned(),
      element_id: element_id.unwrap_or("").to_owned(),
    }
  }

  /// Parse a serialized flow key.
  ///
  /// Keys with fewer than 4 segments are rejected rather than producing a
  /// degenerate lookup key. A 4-segment key parses with an empty element id.
  pub fn parse(s: &str) -> Result<Self, KeyError> {
    let segments: Vec<&str> = s.split('_').collect();
    match segments.len() {
      0..=3 => Err(KeyError::MissingSegments(s.to_owned())),
      4 | 5 => Ok(FlowKey {
        tenant_id: segments[0].to_owned(),
        flow_id: segments[1].to_owned(),
        flow_version_id: segments[2].to_owned(),
        state_id: segments[3].to_owned(),
        element_id: segments.get(4).map(|s| (*s).to_owned()).unwrap_or_default(),
      }),
      _ => Err(KeyError::TooManySegments(s.to_owned())),
    }
  }

  pub fn tenant_id(&self) -> &str {
    &self.tenant_id
  }

  pub fn flow_id(&self) -> &str {
    &self.flow_id
  }

  pub fn flow_version_id(&self) -> &str {
    &self.flow_version_id
  }

  pub fn state_id(&self) -> &str {
    &self.state_id
  }

  pub fn element_id(&self) -> &str {
    &self.element_id
  }

  /// Rebuild the key with a new state id, keeping every other segment.
  /// Used when the host assigns the state id on the first response.
  pub fn with_state_id(&self, state_id: &str) -> Self {
    let mut key = self.clone();
    key.state_id = state_id.to_owned();
    key
  }

  /// Derive the shorter key used to index the session model store:
  /// `tenant_id + "_" + state_id`.
  pub fn lookup_key(&self) -> LookupKey {
    LookupKey(format!("{}_{}", self.tenant_id, self.state_id))
  }
}

impl std::fmt::Display for FlowKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{}_{}_{}_{}_{}",
      self.tenant_id, self.flow_id, self.flow_version_id, self.state_id, self.element_id
    )
  }
}

impl std::str::FromStr for FlowKey {
  type Err = KeyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    FlowKey::parse(s)
  }
}

/// Reduced identifier indexing the session model store. Multiple flow keys
/// may share a lookup key (re-entering the same state); the store holds one
/// session per lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct LookupKey(String);

impl LookupKey {
  /// Wrap an already-derived lookup key string.
  pub fn from_raw(raw: &str) -> Self {
    LookupKey(raw.to_owned())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for LookupKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}
