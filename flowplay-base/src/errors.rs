/// Errors raised while building or parsing flow keys.
#[derive(Debug, PartialEq, Clone, serde::Serialize)]
pub enum KeyError {
  /// The string did not contain enough `_`-separated segments to address a
  /// session (at least tenant, flow, version and state are required).
  MissingSegments(String),

  /// The string contained more segments than a flow key can carry, which
  /// means an embedded `_` corrupted it beyond recovery.
  TooManySegments(String),
}

impl std::fmt::Display for KeyError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      KeyError::MissingSegments(s) => write!(f, "flow key '{}' has too few segments", s),
      KeyError::TooManySegments(s) => write!(f, "flow key '{}' has too many segments", s),
    }
  }
}

impl std::error::Error for KeyError {}
