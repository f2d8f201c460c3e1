use flowplay_base::{KeyError, LookupKey};

#[derive(Debug, PartialEq, Clone, serde::Serialize)]
pub enum Error {
  /// The session was removed (or never created); callers treat this as a
  /// recoverable no-op, not a crash.
  SessionMissing(LookupKey),

  ComponentMissing(String),
  ContainerMissing(String),

  /// A value did not have the shape the model expected.
  InvalidShape(String),

  Key(KeyError),
}

impl From<KeyError> for Error {
  fn from(err: KeyError) -> Self {
    Error::Key(err)
  }
}

impl std::fmt::Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Error::SessionMissing(key) => write!(f, "no session for lookup key '{}'", key),
      Error::ComponentMissing(id) => write!(f, "no component with id '{}'", id),
      Error::ContainerMissing(id) => write!(f, "no container with id '{}'", id),
      Error::InvalidShape(msg) => write!(f, "invalid model value: {}", msg),
      Error::Key(err) => write!(f, "{}", err),
    }
  }
}

impl std::error::Error for Error {}
