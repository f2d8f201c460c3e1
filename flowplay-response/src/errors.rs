use flowplay_model::Error as ModelError;

#[derive(Debug, PartialEq, Clone, serde::Serialize)]
pub enum Error {
  Model(ModelError),

  /// The response payload was structurally unusable.
  MalformedResponse(String),
}

impl From<ModelError> for Error {
  fn from(err: ModelError) -> Self {
    Error::Model(err)
  }
}

impl std::fmt::Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Error::Model(err) => write!(f, "{}", err),
      Error::MalformedResponse(msg) => write!(f, "malformed response: {}", msg),
    }
  }
}

impl std::error::Error for Error {}
