use flowplay_base::KeyError;
use flowplay_model::Error as ModelError;
use flowplay_response::Error as ResponseError;

use crate::client::NetworkError;

#[derive(Debug, PartialEq, Clone, serde::Serialize)]
pub enum EngineError {
  Network(NetworkError),
  Key(KeyError),
  Model(ModelError),
  Response(ResponseError),

  /// The store mutex was poisoned by a panicking holder.
  StorePoisoned,
}

impl From<NetworkError> for EngineError {
  fn from(err: NetworkError) -> Self {
    EngineError::Network(err)
  }
}

impl From<KeyError> for EngineError {
  fn from(err: KeyError) -> Self {
    EngineError::Key(err)
  }
}

impl From<ModelError> for EngineError {
  fn from(err: ModelError) -> Self {
    EngineError::Model(err)
  }
}

impl From<ResponseError> for EngineError {
  fn from(err: ResponseError) -> Self {
    EngineError::Response(err)
  }
}

impl std::fmt::Display for EngineError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      EngineError::Network(err) => write!(f, "{}", err),
      EngineError::Key(err) => write!(f, "{}", err),
      EngineError::Model(err) => write!(f, "{}", err),
      EngineError::Response(err) => write!(f, "{}", err),
      EngineError::StorePoisoned => write!(f, "model store lock poisoned"),
    }
  }
}

impl std::error::Error for EngineError {}
