use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
}

impl std::fmt::Display for Method {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Method::Get => write!(f, "GET"),
      Method::Post => write!(f, "POST"),
    }
  }
}

/// Headers the engine attaches to every host call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestHeaders {
  pub tenant_id: String,
  pub state_id: Option<String>,
  pub authorization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum NetworkError {
  Transport(String),
  Status { code: u16, message: String },
}

impl NetworkError {
  pub fn is_unauthorized(&self) -> bool {
    matches!(self, NetworkError::Status { code: 401, .. } | NetworkError::Status { code: 403, .. })
  }
}

impl std::fmt::Display for NetworkError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      NetworkError::Transport(msg) => write!(f, "network transport failure: {}", msg),
      NetworkError::Status { code, message } => write!(f, "host returned {}: {}", code, message),
    }
  }
}

impl std::error::Error for NetworkError {}

/// The transport seam. The engine never retries; a failure comes straight
/// back to the operation that issued the call.
#[async_trait]
pub trait NetworkClient: Send + Sync {
  async fn send(
    &self,
    method: Method,
    path: &str,
    headers: &RequestHeaders,
    body: Option<Value>,
  ) -> Result<Value, NetworkError>;
}

/// Protocol paths, versioned under `/api/.../1`.
pub mod paths {
  pub const INITIALIZE: &str = "/api/run/1";
  pub const OBJECT_DATA: &str = "/api/service/1/data";
  pub const FILE_DATA: &str = "/api/service/1/file";

  pub fn state(state_id: &str) -> String {
    format!("/api/run/1/state/{}", state_id)
  }

  pub fn ping(state_id: &str) -> String {
    format!("/api/run/1/state/ping/{}", state_id)
  }

  pub fn navigation(state_id: &str) -> String {
    format!("/api/run/1/navigation/{}", state_id)
  }
}
