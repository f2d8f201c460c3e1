//! Shared helpers for flowplay tests: unique ids, a scripted network client
//! and a render hook that records its calls.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use flowplay_base::LookupKey;
use flowplay_engine::{Method, NetworkClient, NetworkError, RequestHeaders};
use serde_json::{json, Value};

pub fn test_id_val() -> u32 {
  use std::sync::atomic::{AtomicU32, Ordering};
  static COUNT: AtomicU32 = AtomicU32::new(0);

  // add extra bits to make it easy to identify test IDs
  (u16::MAX as u32) << 16 | COUNT.fetch_add(1, Ordering::SeqCst)
}

/// A unique string id with a readable prefix.
#[macro_export]
macro_rules! test_id {
  ($prefix:expr) => {
    format!("{}-{}", $prefix, $crate::test_id_val())
  };
}

/// One call the mock client saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
  pub method: Method,
  pub path: String,
  pub headers: RequestHeaders,
  pub body: Option<Value>,
}

/// Network client scripted with a queue of responses. Running out of
/// scripted responses fails the call rather than hanging the test.
#[derive(Default)]
pub struct MockNetworkClient {
  responses: Mutex<VecDeque<Result<Value, NetworkError>>>,
  calls: Mutex<Vec<RecordedCall>>,
}

impl MockNetworkClient {
  pub fn new() -> Self {
    MockNetworkClient::default()
  }

  pub fn push_response(&self, response: Result<Value, NetworkError>) {
    if let Ok(mut responses) = self.responses.lock() {
      responses.push_back(response);
    }
  }

  pub fn calls(&self) -> Vec<RecordedCall> {
    self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
  }
}

#[async_trait]
impl NetworkClient for MockNetworkClient {
  async fn send(
    &self,
    method: Method,
    path: &str,
    headers: &RequestHeaders,
    body: Option<Value>,
  ) -> Result<Value, NetworkError> {
    if let Ok(mut calls) = self.calls.lock() {
      calls.push(RecordedCall {
        method,
        path: path.to_owned(),
        headers: headers.clone(),
        body,
      });
    }
    match self.responses.lock() {
      Ok(mut responses) => responses
        .pop_front()
        .unwrap_or_else(|| Err(NetworkError::Transport("no scripted response left".to_owned()))),
      Err(_) => Err(NetworkError::Transport("mock client poisoned".to_owned())),
    }
  }
}

/// Render hook that counts invocations and remembers their keys.
#[derive(Default)]
pub struct RecordingRenderHook {
  renders: Mutex<Vec<LookupKey>>,
}

impl RecordingRenderHook {
  pub fn new() -> Self {
    RecordingRenderHook::default()
  }

  pub fn count(&self) -> usize {
    self.renders.lock().map(|renders| renders.len()).unwrap_or(0)
  }

  pub fn keys(&self) -> Vec<LookupKey> {
    self.renders.lock().map(|renders| renders.clone()).unwrap_or_default()
  }
}

impl flowplay_engine::RenderHook for RecordingRenderHook {
  fn render(&self, key: &LookupKey) {
    if let Ok(mut renders) = self.renders.lock() {
      renders.push(key.clone());
    }
  }
}

/// A one-page invoke response: one root container holding one input
/// component, with a single outcome.
pub fn single_page_invoke_response(state_id: &str) -> Value {
  json!({
    "stateId": state_id,
    "stateToken": format!("token-{}", state_id),
    "currentMapElementId": "map-element-1",
    "invokeType": "FORWARD",
    "mapElementInvokeResponses": [{
      "mapElementId": "map-element-1",
      "developerName": "Step One",
      "pageResponse": {
        "label": "Step One",
        "pageContainerResponses": [{
          "id": "container-1",
          "containerType": "VERTICAL_FLOW",
        }],
        "pageComponentResponses": [{
          "id": "component-1",
          "developerName": "Input",
          "componentType": "INPUT",
          "pageContainerId": "container-1",
          "contentType": null,
        }],
        "pageComponentDataResponses": [{
          "pageComponentId": "component-1",
          "contentValue": "hello",
          "isVisible": true,
        }],
      },
      "outcomeResponses": [{ "id": "outcome-1", "developerName": "Next", "order": 0 }],
    }],
  })
}

/// An invoke response with no page at all, parked in `WAIT`.
pub fn waiting_invoke_response(state_id: &str) -> Value {
  json!({
    "stateId": state_id,
    "invokeType": "WAIT",
    "waitMessage": "Still working",
  })
}

/// One page of object data records.
pub fn object_data_page(values: &[&str], has_more_results: bool) -> Value {
  let object_data: Vec<Value> = values
    .iter()
    .map(|value| {
      json!({
        "externalId": format!("ext-{}", value),
        "developerName": "Record",
        "properties": [{ "developerName": "value", "contentValue": value }],
      })
    })
    .collect();
  json!({ "objectData": object_data, "hasMoreResults": has_more_results })
}
