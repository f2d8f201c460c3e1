//! The protocol state machine: sequences initialize / move / join / sync /
//! ping / paginated fetches, applies responses through the normalizer and
//! signals the render hook.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use flowplay_base::{FlowKey, LookupKey};
use flowplay_model::{
  record_selected_outcome, InvokeType, Loading, ModelStore, Notification, Session,
};
use flowplay_response::{
  apply_invoke_response, apply_navigation_response, apply_sync_response, InvokeResponse,
  NavigationResponse, ObjectDataPage, TextDecoder,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::{paths, Method, NetworkClient, NetworkError, RequestHeaders};
use crate::errors::EngineError;
use crate::render::RenderHook;

const INITIALIZING_MESSAGE: &str = "Initializing...";
const JOINING_MESSAGE: &str = "Joining...";
const EXECUTING_MESSAGE: &str = "Executing...";
const SYNCING_MESSAGE: &str = "Syncing...";
const LOADING_MESSAGE: &str = "Loading...";
const NETWORK_FAILURE_MESSAGE: &str = "Something went wrong talking to the flow host";
const SESSION_EXPIRED_MESSAGE: &str = "Your session is no longer authorized. Log in again to continue.";

/// Tunables for one engine instance.
#[derive(Clone)]
pub struct EngineOptions {
  /// Delay between ping rounds while the host reports `WAIT`.
  pub poll_interval: Duration,
  /// Record the journey history on forward moves.
  pub track_history: bool,
  /// Force a specific navigation element instead of the response default.
  pub navigation_element_id: Option<String>,
  pub authorization: Option<String>,
}

impl Default for EngineOptions {
  fn default() -> Self {
    EngineOptions {
      poll_interval: Duration::from_secs(10),
      track_history: true,
      navigation_element_id: None,
      authorization: None,
    }
  }
}

/// Which normalizer pass a response goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseApply {
  FullPage,
  DataOnly,
}

#[derive(Clone)]
pub struct Engine {
  store: Arc<Mutex<ModelStore>>,
  client: Arc<dyn NetworkClient>,
  render: Arc<dyn RenderHook>,
  decoder: Arc<dyn TextDecoder>,
  options: EngineOptions,
}

impl Engine {
  pub fn new(
    client: Arc<dyn NetworkClient>,
    render: Arc<dyn RenderHook>,
    decoder: Arc<dyn TextDecoder>,
    options: EngineOptions,
  ) -> Self {
    Engine {
      store: Arc::new(Mutex::new(ModelStore::new())),
      client,
      render,
      decoder,
      options,
    }
  }

  /// Shared handle to the model store, for render hooks and embedders.
  pub fn store(&self) -> Arc<Mutex<ModelStore>> {
    Arc::clone(&self.store)
  }

  fn lock(&self) -> Result<MutexGuard<'_, ModelStore>, EngineError> {
    self.store.lock().map_err(|_| EngineError::StorePoisoned)
  }

  fn headers(&self, flow_key: &FlowKey) -> RequestHeaders {
    RequestHeaders {
      tenant_id: flow_key.tenant_id().to_owned(),
      state_id: Some(flow_key.state_id())
        .filter(|state_id| !state_id.is_empty())
        .map(str::to_owned),
      authorization: self.options.authorization.clone(),
    }
  }

  /// Start a brand-new flow instance. The session is created under a
  /// provisional key and re-keyed once the host assigns the state id.
  pub async fn initialize(
    &self,
    tenant_id: &str,
    flow_id: &str,
    flow_version_id: &str,
    element_id: Option<&str>,
  ) -> Result<FlowKey, EngineError> {
    let provisional = FlowKey::new(
      Some(tenant_id),
      Some(flow_id),
      Some(flow_version_id),
      None,
      element_id,
    );
    let key = provisional.lookup_key();
    info!(tenant = tenant_id, flow = flow_id, "initializing flow");

    let token;
    {
      let mut store = self.lock()?;
      store.add_session(&key);
      token = store.session_mut(&key)?.begin_invoke();
      store.set_loading(&key, "", Some(Loading::new(INITIALIZING_MESSAGE)))?;
    }
    self.render.render(&key);

    let body = json!({
      "flowId": { "id": flow_id, "versionId": flow_version_id },
      "currentMapElementId": element_id,
      "mode": "",
    });
    let result = self
      .client
      .send(Method::Post, paths::INITIALIZE, &self.headers(&provisional), Some(body))
      .await;
    let response = match result {
      Ok(value) => parse_invoke(value)?,
      Err(err) => return Err(self.fail_invoke(&key, err)?),
    };

    let flow_key = match &response.state_id {
      Some(state_id) => provisional.with_state_id(state_id),
      None => provisional,
    };
    let new_key = flow_key.lookup_key();
    {
      let mut store = self.lock()?;
      store.rename_session(&key, &new_key)?;
    }

    self.parse_response(&response, ResponseApply::FullPage, &flow_key, token, true)?;
    self.refresh_navigation(&flow_key, &response).await?;

    // The wait spinner set for a WAIT response must survive until polling
    // resolves it.
    if response.invoke_type != Some(InvokeType::Wait) {
      let mut store = self.lock()?;
      store.set_loading(&new_key, "", None)?;
    }
    self.render.render(&new_key);
    Ok(flow_key)
  }

  /// Resume an existing remote session without re-running initialize.
  pub async fn join(
    &self,
    tenant_id: &str,
    flow_id: &str,
    flow_version_id: &str,
    state_id: &str,
  ) -> Result<FlowKey, EngineError> {
    let flow_key = FlowKey::new(
      Some(tenant_id),
      Some(flow_id),
      Some(flow_version_id),
      Some(state_id),
      None,
    );
    let key = flow_key.lookup_key();
    info!(tenant = tenant_id, state = state_id, "joining flow state");

    let token;
    {
      let mut store = self.lock()?;
      store.add_session(&key);
      token = store.session_mut(&key)?.begin_invoke();
      store.set_loading(&key, "", Some(Loading::new(JOINING_MESSAGE)))?;
    }
    self.render.render(&key);

    let result = self
      .client
      .send(Method::Get, &paths::state(state_id), &self.headers(&flow_key), None)
      .await;
    let response = match result {
      Ok(value) => parse_invoke(value)?,
      Err(err) => return Err(self.fail_invoke(&key, err)?),
    };

    self.parse_response(&response, ResponseApply::FullPage, &flow_key, token, true)?;
    self.refresh_navigation(&flow_key, &response).await?;

    if response.invoke_type != Some(InvokeType::Wait) {
      let mut store = self.lock()?;
      store.set_loading(&key, "", None)?;
    }
    self.render.render(&key);
    Ok(flow_key)
  }

  /// Invoke the flow forward along the chosen outcome.
  pub async fn move_to(&self, outcome_id: &str, flow_key: &FlowKey) -> Result<(), EngineError> {
    let key = flow_key.lookup_key();
    debug!(key = %key, outcome = outcome_id, "moving along outcome");

    let token;
    let body;
    {
      let mut store = self.lock()?;
      let outcome = store.get_outcome(&key, outcome_id).cloned();
      let session = store.session_mut(&key)?;
      record_selected_outcome(session, outcome.as_ref(), InvokeType::Forward);
      token = session.begin_invoke();
      body = build_invoke_body(session, flow_key, Some(outcome_id), &InvokeType::Forward);
      session.loading.insert(String::new(), Loading::new(EXECUTING_MESSAGE));
    }
    self.render.render(&key);

    let result = self
      .client
      .send(
        Method::Post,
        &paths::state(flow_key.state_id()),
        &self.headers(flow_key),
        Some(body),
      )
      .await;
    let response = match result {
      Ok(value) => parse_invoke(value)?,
      Err(err) => return Err(self.fail_invoke(&key, err)?),
    };

    self.parse_response(&response, ResponseApply::FullPage, flow_key, token, true)?;
    self.refresh_navigation(flow_key, &response).await?;

    if response.invoke_type != Some(InvokeType::Wait) {
      let mut store = self.lock()?;
      store.set_loading(&key, "", None)?;
    }
    self.render.render(&key);
    Ok(())
  }

  /// Refresh component data without a page transition, then re-dispatch the
  /// paginated fetch of every visible component still carrying a pending
  /// request descriptor.
  pub async fn sync(&self, flow_key: &FlowKey) -> Result<(), EngineError> {
    let key = flow_key.lookup_key();
    debug!(key = %key, "syncing");

    let token;
    let body;
    {
      let mut store = self.lock()?;
      let session = store.session_mut(&key)?;
      token = session.begin_invoke();
      body = build_invoke_body(session, flow_key, None, &InvokeType::Sync);
      session.loading.insert(String::new(), Loading::new(SYNCING_MESSAGE));
    }
    self.render.render(&key);

    let result = self
      .client
      .send(
        Method::Post,
        &paths::state(flow_key.state_id()),
        &self.headers(flow_key),
        Some(body),
      )
      .await;
    let response = match result {
      Ok(value) => parse_invoke(value)?,
      Err(err) => return Err(self.fail_invoke(&key, err)?),
    };

    self.parse_response(&response, ResponseApply::DataOnly, flow_key, token, true)?;

    {
      let mut store = self.lock()?;
      store.set_loading(&key, "", None)?;
    }
    self.render.render(&key);

    let pending: Vec<(String, Value, bool)> = {
      let store = self.lock()?;
      let session = store.session(&key)?;
      session
        .components
        .values()
        .filter(|component| component.is_visible)
        .filter_map(|component| {
          if let Some(request) = &component.object_data_request {
            Some((component.id.clone(), request.clone(), false))
          } else if let Some(request) = &component.file_data_request {
            Some((component.id.clone(), request.clone(), true))
          } else {
            None
          }
        })
        .collect()
    };
    for (component_id, request, is_file) in pending {
      let result = if is_file {
        self.file_data_request(&component_id, &request, flow_key, 10, None, None, None, 1).await
      } else {
        self.object_data_request(&component_id, &request, flow_key, 10, None, None, None, 1).await
      };
      if let Err(err) = result {
        warn!(key = %key, component = %component_id, error = %err, "pending fetch failed after sync");
      }
    }
    Ok(())
  }

  /// Poll the host while the session sits in `WAIT`. Each round sleeps the
  /// configured interval, re-fetches the state and re-dispatches the
  /// response. Returns once the session leaves the wait state.
  pub async fn ping(&self, flow_key: &FlowKey) -> Result<(), EngineError> {
    let key = flow_key.lookup_key();
    loop {
      let waiting = { self.lock()?.get_invoke_type(&key) == Some(InvokeType::Wait) };
      if !waiting {
        return Ok(());
      }
      tokio::time::sleep(self.options.poll_interval).await;
      debug!(key = %key, "pinging waiting state");

      let token = { self.lock()?.session_mut(&key)?.begin_invoke() };
      let result = self
        .client
        .send(
          Method::Get,
          &paths::ping(flow_key.state_id()),
          &self.headers(flow_key),
          None,
        )
        .await;
      match result {
        Ok(value) => {
          let response = parse_invoke(value)?;
          self.parse_response(&response, ResponseApply::FullPage, flow_key, token, false)?;
          if self.lock()?.get_invoke_type(&key) != Some(InvokeType::Wait) {
            self.lock()?.set_loading(&key, "", None)?;
          }
          self.render.render(&key);
        }
        Err(err) => {
          warn!(key = %key, error = %err, "ping round failed");
          return Err(EngineError::Network(err));
        }
      }
    }
  }

  /// Paginated object data fetch scoped to one component. Failure marks the
  /// component's `error` field and leaves its data untouched; the session
  /// itself is unaffected. Renders exactly twice either way.
  #[allow(clippy::too_many_arguments)]
  pub async fn object_data_request(
    &self,
    component_id: &str,
    request: &Value,
    flow_key: &FlowKey,
    limit: i64,
    search: Option<&str>,
    order_by: Option<&str>,
    order_direction: Option<&str>,
    page: i64,
  ) -> Result<(), EngineError> {
    self
      .data_request(
        paths::OBJECT_DATA,
        component_id,
        request,
        flow_key,
        limit,
        search,
        order_by,
        order_direction,
        page,
      )
      .await
  }

  /// Paginated file data fetch; structurally identical to
  /// [`object_data_request`](Engine::object_data_request).
  #[allow(clippy::too_many_arguments)]
  pub async fn file_data_request(
    &self,
    component_id: &str,
    request: &Value,
    flow_key: &FlowKey,
    limit: i64,
    search: Option<&str>,
    order_by: Option<&str>,
    order_direction: Option<&str>,
    page: i64,
  ) -> Result<(), EngineError> {
    self
      .data_request(
        paths::FILE_DATA,
        component_id,
        request,
        flow_key,
        limit,
        search,
        order_by,
        order_direction,
        page,
      )
      .await
  }

  #[allow(clippy::too_many_arguments)]
  async fn data_request(
    &self,
    path: &str,
    component_id: &str,
    request: &Value,
    flow_key: &FlowKey,
    limit: i64,
    search: Option<&str>,
    order_by: Option<&str>,
    order_direction: Option<&str>,
    page: i64,
  ) -> Result<(), EngineError> {
    let key = flow_key.lookup_key();
    {
      let mut store = self.lock()?;
      store.set_loading(&key, component_id, Some(Loading::new(LOADING_MESSAGE)))?;
    }
    self.render.render(&key);

    let mut body = request.clone();
    if let Value::Object(map) = &mut body {
      map.insert(
        "listFilter".to_owned(),
        json!({
          "search": search,
          "limit": limit,
          "offset": (page.max(1) - 1) * limit,
          "orderByPropertyDeveloperName": order_by,
          "orderByDirectionType": order_direction,
        }),
      );
    }

    let result = self
      .client
      .send(Method::Post, path, &self.headers(flow_key), Some(body))
      .await;
    let outcome = match result.map_err(EngineError::Network).and_then(|value| {
      serde_json::from_value::<ObjectDataPage>(value).map_err(|err| {
        EngineError::Response(flowplay_response::Error::MalformedResponse(err.to_string()))
      })
    }) {
      Ok(data_page) => {
        let mut store = self.lock()?;
        let session = store.session_mut(&key)?;
        match session.components.get_mut(component_id) {
          Some(component) => {
            let items = data_page.object_data.unwrap_or_default();
            if page > 1 {
              component.object_data.get_or_insert_with(Vec::new).extend(items);
            } else {
              component.object_data = Some(items);
            }
            component.has_more_results = data_page.has_more_results;
            component.error = None;
            Ok(())
          }
          None => Err(EngineError::Model(flowplay_model::Error::ComponentMissing(
            component_id.to_owned(),
          ))),
        }
      }
      Err(err) => {
        warn!(key = %key, component = component_id, error = %err, "paginated fetch failed");
        let mut store = self.lock()?;
        store.set_component_error(&key, component_id, Some(err.to_string()))?;
        Err(err)
      }
    };

    {
      let mut store = self.lock()?;
      store.set_loading(&key, component_id, None)?;
    }
    self.render.render(&key);
    outcome
  }

  /// Shared response tail: fences superseded invokes, refreshes session
  /// identity, resets component state for the invoke type, runs the
  /// normalizer pass, and kicks off background polling for `WAIT`.
  fn parse_response(
    &self,
    response: &InvokeResponse,
    apply: ResponseApply,
    flow_key: &FlowKey,
    token: u64,
    allow_chain: bool,
  ) -> Result<(), EngineError> {
    let key = flow_key.lookup_key();
    let invoke_type = response.invoke_type.clone().unwrap_or(InvokeType::Forward);

    {
      let mut store = self.lock()?;
      let session = store.session_mut(&key)?;
      if !session.is_current_invoke(token) {
        debug!(key = %key, token, "discarding superseded response");
        return Ok(());
      }
      if let Some(state_id) = &response.state_id {
        session.state_id = Some(state_id.clone());
      }
      if let Some(state_token) = &response.state_token {
        session.state_token = Some(state_token.clone());
      }
      if let Some(map_element_id) = &response.current_map_element_id {
        session.current_map_element_id = Some(map_element_id.clone());
      }

      store.reset_components(&key, &invoke_type)?;
      match apply {
        ResponseApply::FullPage => apply_invoke_response(
          &mut store,
          &key,
          response,
          self.decoder.as_ref(),
          self.options.track_history,
        )?,
        ResponseApply::DataOnly => {
          apply_sync_response(&mut store, &key, response, self.decoder.as_ref())?
        }
      }
    }

    if allow_chain && invoke_type == InvokeType::Wait {
      let engine = self.clone();
      let flow_key = flow_key.clone();
      tokio::spawn(async move {
        if let Err(err) = engine.ping(&flow_key).await {
          warn!(error = %err, "background polling stopped");
        }
      });
    }
    Ok(())
  }

  /// Fetch and apply the navigation referenced by the response (or forced
  /// by options), then select it. Navigation failures are logged, never
  /// fatal to the invoke that triggered them.
  async fn refresh_navigation(
    &self,
    flow_key: &FlowKey,
    response: &InvokeResponse,
  ) -> Result<(), EngineError> {
    let key = flow_key.lookup_key();
    let navigation_id = self.options.navigation_element_id.clone().or_else(|| {
      response
        .navigation_element_references
        .get(0)
        .and_then(|reference| reference.id.clone())
    });
    let navigation_id = match navigation_id {
      Some(id) => id,
      None => return Ok(()),
    };

    let state_token = { self.lock()?.session(&key)?.state_token.clone() };
    let body = json!({
      "stateId": flow_key.state_id(),
      "stateToken": state_token,
      "navigationElementId": navigation_id,
    });
    let result = self
      .client
      .send(
        Method::Post,
        &paths::navigation(flow_key.state_id()),
        &self.headers(flow_key),
        Some(body),
      )
      .await;
    let value = match result {
      Ok(value) => value,
      Err(err) => {
        warn!(key = %key, error = %err, "navigation fetch failed");
        return Ok(());
      }
    };
    let navigation: NavigationResponse = serde_json::from_value(value)
      .map_err(|err| flowplay_response::Error::MalformedResponse(err.to_string()))?;

    let current = { self.lock()?.session(&key)?.current_map_element_id.clone() };
    {
      let mut store = self.lock()?;
      apply_navigation_response(&mut store, &key, &navigation_id, &navigation, current.as_deref())?;
      store.set_selected_navigation(&key, &navigation_id)?;
    }
    Ok(())
  }

  /// Common failure tail for invoke-class calls: clear the page spinner,
  /// surface a notification, render, and hand back the error to return.
  fn fail_invoke(&self, key: &LookupKey, err: NetworkError) -> Result<EngineError, EngineError> {
    warn!(key = %key, error = %err, "invoke failed");
    {
      let mut store = self.lock()?;
      store.set_loading(key, "", None)?;
      store.add_notification(
        key,
        Notification {
          message: format!("{}: {}", NETWORK_FAILURE_MESSAGE, err),
          position: "center".to_owned(),
          kind: "danger".to_owned(),
          timeout: "0".to_owned(),
          dismissible: false,
        },
      )?;
      if err.is_unauthorized() {
        store.add_notification(
          key,
          Notification {
            message: SESSION_EXPIRED_MESSAGE.to_owned(),
            position: "center".to_owned(),
            kind: "warning".to_owned(),
            timeout: "0".to_owned(),
            dismissible: true,
          },
        )?;
      }
    }
    self.render.render(key);
    Ok(EngineError::Network(err))
  }
}

fn parse_invoke(value: Value) -> Result<InvokeResponse, EngineError> {
  serde_json::from_value(value)
    .map_err(|err| EngineError::Response(flowplay_response::Error::MalformedResponse(err.to_string())))
}

/// Body of an invoke call: the selected outcome plus a snapshot of every
/// component's input state.
fn build_invoke_body(
  session: &Session,
  flow_key: &FlowKey,
  selected_outcome_id: Option<&str>,
  invoke_type: &InvokeType,
) -> Value {
  let inputs: Vec<Value> = session
    .components
    .values()
    .map(|component| {
      json!({
        "pageComponentId": component.id,
        "contentValue": component.content_value,
        "objectData": component.object_data,
      })
    })
    .collect();
  json!({
    "invokeType": invoke_type.as_str(),
    "stateId": flow_key.state_id(),
    "stateToken": session.state_token,
    "currentMapElementId": session.current_map_element_id,
    "mapElementInvokeRequest": {
      "selectedOutcomeId": selected_outcome_id,
      "pageRequest": { "pageComponentInputResponses": inputs },
    },
    "mode": "",
  })
}

#[cfg(test)]
mod tests {
  use std::collections::VecDeque;
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  use async_trait::async_trait;
  use flowplay_base::LookupKey;
  use flowplay_model::InvokeType;
  use flowplay_response::HtmlTextDecoder;
  use serde_json::{json, Value};

  use super::{Engine, EngineOptions, ResponseApply};
  use crate::client::{Method, NetworkClient, NetworkError, RequestHeaders};
  use crate::render::RenderHook;

  #[derive(Debug, Clone)]
  struct RecordedCall {
    method: Method,
    path: String,
    headers: RequestHeaders,
    body: Option<Value>,
  }

  /// Network client scripted with a queue of responses. Running out of
  /// scripted responses fails the call rather than hanging the test.
  #[derive(Default)]
  struct MockNetworkClient {
    responses: Mutex<VecDeque<Result<Value, NetworkError>>>,
    calls: Mutex<Vec<RecordedCall>>,
  }

  impl MockNetworkClient {
    fn new() -> Self {
      MockNetworkClient::default()
    }

    fn push_response(&self, response: Result<Value, NetworkError>) {
      self.responses.lock().unwrap().push_back(response);
    }

    fn calls(&self) -> Vec<RecordedCall> {
      self.calls.lock().unwrap().clone()
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
      self.calls.lock().unwrap().push(RecordedCall {
        method,
        path: path.to_owned(),
        headers: headers.clone(),
        body,
      });
      self
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(NetworkError::Transport("no scripted response left".to_owned())))
    }
  }

  #[derive(Default)]
  struct RecordingRenderHook {
    renders: Mutex<Vec<LookupKey>>,
  }

  impl RecordingRenderHook {
    fn new() -> Self {
      RecordingRenderHook::default()
    }

    fn count(&self) -> usize {
      self.renders.lock().unwrap().len()
    }
  }

  impl RenderHook for RecordingRenderHook {
    fn render(&self, key: &LookupKey) {
      self.renders.lock().unwrap().push(key.clone());
    }
  }

  fn single_page_invoke_response(state_id: &str) -> Value {
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

  fn waiting_invoke_response(state_id: &str) -> Value {
    json!({
      "stateId": state_id,
      "invokeType": "WAIT",
      "waitMessage": "Still working",
    })
  }

  fn object_data_page(values: &[&str], has_more_results: bool) -> Value {
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

  fn engine_with(client: Arc<MockNetworkClient>, render: Arc<RecordingRenderHook>) -> Engine {
    let options = EngineOptions {
      poll_interval: Duration::from_millis(1),
      ..EngineOptions::default()
    };
    Engine::new(client, render, Arc::new(HtmlTextDecoder), options)
  }

  async fn initialized_engine() -> (Engine, Arc<MockNetworkClient>, Arc<RecordingRenderHook>, flowplay_base::FlowKey) {
    let client = Arc::new(MockNetworkClient::new());
    client.push_response(Ok(single_page_invoke_response("state-1")));
    let render = Arc::new(RecordingRenderHook::new());
    let engine = engine_with(Arc::clone(&client), Arc::clone(&render));
    let flow_key = engine
      .initialize("tenant-1", "flow-1", "version-1", None)
      .await
      .unwrap();
    (engine, client, render, flow_key)
  }

  #[tokio::test]
  async fn initialize_builds_the_session_end_to_end() {
    let (engine, client, render, flow_key) = initialized_engine().await;

    assert_eq!(flow_key.state_id(), "state-1");
    let key = flow_key.lookup_key();
    assert_eq!(key.as_str(), "tenant-1_state-1");

    let store = engine.store();
    let store = store.lock().unwrap();
    let session = store.session(&key).unwrap();
    assert_eq!(session.components.len(), 1);
    assert_eq!(session.containers.len(), 1);
    assert_eq!(session.label.as_deref(), Some("Step One"));
    assert_eq!(session.state_token.as_deref(), Some("token-state-1"));
    assert!(!session.is_loading());
    assert!(store.get_container(&key, "container-1").unwrap().is_visible);

    assert!(render.count() >= 2);
    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "/api/run/1");
    assert_eq!(calls[0].headers.tenant_id, "tenant-1");
  }

  #[tokio::test]
  async fn initialize_network_failure_notifies_and_rejects() {
    let client = Arc::new(MockNetworkClient::new());
    client.push_response(Err(NetworkError::Transport("connection refused".to_owned())));
    let render = Arc::new(RecordingRenderHook::new());
    let engine = engine_with(Arc::clone(&client), Arc::clone(&render));

    let result = engine.initialize("tenant-1", "flow-1", "version-1", None).await;
    assert!(matches!(result, Err(super::EngineError::Network(_))));

    // The session stays under its provisional key with the failure surfaced.
    let key = LookupKey::from_raw("tenant-1_");
    let store = engine.store();
    let store = store.lock().unwrap();
    let notifications = store.get_notifications(&key, "center");
    assert_eq!(notifications.len(), 1);
    assert!(!notifications[0].dismissible);
    assert!(!store.session(&key).unwrap().is_loading());
  }

  #[tokio::test]
  async fn unauthorized_failure_adds_a_login_alert() {
    let client = Arc::new(MockNetworkClient::new());
    client.push_response(Err(NetworkError::Status { code: 401, message: "expired".to_owned() }));
    let render = Arc::new(RecordingRenderHook::new());
    let engine = engine_with(Arc::clone(&client), Arc::clone(&render));

    let result = engine.initialize("tenant-1", "flow-1", "version-1", None).await;
    assert!(result.is_err());

    let key = LookupKey::from_raw("tenant-1_");
    let store = engine.store();
    let store = store.lock().unwrap();
    let notifications = store.get_notifications(&key, "center");
    assert_eq!(notifications.len(), 2);
    assert!(notifications.iter().any(|n| n.kind == "warning"));
  }

  #[tokio::test]
  async fn move_to_grows_history_and_records_the_outcome() {
    let (engine, client, _render, flow_key) = initialized_engine().await;
    client.push_response(Ok(single_page_invoke_response("state-1")));

    engine.move_to("outcome-1", &flow_key).await.unwrap();

    let key = flow_key.lookup_key();
    let store = engine.store();
    let store = store.lock().unwrap();
    let session = store.session(&key).unwrap();
    assert_eq!(session.history.len(), 2);
    assert_eq!(
      session.history[0].selected_outcome.as_ref().map(|o| o.id.as_str()),
      Some("outcome-1")
    );

    let calls = client.calls();
    assert_eq!(calls[1].path, "/api/run/1/state/state-1");
    let body = calls[1].body.as_ref().unwrap();
    assert_eq!(body["invokeType"], "FORWARD");
    assert_eq!(body["mapElementInvokeRequest"]["selectedOutcomeId"], "outcome-1");
  }

  #[tokio::test]
  async fn join_fetches_the_state_with_a_get() {
    let client = Arc::new(MockNetworkClient::new());
    client.push_response(Ok(single_page_invoke_response("state-7")));
    let render = Arc::new(RecordingRenderHook::new());
    let engine = engine_with(Arc::clone(&client), Arc::clone(&render));

    let flow_key = engine.join("tenant-1", "flow-1", "version-1", "state-7").await.unwrap();
    assert_eq!(flow_key.lookup_key().as_str(), "tenant-1_state-7");

    let calls = client.calls();
    assert_eq!(calls[0].method, super::Method::Get);
    assert_eq!(calls[0].path, "/api/run/1/state/state-7");
    assert_eq!(calls[0].headers.state_id.as_deref(), Some("state-7"));
  }

  #[tokio::test]
  async fn object_data_request_paginates() {
    let (engine, client, _render, flow_key) = initialized_engine().await;
    let request = json!({ "typeElementBindingId": "binding-1" });

    client.push_response(Ok(object_data_page(&["a", "b"], true)));
    engine
      .object_data_request("component-1", &request, &flow_key, 2, None, None, None, 1)
      .await
      .unwrap();

    client.push_response(Ok(object_data_page(&["c"], false)));
    engine
      .object_data_request("component-1", &request, &flow_key, 2, None, None, None, 2)
      .await
      .unwrap();

    let key = flow_key.lookup_key();
    let store = engine.store();
    let store = store.lock().unwrap();
    let component = store.get_component(&key, "component-1").unwrap();
    assert_eq!(component.object_data.as_ref().unwrap().len(), 3);
    assert!(!component.has_more_results);
    assert_eq!(component.error, None);

    let calls = client.calls();
    assert_eq!(calls[1].path, "/api/service/1/data");
    let filter = &calls[1].body.as_ref().unwrap()["listFilter"];
    assert_eq!(filter["limit"], 2);
    assert_eq!(filter["offset"], 0);
    assert_eq!(calls[2].body.as_ref().unwrap()["listFilter"]["offset"], 2);
  }

  #[tokio::test]
  async fn failed_fetch_is_scoped_to_the_component() {
    let (engine, client, render, flow_key) = initialized_engine().await;
    let request = json!({ "typeElementBindingId": "binding-1" });

    client.push_response(Ok(object_data_page(&["a", "b"], true)));
    engine
      .object_data_request("component-1", &request, &flow_key, 10, None, None, None, 1)
      .await
      .unwrap();

    let renders_before = render.count();
    client.push_response(Err(NetworkError::Status { code: 500, message: "boom".to_owned() }));
    let result = engine
      .object_data_request("component-1", &request, &flow_key, 10, None, None, None, 2)
      .await;
    assert!(matches!(result, Err(super::EngineError::Network(_))));

    let key = flow_key.lookup_key();
    let store = engine.store();
    let store = store.lock().unwrap();
    let component = store.get_component(&key, "component-1").unwrap();
    assert!(component.error.as_ref().unwrap().contains("boom"));
    assert_eq!(component.object_data.as_ref().unwrap().len(), 2);
    assert!(!store.session(&key).unwrap().is_loading());
    assert_eq!(render.count(), renders_before + 2);
  }

  #[tokio::test]
  async fn superseded_responses_are_discarded() {
    let (engine, _client, _render, flow_key) = initialized_engine().await;
    let key = flow_key.lookup_key();

    let stale_token = {
      let store = engine.store();
      let mut store = store.lock().unwrap();
      let stale = store.session_mut(&key).unwrap().begin_invoke();
      store.session_mut(&key).unwrap().begin_invoke();
      stale
    };

    let response: flowplay_response::InvokeResponse = serde_json::from_value(json!({
      "invokeType": "FORWARD",
      "currentMapElementId": "somewhere-else",
    }))
    .unwrap();
    engine
      .parse_response(&response, ResponseApply::FullPage, &flow_key, stale_token, false)
      .unwrap();

    let store = engine.store();
    let store = store.lock().unwrap();
    let session = store.session(&key).unwrap();
    assert_eq!(session.current_map_element_id.as_deref(), Some("map-element-1"));
    assert_eq!(session.components.len(), 1);
  }

  #[tokio::test]
  async fn ping_polls_until_wait_clears() {
    let client = Arc::new(MockNetworkClient::new());
    client.push_response(Ok(waiting_invoke_response("state-1")));
    client.push_response(Ok(waiting_invoke_response("state-1")));
    client.push_response(Ok(single_page_invoke_response("state-1")));
    let render = Arc::new(RecordingRenderHook::new());
    let engine = engine_with(Arc::clone(&client), Arc::clone(&render));

    let flow_key = engine.initialize("tenant-1", "flow-1", "version-1", None).await.unwrap();
    let key = flow_key.lookup_key();
    {
      let store = engine.store();
      let store = store.lock().unwrap();
      assert_eq!(store.get_invoke_type(&key), Some(InvokeType::Wait));
      assert!(store.session(&key).unwrap().is_loading());
    }

    // Background polling kicked off by the WAIT response resolves it.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let store = engine.store();
    let store = store.lock().unwrap();
    assert_eq!(store.get_invoke_type(&key), Some(InvokeType::Forward));
    assert_eq!(store.session(&key).unwrap().components.len(), 1);
    assert!(!store.session(&key).unwrap().is_loading());
  }

  #[tokio::test]
  async fn sync_redispatches_pending_data_requests() {
    let (engine, client, _render, flow_key) = initialized_engine().await;
    let key = flow_key.lookup_key();
    {
      let store = engine.store();
      let mut store = store.lock().unwrap();
      store
        .update_component(&key, "component-1", &json!({
          "objectDataRequest": { "typeElementBindingId": "binding-1" },
        }))
        .unwrap();
    }

    client.push_response(Ok(json!({ "invokeType": "SYNC", "mapElementInvokeResponses": [] })));
    client.push_response(Ok(object_data_page(&["a"], false)));
    engine.sync(&flow_key).await.unwrap();

    let calls = client.calls();
    assert_eq!(calls[1].body.as_ref().unwrap()["invokeType"], "SYNC");
    assert_eq!(calls[2].path, "/api/service/1/data");

    let store = engine.store();
    let store = store.lock().unwrap();
    let component = store.get_component(&key, "component-1").unwrap();
    assert_eq!(component.object_data.as_ref().unwrap().len(), 1);
  }
}
